/// Trait for mapping a value from one scale to another.
pub trait Scalable {
    /// Map a value from one scale to another.
    /// This is equivalent to Arduino map() method, except integers are rounded to the nearest
    /// value instead of truncated:
    /// https://www.arduino.cc/reference/en/language/functions/math/map/
    ///
    /// # Parameters
    /// * `self`:  the value to map
    /// * `from_low`:  the low end of the originating range
    /// * `from_high`:  the high end of the originating range
    /// * `to_low`:  the low end of the target range
    /// * `to_high`:  the high end of the target range
    ///
    /// # Returns
    /// The mapped value.
    fn scale(self, from_low: Self, from_high: Self, to_low: Self, to_high: Self) -> Self;
}

fn linear(value: f64, from_low: f64, from_high: f64, to_low: f64, to_high: f64) -> f64 {
    (value - from_low) * (to_high - to_low) / (from_high - from_low) + to_low
}

macro_rules! impl_integer_scalable {
    ($($variant:ty),*) => {
        $(
            impl Scalable for $variant {
                fn scale(self, from_low: Self, from_high: Self, to_low: Self, to_high: Self) -> Self {
                    linear(
                        self as f64,
                        from_low as f64,
                        from_high as f64,
                        to_low as f64,
                        to_high as f64,
                    )
                    .round() as Self
                }
            }
        )*
    };
}

macro_rules! impl_float_scalable {
    ($($variant:ty),*) => {
        $(
            impl Scalable for $variant {
                fn scale(self, from_low: Self, from_high: Self, to_low: Self, to_high: Self) -> Self {
                    linear(
                        self as f64,
                        from_low as f64,
                        from_high as f64,
                        to_low as f64,
                        to_high as f64,
                    ) as Self
                }
            }
        )*
    };
}

impl_integer_scalable!(u8, u16, u32, u64, i8, i16, i32, i64);
impl_float_scalable!(f32, f64);
