pub use tokio;

pub mod helpers;
pub mod scale;
pub mod task;

pub use helpers::format_as_hex;
pub use scale::Scalable;
