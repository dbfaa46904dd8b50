use std::fmt::{Debug, Display};
use std::time::Duration;

use crate::errors::Error;
use crate::io::transports::private::TraitToAny;

pub mod serial;

pub(crate) mod private {
    use std::any::Any;

    pub trait TraitToAny: 'static {
        fn as_any(&self) -> &dyn Any;
    }

    impl<T: 'static> TraitToAny for T {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }
}

/// Defines the byte pipe a session talks through.
pub trait IoTransport: Debug + Display + Send + Sync + TraitToAny {
    /// Opens communication (in a blocking way) using the transport layer.
    ///
    /// # Notes
    ///  The method is sync and may block until the connection is established.
    fn open(&mut self) -> Result<(), Error>;

    /// Gracefully shuts down the transport layer.
    fn close(&mut self) -> Result<(), Error>;

    /// Sets the read timeout of the transport layer.
    ///
    /// # Notes
    /// This function is optional and may not be supported by all transport layers.
    fn set_timeout(&mut self, duration: Duration) -> Result<(), Error>;

    /// Writes all bytes to the internal connection. For more details see [`std::io::Write::write_all`].
    ///
    /// # Notes
    /// This function blocks until the write operation is complete: one call carries one whole
    /// operation so frames of concurrent operations never interleave.
    fn write(&mut self, buf: &[u8]) -> Result<(), Error>;

    /// Reads whatever arrived from the internal connection. For more details see [`std::io::Read::read`].
    ///
    /// # Returns
    /// The number of bytes read: 0 when nothing arrived before the read timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;
}
