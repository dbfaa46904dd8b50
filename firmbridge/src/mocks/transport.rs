use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::errors::{Error, ProtocolError};
use crate::io::IoTransport;

/// A transport recording what is written and serving scripted inbound chunks.
///
/// Clones share their buffers: keep one in the test to inspect the traffic of the one given to the
/// session.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    opened: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
    written: Arc<Mutex<Vec<u8>>>,
    incoming: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// `(request, response)`: each write containing `request` queues `response`.
    replies: Arc<Mutex<Vec<(Vec<u8>, Vec<u8>)>>>,
}

impl MockTransport {
    /// Adds an automatic reply, as a board would answer a query.
    pub fn reply_to(self, request: &[u8], response: &[u8]) -> Self {
        self.replies
            .lock()
            .push((request.to_vec(), response.to_vec()));
        self
    }

    /// Queues a chunk to be returned by a single read.
    pub fn push_incoming(&self, chunk: &[u8]) {
        self.incoming.lock().push_back(chunk.to_vec());
    }

    /// Stops answering the given request.
    pub fn forget_reply(&self, request: &[u8]) {
        self.replies.lock().retain(|(known, _)| known != request);
    }

    /// All bytes written so far.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }

    /// Returns the bytes written so far and forgets them.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut *self.written.lock())
    }

    pub fn is_opened(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    /// Makes every following write and read fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), Error> {
        match self.failing.load(Ordering::SeqCst) {
            true => Err(Error::from(ProtocolError::IoException {
                info: String::from("Mock transport failure"),
            })),
            false => Ok(()),
        }
    }
}

impl Display for MockTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockTransport")
    }
}

impl IoTransport for MockTransport {
    fn open(&mut self) -> Result<(), Error> {
        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.opened.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_timeout(&mut self, _: Duration) -> Result<(), Error> {
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.check()?;
        if !self.is_opened() {
            return Err(ProtocolError::NotInitialized.into());
        }
        self.written.lock().extend_from_slice(buf);
        for (request, response) in self.replies.lock().iter() {
            let requested = !request.is_empty()
                && buf
                    .windows(request.len())
                    .any(|window| window == request.as_slice());
            if requested {
                self.incoming.lock().push_back(response.clone());
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.check()?;
        let mut incoming = self.incoming.lock();
        let Some(mut chunk) = incoming.pop_front() else {
            return Ok(0);
        };
        let count = buf.len().min(chunk.len());
        buf[..count].copy_from_slice(&chunk[..count]);
        if count < chunk.len() {
            incoming.push_front(chunk.split_off(count));
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::io::IoTransport;
    use crate::mocks::transport::MockTransport;

    #[test]
    fn test_mock_transport() {
        let mut transport =
            MockTransport::default().reply_to(&[0xF0, 0x79, 0xF7], &[0xF9, 0x02, 0x05]);
        let observer = transport.clone();

        assert!(transport.write(&[0xFF]).is_err(), "Closed transport refuses writes");
        transport.open().unwrap();
        assert!(observer.is_opened());

        transport.write(&[0xFF, 0xF0, 0x79, 0xF7]).unwrap();
        assert_eq!(observer.take_written(), vec![0xFF, 0xF0, 0x79, 0xF7]);
        assert!(observer.written().is_empty());

        observer.push_incoming(&[0x90, 0x01, 0x00]);
        let mut buf = [0; 2];
        assert_eq!(transport.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [0xF9, 0x02]);
        assert_eq!(transport.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0x05);
        assert_eq!(transport.read(&mut buf).unwrap(), 2);
        assert_eq!(transport.read(&mut buf).unwrap(), 1);
        assert_eq!(transport.read(&mut buf).unwrap(), 0);

        observer.forget_reply(&[0xF0, 0x79, 0xF7]);
        transport.write(&[0xF0, 0x79, 0xF7]).unwrap();
        assert_eq!(transport.read(&mut buf).unwrap(), 0);

        observer.set_failing(true);
        assert!(transport.write(&[0xFF]).is_err());
        assert!(transport.read(&mut buf).is_err());

        transport.close().unwrap();
        assert!(!observer.is_opened());
    }
}
