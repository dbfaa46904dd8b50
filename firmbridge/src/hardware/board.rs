use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, trace};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};

use crate::errors::Error;
use crate::hardware::{Comparison, ConnectionStatus, SessionConfig};
use crate::io::{Firmata, IoTransport, LinkState, PinIdOrName, IO};
use crate::pause;
use crate::utils::task;
use crate::utils::task::TaskHandler;

/// A cancellable task slot.
type TaskSlot = Arc<Mutex<Option<TaskHandler>>>;

/// Represents a physical board (Arduino most-likely) driven through a [`Firmata`] session.
///
/// The board owns the session and the three tasks keeping it alive: the reader feeding the session
/// with the transport bytes, the handshake retrying the device queries, and the heartbeat watching
/// the device once connected. Clones share all of them.
///
/// Each connection is numbered: a task only acts on the session while the connection it was
/// spawned for is still the current one.
#[derive(Debug, Clone)]
pub struct Board {
    session: Arc<Mutex<Firmata>>,
    config: SessionConfig,
    /// Number of the current connection. Only changes with the session locked.
    generation: Arc<AtomicU64>,
    reader: TaskSlot,
    handshake: TaskSlot,
    heartbeat: TaskSlot,
}

impl Default for Board {
    /// Creates a board over the first available serial port.
    ///
    /// **_/!\ The board will NOT be connected until the [`Board::open`] method is called._**
    fn default() -> Self {
        Self::new(Firmata::default())
    }
}

impl Board {
    /// Creates a board using a given session.
    ///
    /// # Example
    /// ```no_run
    /// use firmbridge::hardware::Board;
    /// use firmbridge::io::Firmata;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let board = Board::new(Firmata::new("COM4"));
    ///     board.open().unwrap();
    /// }
    /// ```
    pub fn new(session: Firmata) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            config: SessionConfig::default(),
            generation: Default::default(),
            reader: Default::default(),
            handshake: Default::default(),
            heartbeat: Default::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn get_config(&self) -> &SessionConfig {
        &self.config
    }

    /// Locks the session for direct access.
    ///
    /// # Notes
    /// The guard must not be held across an `.await`: the board tasks would be blocked meanwhile.
    pub fn session(&self) -> MutexGuard<'_, Firmata> {
        self.session.lock()
    }

    // ########################################
    // Lifecycle

    /// Opens the connection and starts the handshake in the background.
    ///
    /// A previous connection is released first. The board is connected once [`Board::status`]
    /// says so (or the [`LinkState`] received through [`Board::subscribe`] is `Connected`).
    ///
    /// # Errors
    /// * `RuntimeError`: the board must be opened from within a tokio runtime.
    /// * any transport error raised while opening.
    ///
    /// # Example
    /// ```no_run
    /// use firmbridge::hardware::Board;
    /// use firmbridge::io::LinkState;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let board = Board::default();
    ///     board.open().unwrap();
    ///     let mut link = board.subscribe();
    ///     while !link.borrow_and_update().is_connected() {
    ///         link.changed().await.unwrap();
    ///     }
    ///     println!("Board connected: {}", board);
    /// }
    /// ```
    pub fn open(&self) -> Result<(), Error> {
        {
            let mut session = self.session.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.release_tasks();
            session.set_max_missed_heartbeats(self.config.max_missed_heartbeats);
            session.open()?;

            if let Err(error) = self.spawn_tasks(generation) {
                self.stop(&mut session)?;
                return Err(error);
            }
        }
        debug!("Board is opening: {}", self);
        Ok(())
    }

    /// Closes the connection: every task is cancelled before the transport is closed.
    pub fn close(&self) -> Result<(), Error> {
        {
            let mut session = self.session.lock();
            self.stop(&mut session)?;
        }
        trace!("Board is closed");
        Ok(())
    }

    /// Ends the current connection. The session must be locked by the caller.
    fn stop(&self, session: &mut Firmata) -> Result<(), Error> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.release_tasks();
        session.close()
    }

    /// Runs `action` on the locked session, unless the connection `generation` has ended since.
    fn if_current<R>(
        &self,
        generation: u64,
        action: impl FnOnce(&mut Firmata) -> R,
    ) -> Option<R> {
        let mut session = self.session.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            trace!("Task of connection #{} outlived it: stopped", generation);
            return None;
        }
        Some(action(&mut session))
    }

    fn spawn_tasks(&self, generation: u64) -> Result<(), Error> {
        let reader = task::run(Self::read_loop(self.clone(), generation))?;
        *self.reader.lock() = Some(reader);
        let handshake = task::run(Self::handshake_loop(self.clone(), generation))?;
        *self.handshake.lock() = Some(handshake);
        Ok(())
    }

    fn start_heartbeat(&self, generation: u64) -> Result<(), Error> {
        let heartbeat = task::run(Self::heartbeat_loop(self.clone(), generation))?;
        if let Some(previous) = self.heartbeat.lock().replace(heartbeat) {
            previous.abort();
        }
        Ok(())
    }

    fn release_tasks(&self) {
        abort(&self.handshake);
        abort(&self.heartbeat);
        abort(&self.reader);
    }

    /// Feeds the session with whatever the transport receives.
    async fn read_loop(board: Board, generation: u64) -> Result<(), Error> {
        loop {
            let received = board.if_current(generation, |session| {
                let received = session.poll();
                if received.is_err() {
                    board.stop(session)?;
                }
                received
            });
            match received {
                None => return Ok(()),
                Some(Ok(0)) => pause!(1),
                Some(Ok(_)) => tokio::task::yield_now().await,
                Some(Err(error)) => {
                    error!("Board connection failed: {}", error);
                    return Err(error);
                }
            }
        }
    }

    /// Sends the pending handshake query again every `probe_interval` until connected, then hands
    /// over to the heartbeat.
    async fn handshake_loop(board: Board, generation: u64) -> Result<(), Error> {
        let mut link = board.subscribe();
        loop {
            let state = *link.borrow_and_update();
            match state {
                LinkState::Connected => {
                    let handed_over = board.if_current(generation, |_| {
                        board.handshake.lock().take();
                        board.start_heartbeat(generation)
                    });
                    return handed_over.unwrap_or(Ok(()));
                }
                LinkState::Disconnected => return Ok(()),
                _ => {}
            }

            tokio::select! {
                changed = link.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                _ = tokio::time::sleep(board.config.probe_interval) => {
                    match board.if_current(generation, |session| session.retry_handshake()) {
                        Some(retried) => retried.map(|_| ())?,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Runs the session liveness check every `heartbeat_interval`.
    async fn heartbeat_loop(board: Board, generation: u64) -> Result<(), Error> {
        let period = board.config.heartbeat_interval;
        let mut ticks = interval_at(Instant::now() + period, period);
        loop {
            ticks.tick().await;
            let beat = board.if_current(generation, |session| {
                let beat = session.heartbeat();
                if beat.is_err() {
                    board.stop(session)?;
                }
                beat
            });
            match beat {
                None => return Ok(()),
                Some(Ok(())) => {}
                Some(Err(error)) => {
                    error!("Board connection failed: {}", error);
                    return Err(error);
                }
            }
        }
    }

    // ########################################
    // Status

    pub fn is_connected(&self) -> bool {
        self.session.lock().is_connected()
    }

    pub fn link_state(&self) -> LinkState {
        self.session.lock().link_state()
    }

    /// Connection status, as displayed by the host.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from(self.is_connected())
    }

    /// Returns a receiver notified of every [`LinkState`] change.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.session.lock().subscribe()
    }

    // ########################################
    // Pin naming

    /// Names a pin: the name can then be used by every pin operation of the board.
    ///
    /// # Example
    /// ```no_run
    /// use firmbridge::hardware::Board;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let board = Board::default();
    ///     board.register_alias("led", 13).unwrap();
    ///     board.open().unwrap();
    ///     // ... once connected:
    ///     board.set_digital_output("led", true).unwrap();
    /// }
    /// ```
    pub fn register_alias<S: Into<String>>(&self, name: S, pin: u8) -> Result<(), Error> {
        self.session.lock().register_alias(name, pin)
    }

    /// Resolves a pin id, alias or board name ("D13", "A0") into a wire pin number.
    pub fn resolve<P: Into<PinIdOrName>>(&self, pin: P) -> Result<u8, Error> {
        self.session.lock().resolve(pin)
    }

    // ########################################
    // Blocks

    /// See [`IO::set_digital_output`].
    pub fn set_digital_output<P: Into<PinIdOrName>>(&self, pin: P, level: bool) -> Result<(), Error> {
        let mut session = self.session.lock();
        let pin = session.resolve(pin)?;
        session.set_digital_output(pin, level)
    }

    /// See [`IO::set_analog_output`].
    pub fn set_analog_output<P: Into<PinIdOrName>>(&self, pin: P, percent: f64) -> Result<(), Error> {
        let mut session = self.session.lock();
        let pin = session.resolve(pin)?;
        session.set_analog_output(pin, percent)
    }

    /// See [`IO::set_servo_angle`].
    pub fn set_servo_angle<P: Into<PinIdOrName>>(&self, pin: P, degrees: f64) -> Result<(), Error> {
        let mut session = self.session.lock();
        let pin = session.resolve(pin)?;
        session.set_servo_angle(pin, degrees)
    }

    /// See [`IO::read_digital_input`].
    pub fn read_digital_input<P: Into<PinIdOrName>>(&self, pin: P) -> Result<bool, Error> {
        let mut session = self.session.lock();
        let pin = session.resolve(pin)?;
        session.read_digital_input(pin)
    }

    /// See [`IO::read_analog_input`].
    pub fn read_analog_input(&self, channel: u8) -> Result<u8, Error> {
        self.session.lock().read_analog_input(channel)
    }

    /// See [`IO::read_analog_pin`].
    pub fn read_analog_pin<P: Into<PinIdOrName>>(&self, pin: P) -> Result<u8, Error> {
        let session = self.session.lock();
        let pin = session.resolve(pin)?;
        session.read_analog_pin(pin)
    }

    /// The "pin on?" predicate: the pin is switched to INPUT when needed.
    pub fn is_digital_on<P: Into<PinIdOrName>>(&self, pin: P) -> Result<bool, Error> {
        self.read_digital_input(pin)
    }

    /// The "when analog channel is above/below/equal to" predicate, on the 0..100 scale.
    pub fn compare_analog(
        &self,
        channel: u8,
        comparison: Comparison,
        threshold: f64,
    ) -> Result<bool, Error> {
        let value = self.read_analog_input(channel)?;
        Ok(comparison.compare(f64::from(value), threshold))
    }

    /// See [`IO::sampling_interval`].
    pub fn sampling_interval(&self, interval: u16) -> Result<(), Error> {
        self.session.lock().sampling_interval(interval)
    }
}

fn abort(slot: &TaskSlot) {
    if let Some(handler) = slot.lock().take() {
        handler.abort();
    }
}

/// Creates a board using the given transport layer.
///
/// # Example
/// ```no_run
/// use firmbridge::hardware::Board;
/// use firmbridge::io::Serial;
///
/// #[tokio::main]
/// async fn main() {
///     let board = Board::from(Serial::new("/dev/ttyUSB0"));
///     board.open().unwrap();
/// }
/// ```
impl<T: IoTransport + 'static> From<T> for Board {
    fn from(transport: T) -> Self {
        Self::new(Firmata::from(transport))
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Board ({})", self.session.lock())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use crate::hardware::{Board, Comparison, ConnectionStatus, SessionConfig};
    use crate::io::{Firmata, LinkState, Serial, IO};
    use crate::mocks::create_answering_transport;
    use crate::mocks::transport::MockTransport;
    use crate::pause;

    #[test]
    fn test_board_creation() {
        let board = Board::from(Serial::new("/dev/ttyUSB0"));
        assert_eq!(
            board.session().get_transport().to_string(),
            "Serial(/dev/ttyUSB0)"
        );
        assert_eq!(board.status(), ConnectionStatus::Disconnected);
        assert_eq!(board.get_config(), &SessionConfig::default());

        let config = SessionConfig::default().with_max_missed_heartbeats(2);
        let board = Board::new(Firmata::new("COM4")).with_config(config);
        assert_eq!(board.get_config().max_missed_heartbeats, 2);
        assert_eq!(
            format!("{}", board),
            "Board (Firmata [firmware=, version=unknown, protocol=unknown, transport=Serial(COM4)])"
        );
    }

    #[test]
    fn test_open_outside_runtime() {
        let transport = MockTransport::default();
        let board = Board::from(transport.clone());
        let result = board.open();
        assert_eq!(
            result.unwrap_err().to_string(),
            "Runtime error: the board must be opened from within a tokio runtime"
        );
        assert!(!transport.is_opened());
        assert_eq!(board.link_state(), LinkState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_open() {
        let transport = create_answering_transport();
        let board = Board::from(transport.clone());
        let mut link = board.subscribe();

        assert!(board.open().is_ok());
        assert!(transport.is_opened());
        pause!(50);

        assert!(link.has_changed().unwrap());
        assert!(board.is_connected());
        assert_eq!(board.status(), ConnectionStatus::Connected);
        assert!(board.handshake.lock().is_none());
        assert!(board.heartbeat.lock().is_some());
        assert!(board.reader.lock().is_some());

        // Answered heartbeats keep the connection up.
        pause!(2000);
        assert!(board.is_connected());

        assert!(board.close().is_ok());
        assert!(!transport.is_opened());
        assert!(board.heartbeat.lock().is_none());
        assert!(board.reader.lock().is_none());
        assert_eq!(board.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_retry() {
        let transport = MockTransport::default();
        let board = Board::from(transport.clone());

        assert!(board.open().is_ok());
        pause!(10);
        assert_eq!(transport.take_written(), vec![0xFF, 0xF0, 0x79, 0xF7]);
        assert_eq!(board.link_state(), LinkState::ProbingFirmware);

        // Silent device: the firmware is queried again every second.
        pause!(1000);
        assert_eq!(transport.take_written(), vec![0xF0, 0x79, 0xF7]);
        pause!(1000);
        assert_eq!(transport.take_written(), vec![0xF0, 0x79, 0xF7]);
        assert!(!board.is_connected());

        assert!(board.close().is_ok());
        pause!(3000);
        assert!(transport.written().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_lost() {
        let transport = create_answering_transport();
        let board = Board::from(transport.clone());
        assert!(board.open().is_ok());
        pause!(50);
        assert!(board.is_connected());

        // The device stops answering.
        transport.forget_reply(&[0xF0, 0x79, 0xF7]);
        pause!(1500);
        assert_eq!(board.link_state(), LinkState::Disconnected);
        assert!(!transport.is_opened());
        assert!(board.heartbeat.lock().is_none());
        assert!(board.reader.lock().is_none());
        assert!(board.handshake.lock().is_none());

        // No timer survives the connection.
        transport.take_written();
        pause!(2000);
        assert!(transport.written().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_tolerance() {
        let transport = create_answering_transport();
        let config = SessionConfig::default()
            .with_heartbeat_interval(Duration::from_millis(50))
            .with_max_missed_heartbeats(1);
        let board = Board::from(transport.clone()).with_config(config);
        assert!(board.open().is_ok());
        pause!(20);
        assert!(board.is_connected());

        transport.forget_reply(&[0xF0, 0x79, 0xF7]);
        pause!(200);
        assert!(!board.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_disconnects() {
        let transport = create_answering_transport();
        let board = Board::from(transport.clone());
        assert!(board.open().is_ok());
        pause!(50);
        assert!(board.is_connected());

        transport.set_failing(true);
        pause!(10);
        assert!(!board.is_connected());
        assert!(board.reader.lock().is_none());
        assert!(board.heartbeat.lock().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen() {
        let transport = create_answering_transport();
        let board = Board::from(transport.clone());
        assert!(board.open().is_ok());
        pause!(50);
        assert!(board.is_connected());

        assert!(board.open().is_ok());
        assert!(!board.is_connected());
        pause!(50);
        assert!(board.is_connected());
        assert!(board.close().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_connection_tasks_are_ignored() {
        let transport = create_answering_transport();
        let board = Board::from(transport.clone());
        assert!(board.open().is_ok());
        let previous = board.generation.load(Ordering::SeqCst);
        pause!(50);

        assert!(board.open().is_ok());
        pause!(50);
        assert!(board.is_connected());
        let current = board.generation.load(Ordering::SeqCst);
        assert_ne!(previous, current);

        // Late tasks of the first connection end without touching the second one.
        let reader = tokio::spawn(Board::read_loop(board.clone(), previous));
        let heartbeat = tokio::spawn(Board::heartbeat_loop(board.clone(), previous));
        assert!(reader.await.unwrap().is_ok());
        assert!(heartbeat.await.unwrap().is_ok());
        assert!(board.if_current(previous, |session| session.close()).is_none());

        assert!(board.is_connected());
        assert!(transport.is_opened());
        assert!(board.reader.lock().is_some());
        assert!(board.heartbeat.lock().is_some());
        assert!(board.if_current(current, |session| session.is_connected()).unwrap());

        // Closing ends the current connection as well.
        assert!(board.close().is_ok());
        assert!(board.if_current(current, |_| ()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_blocks() {
        let transport = create_answering_transport();
        let board = Board::from(transport.clone());
        assert!(board.register_alias("led", 0).is_ok());
        assert!(board.open().is_ok());
        pause!(50);
        transport.take_written();

        assert!(board.set_digital_output("led", true).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x00, 0x01, 0x90, 0x01, 0x00]
        );
        assert!(board.set_analog_output("D1", 50.0).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x01, 0x03, 0xE1, 0x00, 0x01]
        );
        assert!(board.set_servo_angle(3, 90.0).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x03, 0x04, 0xE3, 0x5A, 0x00]
        );
        assert!(board.set_digital_output("nope", true).is_err());
        assert!(board.set_digital_output("A0", true).is_err());
        assert!(transport.written().is_empty());

        transport.push_incoming(&[0xE0, 0x00, 0x04, 0x90, 0x01, 0x00]);
        pause!(10);
        assert_eq!(board.read_analog_input(0).unwrap(), 50);
        assert_eq!(board.read_analog_pin("A0").unwrap(), 50);
        assert!(board.compare_analog(0, Comparison::Above, 40.0).unwrap());
        assert!(board.compare_analog(0, Comparison::Equal, 50.0).unwrap());
        assert!(!board.compare_analog(0, Comparison::Below, 50.0).unwrap());
        assert!(board.compare_analog(1, Comparison::Below, 50.0).is_err());

        // Pin 0 is switched back to INPUT before its level is read.
        assert!(board.is_digital_on(0).unwrap());
        assert_eq!(transport.take_written(), vec![0xF4, 0x00, 0x00]);

        assert!(board.close().is_ok());
    }
}
