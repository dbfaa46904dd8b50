//! Defines the task runner driving the board background loops.
use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::errors::{Error, RuntimeError};

/// Represents a handler to a running task: aborting it cancels the task at its next await point.
pub type TaskHandler = JoinHandle<Result<(), Error>>;

/// Runs a given future as a Tokio task on the current runtime.
///
/// # Parameters
/// * `future`: A future resolving to `Result<(), Error>`, `Send` and `'static`.
///
/// # Errors
/// Returns a `RuntimeError` when called outside a tokio runtime.
///
/// # Example
/// ```
/// use firmbridge::utils::task;
///
/// #[tokio::main]
/// async fn main() {
///     let handler = task::run(async move {
///         // whatever
///         Ok(())
///     })
///     .unwrap();
///     handler.abort();
/// }
/// ```
pub fn run<F>(future: F) -> Result<TaskHandler, Error>
where
    F: Future<Output = Result<(), Error>> + Send + 'static,
{
    let runtime = Handle::try_current().map_err(|_| RuntimeError)?;
    Ok(runtime.spawn(future))
}

/// Sleeps (asynchronously) for the given number of milliseconds.
#[macro_export]
macro_rules! pause {
    ($ms:expr) => {
        $crate::utils::tokio::time::sleep($crate::utils::tokio::time::Duration::from_millis(
            $ms as u64,
        ))
        .await
    };
}
