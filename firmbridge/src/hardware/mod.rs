//! Defines the board a block-programming host drives: the connection lifecycle and the operations
//! exposed as blocks.

mod board;
mod config;
mod status;

pub use board::Board;
pub use config::SessionConfig;
pub use status::{Comparison, ConnectionStatus};
