//! Application Services
//!
//! - `connection`: the streaming connection lifecycle and frame dispatch
//! - `shutdown`: close handles and the two-phase reader/coordinator split

mod connection;
mod shutdown;

pub use connection::{StreamConnection, StreamError};
pub use shutdown::{CloseHandle, CloseRequested, ShutdownCoordinator, ShutdownError, StreamReader};
