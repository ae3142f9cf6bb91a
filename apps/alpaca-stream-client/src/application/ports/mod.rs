//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`Connector`]: performs the secure handshake for an [`Endpoint`]
//! - [`Transport`]: frame-level read/write/close on an open connection

mod endpoint;
mod transport;

pub use endpoint::{DEFAULT_PORT, Endpoint, InvalidEndpoint};
pub use transport::{Connector, Transport, TransportError};
