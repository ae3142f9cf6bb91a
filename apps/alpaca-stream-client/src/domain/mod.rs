//! Domain Layer - Core streaming types and business logic.
//!
//! This layer contains the connection state machine, the frame model, and
//! subscription types. Nothing here performs I/O.

/// Connection lifecycle and transport frame types.
pub mod streaming;

/// Channels, feeds, and subscription requests.
pub mod subscription;
