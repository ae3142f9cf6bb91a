//! Application Layer - Use cases and port definitions.
//!
//! The streaming connection service and the transport ports it drives.

/// Port interfaces for the framed transport.
pub mod ports;

/// Streaming connection and shutdown coordination.
pub mod services;
