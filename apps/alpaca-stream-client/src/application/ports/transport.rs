//! Transport Port
//!
//! The narrow surface the streaming connection needs from a secure framed
//! duplex transport. Socket and TLS details stay behind it.

use async_trait::async_trait;

use super::Endpoint;
use crate::domain::streaming::{Frame, PoolExhausted};

/// Errors raised by a transport adapter.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Handshake with the server failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Peer reset the connection without a close handshake.
    #[error("connection reset by peer")]
    ConnectionReset,

    /// Transport was already closed locally.
    #[error("transport already closed")]
    Closed,

    /// Frame buffer pool exhausted.
    #[error(transparent)]
    PoolExhausted(#[from] PoolExhausted),

    /// Underlying I/O or protocol error.
    #[error("transport I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// True if the error means the stream ended rather than failed.
    #[must_use]
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::ConnectionReset | Self::Closed)
    }
}

/// Frame-level operations on an open connection.
///
/// `read_frame` returns `Ok(None)` when the stream has ended without a
/// close frame. Frames returned by `read_frame` hold a lease on the
/// transport's [`FramePool`](crate::domain::streaming::FramePool) until
/// dropped.
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next frame.
    async fn read_frame(&mut self) -> Result<Option<Frame>, TransportError>;

    /// Send one payload frame.
    async fn write_frame(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Answer a ping with a pong carrying the same bytes.
    async fn write_control_reply(&mut self, ping_payload: &[u8]) -> Result<(), TransportError>;

    /// Send a close frame and shut the connection down.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Transport produced by a successful handshake.
    type Transport: Transport;

    /// Open a secure connection to `endpoint` and complete the handshake.
    async fn handshake(&self, endpoint: &Endpoint) -> Result<Self::Transport, TransportError>;
}
