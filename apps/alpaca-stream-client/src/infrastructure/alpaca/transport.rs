//! WebSocket Transport Adapter
//!
//! Implements the [`Connector`]/[`Transport`] ports over tokio-tungstenite.
//! TLS (`wss://`) goes through rustls with the webpki root store; plain
//! `ws://` is accepted for local test servers.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{Connector, Endpoint, Transport, TransportError};
use crate::domain::streaming::{DEFAULT_POOL_CAPACITY, Frame, FrameKind, FramePool};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Connector
// =============================================================================

/// Opens WebSocket transports.
#[derive(Debug, Clone, Copy)]
pub struct WsConnector {
    pool_capacity: usize,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl WsConnector {
    /// Connector whose transports lease up to `pool_capacity` frames at once.
    #[must_use]
    pub const fn new(pool_capacity: usize) -> Self {
        Self { pool_capacity }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn handshake(&self, endpoint: &Endpoint) -> Result<WsTransport, TransportError> {
        let url = endpoint.handshake_url();
        tracing::debug!(url = %url, host = endpoint.host(), "Starting WebSocket handshake");

        let (stream, response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        Ok(WsTransport {
            stream,
            pool: FramePool::new(self.pool_capacity),
            closed: false,
        })
    }
}

// =============================================================================
// Transport
// =============================================================================

/// One open WebSocket connection.
pub struct WsTransport {
    stream: WsStream,
    pool: FramePool,
    closed: bool,
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("pool", &self.pool)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl WsTransport {
    fn frame(&self, kind: FrameKind, bytes: &[u8]) -> Result<Frame, TransportError> {
        Ok(Frame::new(kind, self.pool.lease(bytes)?))
    }

    async fn send(&mut self, message: Message) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.stream.send(message).await.map_err(map_ws_error)
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn read_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let Some(message) = self.stream.next().await else {
            return Ok(None);
        };

        let frame = match message.map_err(map_ws_error)? {
            Message::Text(text) => self.frame(FrameKind::Payload, text.as_bytes())?,
            Message::Binary(bytes) => self.frame(FrameKind::Payload, &bytes)?,
            Message::Ping(bytes) => self.frame(FrameKind::Ping, &bytes)?,
            Message::Pong(bytes) => self.frame(FrameKind::Pong, &bytes)?,
            Message::Close(close) => {
                let reason = close.map(|c| c.reason.to_string()).unwrap_or_default();
                self.frame(FrameKind::Close, reason.as_bytes())?
            }
            Message::Frame(raw) => self.frame(FrameKind::Other, raw.payload())?,
        };

        Ok(Some(frame))
    }

    async fn write_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let message = match std::str::from_utf8(payload) {
            Ok(text) => Message::Text(text.to_string().into()),
            Err(_) => Message::Binary(payload.to_vec().into()),
        };
        self.send(message).await
    }

    async fn write_control_reply(&mut self, ping_payload: &[u8]) -> Result<(), TransportError> {
        self.send(Message::Pong(ping_payload.to_vec().into())).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(map_ws_error(e)),
        }
    }
}

fn map_ws_error(err: WsError) -> TransportError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            TransportError::ConnectionReset
        }
        WsError::Io(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) =>
        {
            TransportError::ConnectionReset
        }
        other => TransportError::Io(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_errors_are_end_of_stream() {
        let reset = map_ws_error(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake));
        assert!(reset.is_end_of_stream());

        let io = map_ws_error(WsError::Io(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset,
        )));
        assert!(io.is_end_of_stream());

        assert!(map_ws_error(WsError::ConnectionClosed).is_end_of_stream());
    }

    #[test]
    fn other_errors_are_failures() {
        let err = map_ws_error(WsError::Io(std::io::Error::from(
            std::io::ErrorKind::PermissionDenied,
        )));
        assert!(!err.is_end_of_stream());
    }

    #[tokio::test]
    async fn handshake_to_closed_port_fails() {
        let endpoint = Endpoint::parse("ws://127.0.0.1:9/v2/iex").unwrap();
        let err = WsConnector::default().handshake(&endpoint).await.unwrap_err();
        assert!(matches!(err, TransportError::Handshake(_)));
    }
}
