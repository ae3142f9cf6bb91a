//! Streaming Connection
//!
//! [`StreamConnection`] drives one market-data stream through
//! connect → authenticate → subscribe → stream. Control exchanges reuse the
//! same single-frame read primitive as streaming: send an envelope, then
//! read exactly one payload frame and inspect it.
//!
//! # Frame Dispatch
//!
//! [`StreamConnection::read_message`] loops over transport frames until it
//! has one payload to hand back:
//!
//! | Frame        | Action                                   | Returns   |
//! |--------------|------------------------------------------|-----------|
//! | Payload      | copy bytes out                           | `Some`    |
//! | Ping         | reply with pong                          | continue  |
//! | Pong         | nothing                                  | continue  |
//! | Other        | log                                      | continue  |
//! | Close / EOF  | disconnect                               | `None`    |
//! | Cancelled    | send close frame, disconnect             | `None`    |
//!
//! Each frame's buffer goes back to the transport's pool when the frame is
//! dropped at the end of its loop iteration, whichever arm ran.

use tokio_util::sync::CancellationToken;

use super::shutdown::{CloseHandle, ShutdownCoordinator, StreamReader};
use crate::application::ports::{Connector, Endpoint, InvalidEndpoint, Transport, TransportError};
use crate::domain::streaming::{ConnectionState, FrameKind, IllegalTransition, LifecycleEvent};
use crate::domain::subscription::{SubscriptionRequest, WireFormat};
use crate::infrastructure::alpaca::auth::{AuthError, Credentials};
use crate::infrastructure::alpaca::codec::{CodecError, EnvelopeCodec};
use crate::infrastructure::alpaca::messages::{
    ControlMessage, SubscribeEnvelope, SubscriptionMessage,
};
use crate::infrastructure::metrics::{self, CloseReason, ExchangeResult};

/// Longest snippet of an unexpected response kept in an error.
const RESPONSE_SNIPPET_LEN: usize = 120;

// =============================================================================
// Error Type
// =============================================================================

/// Errors returned by [`StreamConnection`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Operation needs an open, unauthenticated connection (or, for reads,
    /// any open transport).
    #[error("not connected")]
    NotConnected,

    /// Operation needs an authenticated connection.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Operation needs an active subscription.
    #[error("not subscribed")]
    NotSubscribed,

    /// `connect` called on a connection that is not disconnected.
    #[error("already connected")]
    AlreadyConnected,

    /// Server did not confirm authentication.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[from] AuthError),

    /// Server did not confirm the subscription.
    #[error("subscription failed: {0}")]
    SubscriptionFailed(String),

    /// Handshake failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] TransportError),

    /// Transport failed while reading.
    #[error("read failed: {0}")]
    ReadFailed(#[source] TransportError),

    /// Transport failed while sending an envelope.
    #[error("send failed: {0}")]
    SendFailed(#[source] TransportError),

    /// Stream URL unusable.
    #[error(transparent)]
    InvalidEndpoint(#[from] InvalidEndpoint),

    /// Envelope could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Internal state machine rejected a transition.
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

impl StreamError {
    /// True if the caller violated an operation's state precondition.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::NotAuthenticated
                | Self::NotSubscribed
                | Self::AlreadyConnected
        )
    }
}

// =============================================================================
// Stream Connection
// =============================================================================

/// One market-data stream connection.
///
/// Lifecycle operations take `&mut self`, so they run one at a time. To
/// stream on one task and stop from another, either take a
/// [`CloseHandle`] or split with [`into_reader`](Self::into_reader).
pub struct StreamConnection<C: Connector> {
    connector: C,
    codec: EnvelopeCodec,
    state: ConnectionState,
    transport: Option<C::Transport>,
    cancel: CancellationToken,
}

impl<C: Connector> std::fmt::Debug for StreamConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConnection")
            .field("state", &self.state)
            .field("format", &self.codec.format())
            .field("has_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> StreamConnection<C> {
    /// Create a disconnected connection speaking `format` on the wire.
    #[must_use]
    pub fn new(connector: C, format: WireFormat) -> Self {
        Self {
            connector,
            codec: EnvelopeCodec::new(format),
            state: ConnectionState::Disconnected,
            transport: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// True iff authenticated or subscribed.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Handle that stops this connection from any task.
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle::new(self.cancel.clone())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Parse `url` and open the transport.
    ///
    /// # Errors
    ///
    /// - [`StreamError::AlreadyConnected`] unless disconnected
    /// - [`StreamError::InvalidEndpoint`] if the URL has no host
    /// - [`StreamError::ConnectFailed`] if the handshake fails
    pub async fn connect(&mut self, url: &str) -> Result<(), StreamError> {
        if self.state != ConnectionState::Disconnected {
            return Err(StreamError::AlreadyConnected);
        }
        let endpoint = Endpoint::parse(url)?;
        self.connect_endpoint(&endpoint).await
    }

    /// Open the transport to an already parsed endpoint.
    ///
    /// # Errors
    ///
    /// - [`StreamError::AlreadyConnected`] unless disconnected
    /// - [`StreamError::ConnectFailed`] if the handshake fails
    pub async fn connect_endpoint(&mut self, endpoint: &Endpoint) -> Result<(), StreamError> {
        if self.state != ConnectionState::Disconnected {
            return Err(StreamError::AlreadyConnected);
        }

        // Handles taken before this call stay bound; a spent token is replaced.
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        tracing::info!(url = %endpoint, "Connecting to market data stream");
        self.apply(LifecycleEvent::ConnectStarted)?;

        match self.connector.handshake(endpoint).await {
            Ok(transport) => {
                self.transport = Some(transport);
                self.apply(LifecycleEvent::HandshakeCompleted)?;
                tracing::info!(url = %endpoint, "Market data stream connected");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(url = %endpoint, error = %e, "Handshake failed");
                self.apply(LifecycleEvent::HandshakeFailed)?;
                Err(StreamError::ConnectFailed(e))
            }
        }
    }

    /// Authenticate with `credentials`.
    ///
    /// Drops the server greeting, sends the auth envelope, and reads exactly
    /// one response frame. Must run within the server's credential window
    /// after connecting; the server enforces it and a late call surfaces as
    /// [`AuthError::Timeout`].
    ///
    /// # Errors
    ///
    /// - [`StreamError::NotConnected`] unless connected (state unchanged)
    /// - [`StreamError::AuthenticationFailed`] if the response is not a
    ///   success (state becomes failed), or the stream ends first
    /// - [`StreamError::ReadFailed`] / [`StreamError::SendFailed`] on
    ///   transport failure
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), StreamError> {
        if self.state != ConnectionState::Connected {
            return Err(StreamError::NotConnected);
        }

        match self.read_message().await? {
            Some(greeting) => tracing::debug!(bytes = greeting.len(), "Discarded stream greeting"),
            None => {
                metrics::record_auth(ExchangeResult::Closed);
                return Err(AuthError::ConnectionClosed.into());
            }
        }

        self.apply(LifecycleEvent::AuthStarted)?;
        tracing::debug!(key = credentials.key(), "Sending auth request");
        self.send_envelope(&credentials.to_auth_request()).await?;

        let Some(response) = self.read_message().await? else {
            metrics::record_auth(ExchangeResult::Closed);
            return Err(AuthError::ConnectionClosed.into());
        };

        match self.auth_outcome(&response) {
            Ok(()) => {
                self.apply(LifecycleEvent::AuthConfirmed)?;
                metrics::record_auth(ExchangeResult::Confirmed);
                tracing::info!("Market data stream authenticated");
                Ok(())
            }
            Err(reason) => {
                self.apply(LifecycleEvent::AuthRejected)?;
                metrics::record_auth(ExchangeResult::Rejected);
                tracing::error!(reason = %reason, "Authentication rejected");
                Err(reason.into())
            }
        }
    }

    /// Subscribe every channel in `request` to every symbol in it.
    ///
    /// Returns the server's confirmation, which lists every channel's active
    /// symbol set.
    ///
    /// # Errors
    ///
    /// - [`StreamError::NotAuthenticated`] unless authenticated (state
    ///   unchanged)
    /// - [`StreamError::SubscriptionFailed`] if the response is not a
    ///   confirmation (state becomes failed) or the stream ends first
    /// - [`StreamError::ReadFailed`] / [`StreamError::SendFailed`] on
    ///   transport failure
    pub async fn subscribe(
        &mut self,
        request: &SubscriptionRequest,
    ) -> Result<SubscriptionMessage, StreamError> {
        if self.state != ConnectionState::Authenticated {
            return Err(StreamError::NotAuthenticated);
        }

        tracing::debug!(
            channels = ?request.channels(),
            symbols = ?request.symbols(),
            "Sending subscribe request"
        );
        self.send_envelope(&SubscribeEnvelope::subscribe(request)).await?;

        let Some(response) = self.read_message().await? else {
            metrics::record_subscribe(ExchangeResult::Closed);
            return Err(StreamError::SubscriptionFailed(
                "connection closed before confirmation".to_string(),
            ));
        };

        match self.subscription_outcome(&response) {
            Ok(confirmation) => {
                self.apply(LifecycleEvent::SubscribeConfirmed)?;
                metrics::record_subscribe(ExchangeResult::Confirmed);
                tracing::info!(
                    trades = confirmation.trades.len(),
                    quotes = confirmation.quotes.len(),
                    bars = confirmation.bars.len(),
                    "Subscription confirmed"
                );
                Ok(confirmation)
            }
            Err(reason) => {
                self.apply(LifecycleEvent::SubscribeRejected)?;
                metrics::record_subscribe(ExchangeResult::Rejected);
                tracing::error!(reason = %reason, "Subscription rejected");
                Err(StreamError::SubscriptionFailed(reason))
            }
        }
    }

    /// Remove symbols from an active subscription.
    ///
    /// Send-only: the server's updated confirmation arrives later as an
    /// ordinary payload from [`read_message`](Self::read_message).
    ///
    /// # Errors
    ///
    /// - [`StreamError::NotSubscribed`] unless subscribed
    /// - [`StreamError::SendFailed`] on transport failure
    pub async fn unsubscribe(&mut self, request: &SubscriptionRequest) -> Result<(), StreamError> {
        if self.state != ConnectionState::Subscribed {
            return Err(StreamError::NotSubscribed);
        }
        self.send_envelope(&SubscribeEnvelope::unsubscribe(request)).await
    }

    // =========================================================================
    // Frame Dispatch
    // =========================================================================

    /// Wait for the next payload.
    ///
    /// Returns `Ok(None)` at end of stream: a close frame, the peer going
    /// away, or a [`CloseHandle`] firing. The state is then disconnected.
    /// Keepalive frames are answered here and never surface.
    ///
    /// # Errors
    ///
    /// - [`StreamError::NotConnected`] if no transport is open
    /// - [`StreamError::ReadFailed`] on any other transport failure (state
    ///   unchanged; [`close`](Self::close) still works)
    pub async fn read_message(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        if !self.state.has_transport() {
            return Err(StreamError::NotConnected);
        }

        loop {
            let Some(transport) = self.transport.as_mut() else {
                return Err(StreamError::NotConnected);
            };

            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                read = transport.read_frame() => Some(read),
            };

            let frame = match read {
                None => {
                    tracing::debug!("Read cancelled by close handle");
                    self.shutdown_transport(CloseReason::Cancelled).await;
                    return Ok(None);
                }
                Some(Ok(Some(frame))) => frame,
                Some(Ok(None)) => {
                    self.end_of_stream("stream ended").await;
                    return Ok(None);
                }
                Some(Err(e)) if e.is_end_of_stream() => {
                    self.end_of_stream("connection reset").await;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, state = %self.state, "Transport read failed");
                    return Err(StreamError::ReadFailed(e));
                }
            };

            metrics::record_frame(frame.kind());

            match frame.kind() {
                FrameKind::Payload => return Ok(Some(frame.to_owned_payload())),
                FrameKind::Ping => {
                    tracing::trace!(bytes = frame.payload().len(), "Answering ping");
                    match transport.write_control_reply(frame.payload()).await {
                        Ok(()) => metrics::record_pong_sent(),
                        Err(e) if e.is_end_of_stream() => {
                            drop(frame);
                            self.end_of_stream("closed while answering ping").await;
                            return Ok(None);
                        }
                        Err(e) => return Err(StreamError::ReadFailed(e)),
                    }
                }
                FrameKind::Pong => tracing::trace!("Received pong"),
                FrameKind::Close => {
                    let reason = String::from_utf8_lossy(frame.payload()).into_owned();
                    drop(frame);
                    tracing::info!(reason = %reason, "Server sent close frame");
                    self.end_of_stream("close frame").await;
                    return Ok(None);
                }
                FrameKind::Other => {
                    tracing::debug!(bytes = frame.payload().len(), "Ignoring control frame");
                }
            }
        }
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Send a close frame, shut the transport down, and disconnect.
    ///
    /// A no-op when already disconnected. Transport errors are logged; the
    /// state is reset regardless.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Disconnected && self.transport.is_none() {
            return;
        }
        self.shutdown_transport(CloseReason::Local).await;
    }

    /// Close if needed, then free the transport and its frame pool.
    ///
    /// Consumes the connection, so no read can still be borrowing it.
    pub async fn release(mut self) {
        self.close().await;
        tracing::debug!("Connection released");
    }

    /// Split into a reader for a streaming task and a coordinator for the
    /// task that will stop it.
    ///
    /// The coordinator can only release the connection after the reader has
    /// been dropped.
    #[must_use]
    pub fn into_reader(self) -> (StreamReader<C>, ShutdownCoordinator<C>) {
        let handle = self.close_handle();
        let (tx, rx) = tokio::sync::oneshot::channel();
        (
            StreamReader::new(self, tx),
            ShutdownCoordinator::new(handle, rx),
        )
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn apply(&mut self, event: LifecycleEvent) -> Result<ConnectionState, IllegalTransition> {
        let next = self.state.transition(event)?;
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, event = ?event, "Connection state changed");
        }
        self.state = next;
        Ok(next)
    }

    /// `Closed`/`StreamEnded` are legal from every state.
    fn disconnect(&mut self, event: LifecycleEvent) {
        if let Err(e) = self.apply(event) {
            tracing::error!(error = %e, "Disconnect transition rejected");
            self.state = ConnectionState::Disconnected;
        }
    }

    async fn shutdown_transport(&mut self, reason: CloseReason) {
        if let Some(mut transport) = self.transport.take()
            && let Err(e) = transport.close().await
        {
            tracing::warn!(error = %e, "Error while closing transport");
        }
        self.disconnect(LifecycleEvent::Closed);
        metrics::record_close(reason);
        tracing::info!(reason = ?reason, "Market data stream closed");
    }

    async fn end_of_stream(&mut self, cause: &'static str) {
        if let Some(mut transport) = self.transport.take()
            && let Err(e) = transport.close().await
        {
            tracing::debug!(error = %e, "Transport already gone at end of stream");
        }
        self.disconnect(LifecycleEvent::StreamEnded);
        metrics::record_close(CloseReason::Remote);
        tracing::info!(cause, "Market data stream ended");
    }

    async fn send_envelope<T: serde::Serialize + Sync>(
        &mut self,
        envelope: &T,
    ) -> Result<(), StreamError> {
        let bytes = self.codec.encode(envelope)?;
        let transport = self.transport.as_mut().ok_or(StreamError::NotConnected)?;
        transport
            .write_frame(&bytes)
            .await
            .map_err(StreamError::SendFailed)
    }

    fn auth_outcome(&self, response: &[u8]) -> Result<(), AuthError> {
        let messages = self
            .codec
            .decode_control(response)
            .map_err(|e| AuthError::UnexpectedResponse(e.to_string()))?;

        if messages.iter().any(ControlMessage::is_authenticated) {
            return Ok(());
        }

        let error = messages.iter().find_map(|m| match m {
            ControlMessage::Error(err) => Some(AuthError::from(err)),
            _ => None,
        });

        Err(error.unwrap_or_else(|| AuthError::UnexpectedResponse(snippet(response))))
    }

    fn subscription_outcome(&self, response: &[u8]) -> Result<SubscriptionMessage, String> {
        let messages = self
            .codec
            .decode_control(response)
            .map_err(|e| e.to_string())?;

        let mut error = None;
        for message in messages {
            match message {
                ControlMessage::Subscription(confirmation) => return Ok(confirmation),
                ControlMessage::Error(err) if error.is_none() => {
                    error = Some(format!("server error ({}): {}", err.code, err.msg));
                }
                _ => {}
            }
        }

        Err(error.unwrap_or_else(|| format!("unexpected response: {}", snippet(response))))
    }
}

fn snippet(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(RESPONSE_SNIPPET_LEN)
        .collect()
}
