//! Two-Phase Shutdown
//!
//! Stopping a stream that another task is reading takes two steps:
//!
//! 1. **Close**: cancel the connection. The reader's pending
//!    [`read_message`](StreamReader::read_message) wakes, sends a close frame,
//!    and returns end of stream.
//! 2. **Release**: once the reader is gone, free the connection.
//!
//! The order is enforced by types rather than caller discipline:
//!
//! - [`ShutdownCoordinator::release`] needs a [`CloseRequested`] proof, and
//!   only [`ShutdownCoordinator::close`] can make one. Release also cancels
//!   its own connection, so a proof minted by another coordinator cannot
//!   leave this reader running.
//! - The connection itself lives inside the [`StreamReader`]. It travels back
//!   to the coordinator over a oneshot channel when the reader is dropped, so
//!   release cannot start while a read is still borrowing it.
//!
//! ```ignore
//! let (mut reader, coordinator) = connection.into_reader();
//!
//! let task = tokio::spawn(async move {
//!     while let Ok(Some(payload)) = reader.read_message().await {
//!         handle(payload);
//!     }
//! });
//!
//! let closed = coordinator.close();
//! coordinator.release(closed).await?;
//! ```

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::connection::{StreamConnection, StreamError};
use crate::application::ports::Connector;
use crate::domain::streaming::ConnectionState;

/// Shutdown could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShutdownError {
    /// The hand-back channel closed without carrying the connection.
    #[error("stream reader was lost before returning the connection")]
    ReaderLost,
}

// =============================================================================
// Close Handle
// =============================================================================

/// Requests cancellation of a connection from any task.
///
/// Closing wakes a blocked [`StreamConnection::read_message`] immediately;
/// the reading task then performs the transport teardown.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    token: CancellationToken,
}

impl CloseHandle {
    pub(crate) const fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Request close. Idempotent.
    pub fn close(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("Close requested");
        }
        self.token.cancel();
    }

    /// True once close has been requested.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Proof that close was requested through a [`ShutdownCoordinator`].
#[derive(Debug)]
#[must_use = "pass this to ShutdownCoordinator::release"]
pub struct CloseRequested {
    _private: (),
}

// =============================================================================
// Stream Reader
// =============================================================================

/// The streaming half of a split connection.
///
/// Owns the connection while alive and hands it to the coordinator when
/// dropped.
pub struct StreamReader<C: Connector> {
    connection: Option<StreamConnection<C>>,
    handback: Option<oneshot::Sender<StreamConnection<C>>>,
}

impl<C: Connector> std::fmt::Debug for StreamReader<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> StreamReader<C> {
    pub(crate) const fn new(
        connection: StreamConnection<C>,
        handback: oneshot::Sender<StreamConnection<C>>,
    ) -> Self {
        Self {
            connection: Some(connection),
            handback: Some(handback),
        }
    }

    /// Wait for the next payload. See [`StreamConnection::read_message`].
    ///
    /// # Errors
    ///
    /// Same as [`StreamConnection::read_message`].
    pub async fn read_message(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        match self.connection.as_mut() {
            Some(connection) => connection.read_message().await,
            None => Ok(None),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map_or(ConnectionState::Disconnected, StreamConnection::state)
    }
}

impl<C: Connector> Drop for StreamReader<C> {
    fn drop(&mut self) {
        if let (Some(connection), Some(handback)) = (self.connection.take(), self.handback.take())
            && handback.send(connection).is_err()
        {
            tracing::debug!("Shutdown coordinator gone; dropping connection with reader");
        }
    }
}

// =============================================================================
// Shutdown Coordinator
// =============================================================================

/// The controlling half of a split connection.
pub struct ShutdownCoordinator<C: Connector> {
    handle: CloseHandle,
    returned: oneshot::Receiver<StreamConnection<C>>,
}

impl<C: Connector> std::fmt::Debug for ShutdownCoordinator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("closed", &self.handle.is_closed())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> ShutdownCoordinator<C> {
    pub(crate) const fn new(
        handle: CloseHandle,
        returned: oneshot::Receiver<StreamConnection<C>>,
    ) -> Self {
        Self { handle, returned }
    }

    /// Phase one: request close. Safe to call any number of times.
    pub fn close(&self) -> CloseRequested {
        self.handle.close();
        CloseRequested { _private: () }
    }

    /// Another handle onto the same connection.
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        self.handle.clone()
    }

    /// Phase two: wait for the reader to exit, then release the connection.
    ///
    /// The proof does not identify a connection, so this coordinator's own
    /// close is requested again before waiting.
    ///
    /// A reader that is leaked rather than dropped never hands the
    /// connection back, and this future then stays pending.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::ReaderLost`] if the hand-back channel
    /// closed empty.
    pub async fn release(self, _closed: CloseRequested) -> Result<(), ShutdownError> {
        if !self.handle.is_closed() {
            tracing::warn!("Release called without closing this connection; closing now");
        }
        self.handle.close();
        let connection = self.returned.await.map_err(|_| ShutdownError::ReaderLost)?;
        tracing::debug!(state = %connection.state(), "Reader exited; releasing connection");
        connection.release().await;
        Ok(())
    }
}
