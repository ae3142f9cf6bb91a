//! Connection Lifecycle State Machine
//!
//! A single-owner state machine for one streaming connection. Every change
//! of state goes through [`ConnectionState::transition`], which rejects any
//! edge not in the table below.
//!
//! ```text
//! Disconnected ──ConnectStarted──► Connecting ──HandshakeCompleted──► Connected
//!                                      │
//!                                      └──HandshakeFailed──► Disconnected
//!
//! Connected ──AuthStarted──► Authenticating ──AuthConfirmed──► Authenticated
//!                                  └──AuthRejected──► Failed
//!
//! Authenticated ──SubscribeConfirmed──► Subscribed
//! Authenticated | Subscribed ──SubscribeRejected──► Failed
//!
//! any ──Closed | StreamEnded──► Disconnected
//! ```

use std::fmt;

// =============================================================================
// States
// =============================================================================

/// Lifecycle state of a streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport is open.
    #[default]
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Transport open, not yet authenticated.
    Connected,
    /// Auth envelope sent, awaiting confirmation.
    Authenticating,
    /// Server accepted the credentials.
    Authenticated,
    /// Server confirmed a subscription.
    Subscribed,
    /// Server rejected auth or subscription. Caller must reconnect.
    Failed,
}

impl ConnectionState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Disconnected,
        Self::Connecting,
        Self::Connected,
        Self::Authenticating,
        Self::Authenticated,
        Self::Subscribed,
        Self::Failed,
    ];

    /// True iff the connection is authenticated (and possibly subscribed).
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Authenticated | Self::Subscribed)
    }

    /// True when a transport is open and frames may be read from it.
    #[must_use]
    pub const fn has_transport(self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Authenticating | Self::Authenticated | Self::Subscribed
        )
    }

    /// State name for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Subscribed => "subscribed",
            Self::Failed => "failed",
        }
    }

    /// Apply a lifecycle event.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] if `event` is not a legal edge out of
    /// the current state. The current state is left untouched in that case.
    pub const fn transition(self, event: LifecycleEvent) -> Result<Self, IllegalTransition> {
        use ConnectionState as S;
        use LifecycleEvent as E;

        let next = match (self, event) {
            (S::Disconnected, E::ConnectStarted) => S::Connecting,
            (S::Connecting, E::HandshakeCompleted) => S::Connected,
            (S::Connecting, E::HandshakeFailed) => S::Disconnected,
            (S::Connected, E::AuthStarted) => S::Authenticating,
            (S::Authenticating, E::AuthConfirmed) => S::Authenticated,
            (S::Authenticating, E::AuthRejected) => S::Failed,
            (S::Authenticated, E::SubscribeConfirmed) => S::Subscribed,
            (S::Authenticated | S::Subscribed, E::SubscribeRejected) => S::Failed,
            (_, E::Closed | E::StreamEnded) => S::Disconnected,
            (from, event) => return Err(IllegalTransition { from, event }),
        };

        Ok(next)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Events
// =============================================================================

/// Events that drive the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// `connect()` called.
    ConnectStarted,
    /// Transport handshake succeeded.
    HandshakeCompleted,
    /// Transport handshake failed.
    HandshakeFailed,
    /// Auth envelope about to be sent.
    AuthStarted,
    /// Server answered with `authenticated`.
    AuthConfirmed,
    /// Server answered without the success marker.
    AuthRejected,
    /// Server echoed a subscription confirmation.
    SubscribeConfirmed,
    /// Server answered without a subscription confirmation.
    SubscribeRejected,
    /// Local close.
    Closed,
    /// Close frame, end-of-stream, or connection reset from the peer.
    StreamEnded,
}

/// An edge that is not in the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition: {event:?} in state {from}")]
pub struct IllegalTransition {
    /// State the event was applied to.
    pub from: ConnectionState,
    /// Rejected event.
    pub event: LifecycleEvent,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ConnectionState::Disconnected => false)]
    #[test_case(ConnectionState::Connecting => false)]
    #[test_case(ConnectionState::Connected => false)]
    #[test_case(ConnectionState::Authenticating => false)]
    #[test_case(ConnectionState::Authenticated => true)]
    #[test_case(ConnectionState::Subscribed => true)]
    #[test_case(ConnectionState::Failed => false)]
    fn is_active(state: ConnectionState) -> bool {
        state.is_active()
    }

    #[test]
    fn happy_path() {
        let mut state = ConnectionState::default();
        for event in [
            LifecycleEvent::ConnectStarted,
            LifecycleEvent::HandshakeCompleted,
            LifecycleEvent::AuthStarted,
            LifecycleEvent::AuthConfirmed,
            LifecycleEvent::SubscribeConfirmed,
        ] {
            state = state.transition(event).unwrap();
        }
        assert_eq!(state, ConnectionState::Subscribed);
    }

    #[test]
    fn auth_rejected_fails() {
        let state = ConnectionState::Authenticating
            .transition(LifecycleEvent::AuthRejected)
            .unwrap();
        assert_eq!(state, ConnectionState::Failed);
    }

    #[test]
    fn subscribe_rejected_from_subscribed_fails() {
        let state = ConnectionState::Subscribed
            .transition(LifecycleEvent::SubscribeRejected)
            .unwrap();
        assert_eq!(state, ConnectionState::Failed);
    }

    #[test]
    fn close_and_stream_end_always_disconnect() {
        for state in ConnectionState::ALL {
            for event in [LifecycleEvent::Closed, LifecycleEvent::StreamEnded] {
                assert_eq!(
                    state.transition(event).unwrap(),
                    ConnectionState::Disconnected
                );
            }
        }
    }

    #[test]
    fn cannot_skip_authentication() {
        let err = ConnectionState::Connected
            .transition(LifecycleEvent::SubscribeConfirmed)
            .unwrap_err();
        assert_eq!(err.from, ConnectionState::Connected);
        assert_eq!(err.event, LifecycleEvent::SubscribeConfirmed);
    }

    #[test]
    fn failed_is_terminal_until_close() {
        for event in [
            LifecycleEvent::ConnectStarted,
            LifecycleEvent::AuthStarted,
            LifecycleEvent::AuthConfirmed,
            LifecycleEvent::SubscribeConfirmed,
        ] {
            assert!(ConnectionState::Failed.transition(event).is_err());
        }
    }

    #[test]
    fn has_transport_matches_open_states() {
        let open: Vec<_> = ConnectionState::ALL
            .into_iter()
            .filter(|s| s.has_transport())
            .collect();
        assert_eq!(
            open,
            vec![
                ConnectionState::Connected,
                ConnectionState::Authenticating,
                ConnectionState::Authenticated,
                ConnectionState::Subscribed,
            ]
        );
    }
}
