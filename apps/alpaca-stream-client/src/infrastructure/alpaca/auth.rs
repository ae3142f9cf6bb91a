//! Stream Authentication
//!
//! Credentials and the typed reasons an auth exchange can fail.
//!
//! # Authentication Flow
//!
//! 1. Connect to WebSocket endpoint
//! 2. Receive `{"T":"success","msg":"connected"}` from server
//! 3. Send `{"action":"auth","key":"...","secret":"..."}`
//! 4. Receive `{"T":"success","msg":"authenticated"}` or error
//!
//! The server drops connections that have not authenticated within 10
//! seconds of connecting. That window is enforced server-side and shows up
//! here as [`AuthError::Timeout`] (code 404); no local timer runs.
//!
//! # References
//!
//! - [Stock Streaming Auth](https://docs.alpaca.markets/docs/streaming-market-data)

use thiserror::Error;

use super::messages::{AuthRequest, ErrorMessage};

// =============================================================================
// Error Types
// =============================================================================

/// Why the server did not confirm authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Not authenticated (code 401).
    #[error("not authenticated: must authenticate before making requests")]
    NotAuthenticated,

    /// Invalid key or secret (code 402).
    #[error("authentication failed: invalid API key or secret")]
    InvalidCredentials,

    /// Connection was already authenticated (code 403).
    #[error("already authenticated: connection is already authenticated")]
    AlreadyAuthenticated,

    /// Credential window elapsed (code 404).
    #[error("authentication timeout: must authenticate within 10 seconds")]
    Timeout,

    /// Too many concurrent connections (code 406).
    #[error("connection limit exceeded: too many concurrent connections")]
    ConnectionLimitExceeded,

    /// Any other server error.
    #[error("server error ({code}): {message}")]
    ServerError {
        /// Error code from server
        code: i32,
        /// Error message from server
        message: String,
    },

    /// Response carried neither success nor error.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Stream ended before a response arrived.
    #[error("connection closed before authentication completed")]
    ConnectionClosed,
}

impl From<&ErrorMessage> for AuthError {
    fn from(err: &ErrorMessage) -> Self {
        match err.code {
            401 => Self::NotAuthenticated,
            402 => Self::InvalidCredentials,
            403 => Self::AlreadyAuthenticated,
            404 => Self::Timeout,
            406 => Self::ConnectionLimitExceeded,
            code => Self::ServerError {
                code,
                message: err.msg.clone(),
            },
        }
    }
}

/// Credentials could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid credentials: {0}")]
pub struct CredentialsError(pub &'static str);

// =============================================================================
// Credentials
// =============================================================================

/// Alpaca API credentials.
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    /// Create new credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if either key or secret is empty.
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Result<Self, CredentialsError> {
        let key = key.into();
        let secret = secret.into();

        if key.is_empty() {
            return Err(CredentialsError("API key cannot be empty"));
        }
        if secret.is_empty() {
            return Err(CredentialsError("API secret cannot be empty"));
        }

        Ok(Self { key, secret })
    }

    /// Get the API key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the API secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Build the market-data auth envelope.
    #[must_use]
    pub fn to_auth_request(&self) -> AuthRequest {
        AuthRequest::new(self.key.clone(), self.secret.clone())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl std::fmt::Display for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credentials(key={})", self.key)
    }
}
