//! Alpaca Control Envelopes
//!
//! Wire format types for the control messages exchanged on a market-data
//! stream. Market-data payloads (trades, quotes, bars) are not here; the
//! connection passes those through as raw bytes and [`super::payload`]
//! decodes them on request.
//!
//! # Outbound (client -> server)
//! - `{"action":"auth","key":"...","secret":"..."}`
//! - `{"action":"subscribe","trades":["AAPL"],"quotes":["AAPL"]}`
//!
//! # Inbound (server -> client)
//! - `{"T":"success","msg":"connected"}` / `{"T":"success","msg":"authenticated"}`
//! - `{"T":"error","code":402,"msg":"auth failed"}`
//! - `{"T":"subscription","trades":["AAPL"],"quotes":[],"bars":[]}`
//!
//! # References
//!
//! - [Stock Streaming](https://docs.alpaca.markets/docs/real-time-stock-pricing-data)

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::subscription::{Channel, SubscriptionRequest};

// =============================================================================
// Inbound
// =============================================================================

/// Success message indicating connection or authentication succeeded.
///
/// # Wire Format (JSON)
/// ```json
/// {"T": "success", "msg": "connected"}
/// {"T": "success", "msg": "authenticated"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessMessage {
    /// Message type (always "success")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Success message: "connected" or "authenticated"
    pub msg: SuccessKind,
}

/// Kind of success message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessKind {
    /// Initial connection established
    Connected,
    /// Authentication successful
    Authenticated,
    /// Any other status text
    #[serde(other)]
    Other,
}

/// Error message with code and description.
///
/// # Error Codes
/// - 400: Invalid syntax
/// - 401: Not authenticated
/// - 402: Auth failed
/// - 403: Already authenticated
/// - 404: Auth timeout
/// - 405: Symbol limit exceeded
/// - 406: Connection limit exceeded
/// - 407: Slow client
/// - 408: Insufficient subscription
/// - 409: Not allowed (internal)
/// - 500: Internal error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Message type (always "error")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Error code
    pub code: i32,

    /// Error message
    pub msg: String,
}

/// Subscription confirmation message.
///
/// Echoes every channel's active symbol set after a subscribe call.
///
/// # Wire Format (JSON)
/// ```json
/// {"T": "subscription", "trades": ["AAPL"], "quotes": ["AMD"], "bars": ["*"]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMessage {
    /// Message type (always "subscription")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Subscribed trade symbols
    #[serde(default)]
    pub trades: Vec<String>,

    /// Subscribed quote symbols
    #[serde(default)]
    pub quotes: Vec<String>,

    /// Subscribed bar symbols
    #[serde(default)]
    pub bars: Vec<String>,

    /// Subscribed daily bar symbols
    #[serde(default, rename = "dailyBars")]
    pub daily_bars: Vec<String>,

    /// Subscribed updated bar symbols
    #[serde(default, rename = "updatedBars")]
    pub updated_bars: Vec<String>,

    /// Subscribed status symbols
    #[serde(default)]
    pub statuses: Vec<String>,

    /// Subscribed LULD symbols
    #[serde(default)]
    pub lulds: Vec<String>,

    /// Subscribed news symbols
    #[serde(default)]
    pub news: Vec<String>,
}

impl SubscriptionMessage {
    /// Symbols the server confirmed for `channel`.
    #[must_use]
    pub fn symbols(&self, channel: Channel) -> &[String] {
        match channel {
            Channel::Trades => &self.trades,
            Channel::Quotes => &self.quotes,
            Channel::Bars => &self.bars,
            Channel::DailyBars => &self.daily_bars,
            Channel::UpdatedBars => &self.updated_bars,
            Channel::Statuses => &self.statuses,
            Channel::Lulds => &self.lulds,
            Channel::News => &self.news,
        }
    }

    /// Total confirmed (channel, symbol) pairs.
    #[must_use]
    pub fn total(&self) -> usize {
        Channel::ALL.iter().map(|c| self.symbols(*c).len()).sum()
    }
}

/// A decoded inbound control envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Connection/authentication success
    Success(SuccessMessage),
    /// Error message
    Error(ErrorMessage),
    /// Subscription confirmation
    Subscription(SubscriptionMessage),
    /// Anything else (market data, unknown types), identified by its `T` tag
    Other(Option<String>),
}

impl ControlMessage {
    /// True for `{"T":"success","msg":"authenticated"}`.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            Self::Success(SuccessMessage {
                msg: SuccessKind::Authenticated,
                ..
            })
        )
    }
}

// =============================================================================
// Outbound
// =============================================================================

/// Authentication request for market data streams.
#[derive(Clone, Serialize)]
pub struct AuthRequest {
    /// Action: "auth"
    pub action: &'static str,

    /// API key
    pub key: String,

    /// API secret
    pub secret: String,
}

impl AuthRequest {
    /// Create a new authentication request.
    #[must_use]
    pub const fn new(key: String, secret: String) -> Self {
        Self {
            action: "auth",
            key,
            secret,
        }
    }
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("action", &self.action)
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Subscribe or unsubscribe action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeAction {
    /// Add symbols.
    Subscribe,
    /// Remove symbols.
    Unsubscribe,
}

impl SubscribeAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

/// Outbound subscribe envelope: one symbol array per requested channel.
///
/// Serializes to `{"action":"subscribe","trades":[...],"quotes":[...]}`
/// with channels in request order.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeEnvelope<'a> {
    action: SubscribeAction,
    request: &'a SubscriptionRequest,
}

impl<'a> SubscribeEnvelope<'a> {
    /// Subscribe envelope for `request`.
    #[must_use]
    pub const fn subscribe(request: &'a SubscriptionRequest) -> Self {
        Self {
            action: SubscribeAction::Subscribe,
            request,
        }
    }

    /// Unsubscribe envelope for `request`.
    #[must_use]
    pub const fn unsubscribe(request: &'a SubscriptionRequest) -> Self {
        Self {
            action: SubscribeAction::Unsubscribe,
            request,
        }
    }
}

impl Serialize for SubscribeEnvelope<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.request.channels().len()))?;
        map.serialize_entry("action", self.action.as_str())?;
        for (channel, symbols) in self.request.per_channel() {
            map.serialize_entry(channel.as_str(), symbols)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_success_authenticated() {
        let json = r#"{"T":"success","msg":"authenticated"}"#;
        let msg: SuccessMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.msg, SuccessKind::Authenticated);
    }

    #[test]
    fn deserialize_success_unknown_kind() {
        let json = r#"{"T":"success","msg":"something new"}"#;
        let msg: SuccessMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.msg, SuccessKind::Other);
    }

    #[test]
    fn deserialize_error() {
        let json = r#"{"T":"error","code":401,"msg":"not authenticated"}"#;
        let msg: ErrorMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.code, 401);
    }

    #[test]
    fn subscription_confirmation_counts() {
        let json = r#"{"T":"subscription","trades":["AAPL","TSLA"],"quotes":["AAPL"],"bars":[]}"#;
        let msg: SubscriptionMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.trades.len(), 2);
        assert_eq!(msg.quotes.len(), 1);
        assert_eq!(msg.bars.len(), 0);
        assert_eq!(msg.total(), 3);
        assert_eq!(msg.symbols(Channel::Trades), ["AAPL", "TSLA"]);
    }

    #[test]
    fn auth_request_json() {
        let req = AuthRequest::new("key123".to_string(), "secret456".to_string());
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"action":"auth","key":"key123","secret":"secret456"}"#
        );
        assert!(!format!("{req:?}").contains("secret456"));
    }

    #[test]
    fn subscribe_envelope_one_array_per_channel() {
        let request = SubscriptionRequest::new([Channel::Trades], ["AAPL", "TSLA"]);
        let json = serde_json::to_string(&SubscribeEnvelope::subscribe(&request)).unwrap();
        assert_eq!(json, r#"{"action":"subscribe","trades":["AAPL","TSLA"]}"#);
    }

    #[test]
    fn subscribe_envelope_keeps_channel_order() {
        let request = SubscriptionRequest::new([Channel::Quotes, Channel::DailyBars], ["SPY"]);
        let json = serde_json::to_string(&SubscribeEnvelope::unsubscribe(&request)).unwrap();
        assert_eq!(
            json,
            r#"{"action":"unsubscribe","quotes":["SPY"],"dailyBars":["SPY"]}"#
        );
    }
}
