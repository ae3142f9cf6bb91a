//! Subscription Types
//!
//! Channels, feeds, and the channel × symbol subscription request.
//!
//! # Design
//!
//! The protocol takes one symbol array per channel in a single subscribe
//! call, and has no way to say "trades for AAPL but quotes for TSLA" in the
//! same request. A [`SubscriptionRequest`] is therefore the full cartesian
//! product of its channels and symbols.

use std::fmt;
use std::str::FromStr;

// =============================================================================
// Types
// =============================================================================

/// A symbol string (stock ticker or OCC option symbol).
pub type Symbol = String;

/// A named market-data category, subscribable per symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Trades.
    Trades,
    /// Quotes.
    Quotes,
    /// Minute bars.
    Bars,
    /// Daily bars.
    DailyBars,
    /// Corrected minute bars.
    UpdatedBars,
    /// Trading status (halts, resumptions).
    Statuses,
    /// Limit up / limit down bands.
    Lulds,
    /// News.
    News,
}

impl Channel {
    /// Every channel.
    pub const ALL: [Self; 8] = [
        Self::Trades,
        Self::Quotes,
        Self::Bars,
        Self::DailyBars,
        Self::UpdatedBars,
        Self::Statuses,
        Self::Lulds,
        Self::News,
    ];

    /// Field name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trades => "trades",
            Self::Quotes => "quotes",
            Self::Bars => "bars",
            Self::DailyBars => "dailyBars",
            Self::UpdatedBars => "updatedBars",
            Self::Statuses => "statuses",
            Self::Lulds => "lulds",
            Self::News => "news",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel name not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownChannel(trimmed.to_string()))
    }
}

// =============================================================================
// Feeds
// =============================================================================

/// Encoding of frames on a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// JSON text frames (stock feeds).
    #[default]
    Json,
    /// `MessagePack` binary frames (option feeds).
    MsgPack,
}

/// Upstream market-data source, selected by the endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFeed {
    /// Consolidated SIP feed.
    #[default]
    Sip,
    /// IEX only (free tier).
    Iex,
    /// 15-minute delayed SIP.
    DelayedSip,
    /// OPRA options feed.
    Opra,
    /// Indicative options feed.
    Indicative,
}

impl DataFeed {
    /// Parse feed type from string. Unknown names fall back to SIP.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "iex" => Self::Iex,
            "delayed_sip" => Self::DelayedSip,
            "opra" => Self::Opra,
            "indicative" => Self::Indicative,
            _ => Self::Sip,
        }
    }

    /// Feed name used in stream URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sip => "sip",
            Self::Iex => "iex",
            Self::DelayedSip => "delayed_sip",
            Self::Opra => "opra",
            Self::Indicative => "indicative",
        }
    }

    /// API version path segment for this feed.
    #[must_use]
    pub const fn version(self) -> &'static str {
        match self {
            Self::Sip | Self::Iex | Self::DelayedSip => "v2",
            Self::Opra | Self::Indicative => "v1beta1",
        }
    }

    /// Frame encoding used by this feed.
    #[must_use]
    pub const fn wire_format(self) -> WireFormat {
        match self {
            Self::Sip | Self::Iex | Self::DelayedSip => WireFormat::Json,
            Self::Opra | Self::Indicative => WireFormat::MsgPack,
        }
    }

    /// True for option feeds.
    #[must_use]
    pub const fn is_options(self) -> bool {
        matches!(self, Self::Opra | Self::Indicative)
    }
}

// =============================================================================
// Subscription Request
// =============================================================================

/// Ordered channels × ordered symbols.
///
/// Duplicates are dropped on construction, keeping the first occurrence, so
/// the channel order and symbol order of the wire envelope follow the
/// caller's order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionRequest {
    channels: Vec<Channel>,
    symbols: Vec<Symbol>,
}

impl SubscriptionRequest {
    /// Build a request subscribing every channel to every symbol.
    #[must_use]
    pub fn new<C, S>(channels: C, symbols: S) -> Self
    where
        C: IntoIterator<Item = Channel>,
        S: IntoIterator,
        S::Item: Into<Symbol>,
    {
        let mut request = Self::default();
        for channel in channels {
            if !request.channels.contains(&channel) {
                request.channels.push(channel);
            }
        }
        for symbol in symbols {
            let symbol = symbol.into();
            if !request.symbols.contains(&symbol) {
                request.symbols.push(symbol);
            }
        }
        request
    }

    /// Requested channels, in order.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Requested symbols, in order.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// True if there is nothing to subscribe to.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() || self.symbols.is_empty()
    }

    /// Each channel paired with the full symbol list.
    pub fn per_channel(&self) -> impl Iterator<Item = (Channel, &[Symbol])> {
        self.channels
            .iter()
            .map(|channel| (*channel, self.symbols.as_slice()))
    }

    /// Number of (channel, symbol) pairs requested.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.channels.len() * self.symbols.len()
    }
}
