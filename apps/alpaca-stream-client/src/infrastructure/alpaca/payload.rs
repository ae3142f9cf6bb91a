//! Market Data Payload Decoder
//!
//! Pure, stateless decoding of the payload frames a [`StreamConnection`]
//! hands back as raw bytes. The connection never calls into this module;
//! callers decode when and if they want typed messages.
//!
//! Stock and option feeds reuse the same `T` tags (`"t"`, `"q"`) for
//! different shapes, so the decoder is built for a feed.
//!
//! ## Stock feeds (SIP/IEX, JSON)
//! - `t`: trade, `q`: quote, `b`/`d`/`u`: minute/daily/updated bar, `s`: status
//!
//! ## Option feeds (OPRA/indicative, `MessagePack`)
//! - `t`: trade, `q`: quote
//!
//! Control envelopes and tags the decoder does not model come back as
//! [`MarketDataMessage::Control`] and [`MarketDataMessage::Unknown`].
//!
//! [`StreamConnection`]: crate::application::services::StreamConnection

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::codec::{CodecError, EnvelopeCodec};
use crate::domain::subscription::{DataFeed, WireFormat};

// =============================================================================
// Stock Messages
// =============================================================================

/// Real-time stock trade.
///
/// # Wire Format (JSON)
/// ```json
/// {"T":"t","i":96921,"S":"AAPL","x":"D","p":126.55,"s":1,
///  "t":"2021-02-22T15:51:44.208Z","c":["@","I"],"z":"C"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTrade {
    /// Ticker symbol
    #[serde(rename = "S")]
    pub symbol: String,

    /// Trade ID (unique per exchange per day)
    #[serde(rename = "i")]
    pub trade_id: i64,

    /// Exchange code
    #[serde(rename = "x")]
    pub exchange: String,

    /// Trade price
    #[serde(rename = "p")]
    pub price: Decimal,

    /// Trade size (shares)
    #[serde(rename = "s")]
    pub size: i64,

    /// Trade timestamp
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,

    /// Condition codes
    #[serde(rename = "c", default)]
    pub conditions: Vec<String>,

    /// Tape: "A" (NYSE), "B" (ARCA/regional), "C" (NASDAQ)
    #[serde(rename = "z", default)]
    pub tape: String,
}

/// Real-time stock quote (NBBO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockQuote {
    /// Ticker symbol
    #[serde(rename = "S")]
    pub symbol: String,

    /// Bid exchange code
    #[serde(rename = "bx")]
    pub bid_exchange: String,

    /// Bid price
    #[serde(rename = "bp")]
    pub bid_price: Decimal,

    /// Bid size (round lots)
    #[serde(rename = "bs")]
    pub bid_size: i64,

    /// Ask exchange code
    #[serde(rename = "ax")]
    pub ask_exchange: String,

    /// Ask price
    #[serde(rename = "ap")]
    pub ask_price: Decimal,

    /// Ask size (round lots)
    #[serde(rename = "as")]
    pub ask_size: i64,

    /// Quote timestamp
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,

    /// Condition codes
    #[serde(rename = "c", default)]
    pub conditions: Vec<String>,

    /// Tape
    #[serde(rename = "z", default)]
    pub tape: String,
}

/// Which bar stream a [`StockBar`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarKind {
    /// `b`: minute bar
    Minute,
    /// `d`: daily bar
    Daily,
    /// `u`: corrected minute bar
    Updated,
}

/// OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBar {
    /// Ticker symbol
    #[serde(rename = "S")]
    pub symbol: String,

    /// Open price
    #[serde(rename = "o")]
    pub open: Decimal,

    /// High price
    #[serde(rename = "h")]
    pub high: Decimal,

    /// Low price
    #[serde(rename = "l")]
    pub low: Decimal,

    /// Close price
    #[serde(rename = "c")]
    pub close: Decimal,

    /// Volume (shares)
    #[serde(rename = "v")]
    pub volume: i64,

    /// Number of trades in the bar
    #[serde(rename = "n", default)]
    pub trade_count: i64,

    /// Volume-weighted average price
    #[serde(rename = "vw", default)]
    pub vwap: Option<Decimal>,

    /// Start of the bar period
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
}

/// Trading status change (halts, resumptions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingStatus {
    /// Ticker symbol
    #[serde(rename = "S")]
    pub symbol: String,

    /// Status code ("T" trading, "H" halted, ...)
    #[serde(rename = "sc", default)]
    pub status_code: Option<String>,

    /// Status text
    #[serde(rename = "sm", default)]
    pub status_message: Option<String>,

    /// Reason code
    #[serde(rename = "rc", default)]
    pub reason_code: Option<String>,

    /// Reason text
    #[serde(rename = "rm", default)]
    pub reason_message: Option<String>,

    /// Status timestamp
    #[serde(rename = "t", default)]
    pub timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// Option Messages
// =============================================================================

/// Real-time option trade. `symbol` is an OCC symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTrade {
    /// OCC option symbol (e.g., "AAPL240315C00172500")
    #[serde(rename = "S")]
    pub symbol: String,

    /// Trade timestamp
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,

    /// Trade price
    #[serde(rename = "p")]
    pub price: Decimal,

    /// Trade size (contracts)
    #[serde(rename = "s")]
    pub size: i64,

    /// Exchange code
    #[serde(rename = "x")]
    pub exchange: String,

    /// Condition code
    #[serde(rename = "c", default)]
    pub condition: Option<String>,
}

/// Real-time option quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionQuote {
    /// OCC option symbol
    #[serde(rename = "S")]
    pub symbol: String,

    /// Quote timestamp
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,

    /// Bid exchange code
    #[serde(rename = "bx")]
    pub bid_exchange: String,

    /// Bid price
    #[serde(rename = "bp")]
    pub bid_price: Decimal,

    /// Bid size (contracts)
    #[serde(rename = "bs")]
    pub bid_size: i64,

    /// Ask exchange code
    #[serde(rename = "ax")]
    pub ask_exchange: String,

    /// Ask price
    #[serde(rename = "ap")]
    pub ask_price: Decimal,

    /// Ask size (contracts)
    #[serde(rename = "as")]
    pub ask_size: i64,

    /// Condition code
    #[serde(rename = "c", default)]
    pub condition: Option<String>,
}

// =============================================================================
// Decoded Message
// =============================================================================

/// One decoded market-data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketDataMessage {
    /// Stock trade
    Trade(StockTrade),
    /// Stock quote
    Quote(StockQuote),
    /// Stock bar
    Bar(BarKind, StockBar),
    /// Trading status
    Status(TradingStatus),
    /// Option trade
    OptionTrade(OptionTrade),
    /// Option quote
    OptionQuote(OptionQuote),
    /// Control envelope (`success`, `error`, `subscription`)
    Control(String),
    /// Tag this decoder does not model
    Unknown(Option<String>),
}

impl MarketDataMessage {
    /// Symbol the message is about, if it has one.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Trade(m) => Some(&m.symbol),
            Self::Quote(m) => Some(&m.symbol),
            Self::Bar(_, m) => Some(&m.symbol),
            Self::Status(m) => Some(&m.symbol),
            Self::OptionTrade(m) => Some(&m.symbol),
            Self::OptionQuote(m) => Some(&m.symbol),
            Self::Control(_) | Self::Unknown(_) => None,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Trade(_) => "trade",
            Self::Quote(_) => "quote",
            Self::Bar(..) => "bar",
            Self::Status(_) => "status",
            Self::OptionTrade(_) => "option_trade",
            Self::OptionQuote(_) => "option_quote",
            Self::Control(_) => "control",
            Self::Unknown(_) => "unknown",
        }
    }
}

// =============================================================================
// Decoder
// =============================================================================

/// Stateless payload decoder bound to a feed's asset class and wire format.
#[derive(Debug, Clone, Copy)]
pub struct PayloadDecoder {
    codec: EnvelopeCodec,
    options: bool,
}

impl PayloadDecoder {
    /// Decoder for frames from `feed`.
    #[must_use]
    pub const fn for_feed(feed: DataFeed) -> Self {
        Self {
            codec: EnvelopeCodec::new(feed.wire_format()),
            options: feed.is_options(),
        }
    }

    /// Wire format this decoder reads.
    #[must_use]
    pub const fn format(&self) -> WireFormat {
        self.codec.format()
    }

    /// Decode one payload frame into its messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid for the wire format or a
    /// recognized message is missing required fields.
    pub fn decode(&self, payload: &[u8]) -> Result<Vec<MarketDataMessage>, CodecError> {
        self.codec
            .decode_values(payload)?
            .into_iter()
            .map(|value| self.decode_value(value))
            .collect()
    }

    fn decode_value(&self, value: Value) -> Result<MarketDataMessage, CodecError> {
        let tag = value.get("T").and_then(Value::as_str).map(str::to_string);

        let message = match (self.options, tag.as_deref()) {
            (_, Some(control @ ("success" | "error" | "subscription"))) => {
                MarketDataMessage::Control(control.to_string())
            }
            (false, Some("t")) => MarketDataMessage::Trade(serde_json::from_value(value)?),
            (false, Some("q")) => MarketDataMessage::Quote(serde_json::from_value(value)?),
            (false, Some("b")) => MarketDataMessage::Bar(BarKind::Minute, serde_json::from_value(value)?),
            (false, Some("d")) => MarketDataMessage::Bar(BarKind::Daily, serde_json::from_value(value)?),
            (false, Some("u")) => MarketDataMessage::Bar(BarKind::Updated, serde_json::from_value(value)?),
            (false, Some("s")) => MarketDataMessage::Status(serde_json::from_value(value)?),
            (true, Some("t")) => MarketDataMessage::OptionTrade(serde_json::from_value(value)?),
            (true, Some("q")) => MarketDataMessage::OptionQuote(serde_json::from_value(value)?),
            _ => MarketDataMessage::Unknown(tag),
        };

        Ok(message)
    }
}

/// Decode one payload frame from `feed`.
///
/// # Errors
///
/// See [`PayloadDecoder::decode`].
pub fn decode(payload: &[u8], feed: DataFeed) -> Result<Vec<MarketDataMessage>, CodecError> {
    PayloadDecoder::for_feed(feed).decode(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_stock_trade_batch() {
        let json = br#"[{"T":"t","i":96921,"S":"AAPL","x":"D","p":126.55,"s":1,"t":"2021-02-22T15:51:44.208Z","c":["@","I"],"z":"C"}]"#;
        let messages = decode(json, DataFeed::Sip).unwrap();

        let MarketDataMessage::Trade(trade) = &messages[0] else {
            panic!("expected trade, got {messages:?}");
        };
        assert_eq!(trade.symbol, "AAPL");
        assert_eq!(trade.price, Decimal::new(12655, 2));
        assert_eq!(trade.conditions, ["@", "I"]);
    }

    #[test]
    fn decodes_mixed_batch() {
        let json = br#"[
            {"T":"q","S":"AMD","bx":"U","bp":87.66,"bs":1,"ax":"Q","ap":87.68,"as":4,"t":"2021-02-22T15:51:45.335689322Z","c":["R"],"z":"C"},
            {"T":"d","S":"SPY","o":388.985,"h":389.13,"l":388.975,"c":389.12,"v":49378,"n":461,"vw":389.062639,"t":"2021-02-22T19:15:00Z"},
            {"T":"s","S":"AAPL","sc":"H","sm":"Halted"}
        ]"#;
        let messages = decode(json, DataFeed::Iex).unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].kind(), "quote");
        assert!(matches!(&messages[1], MarketDataMessage::Bar(BarKind::Daily, bar) if bar.volume == 49378));
        assert_eq!(messages[2].symbol(), Some("AAPL"));
    }

    #[test]
    fn control_and_unknown_are_tagged() {
        let json = br#"[{"T":"success","msg":"authenticated"},{"T":"n","headline":"x"}]"#;
        let messages = decode(json, DataFeed::Sip).unwrap();
        assert_eq!(messages[0], MarketDataMessage::Control("success".to_string()));
        assert_eq!(messages[1], MarketDataMessage::Unknown(Some("n".to_string())));
    }

    #[test]
    fn option_feed_decodes_msgpack_trade() {
        let value = serde_json::json!([{
            "T": "t",
            "S": "AAPL240315C00172500",
            "t": "2024-03-11T13:35:35.13312256Z",
            "p": 2.84,
            "s": 1,
            "x": "N",
            "c": "S"
        }]);
        let bytes = rmp_serde::to_vec_named(&value).unwrap();

        let decoder = PayloadDecoder::for_feed(DataFeed::Opra);
        assert_eq!(decoder.format(), WireFormat::MsgPack);

        let messages = decoder.decode(&bytes).unwrap();
        let MarketDataMessage::OptionTrade(trade) = &messages[0] else {
            panic!("expected option trade, got {messages:?}");
        };
        assert_eq!(trade.symbol, "AAPL240315C00172500");
        assert_eq!(trade.condition.as_deref(), Some("S"));
    }

    #[test]
    fn missing_fields_are_errors() {
        assert!(decode(br#"[{"T":"t","S":"AAPL"}]"#, DataFeed::Sip).is_err());
    }
}
