//! Historical Market Data
//!
//! One GET per call against the data API. Query strings are built from typed
//! parameter structs; pagination is left to the caller through
//! [`RawResponse::next_page_token`](super::RawResponse::next_page_token).
//!
//! | Call                 | Path                          |
//! |----------------------|-------------------------------|
//! | `stock_bars`         | `/v2/stocks/bars`             |
//! | `stock_trades`       | `/v2/stocks/trades`           |
//! | `stock_quotes`       | `/v2/stocks/quotes`           |
//! | `option_bars`        | `/v1beta1/options/bars`       |
//! | `option_trades`      | `/v1beta1/options/trades`     |

use chrono::{DateTime, SecondsFormat, Utc};

use super::{RawResponse, RestClient, RestError, join_url};
use crate::domain::subscription::{DataFeed, Symbol};

type Query = Vec<(&'static str, String)>;

// =============================================================================
// Parameter Types
// =============================================================================

/// Bar aggregation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFrame {
    /// `n` minutes (1-59)
    Minute(u8),
    /// `n` hours (1-23)
    Hour(u8),
    /// One day
    Day,
    /// One week
    Week,
    /// `n` months (1, 2, 3, 4, 6 or 12)
    Month(u8),
}

impl TimeFrame {
    fn to_query(self) -> String {
        match self {
            Self::Minute(n) => format!("{n}Min"),
            Self::Hour(n) => format!("{n}Hour"),
            Self::Day => "1Day".to_string(),
            Self::Week => "1Week".to_string(),
            Self::Month(n) => format!("{n}Month"),
        }
    }
}

/// Result ordering by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sort {
    /// Oldest first
    #[default]
    Asc,
    /// Newest first
    Desc,
}

impl Sort {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Corporate action adjustment for stock bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Adjustment {
    /// No adjustment
    #[default]
    Raw,
    /// Split-adjusted
    Split,
    /// Dividend-adjusted
    Dividend,
    /// Split and dividend adjusted
    All,
}

impl Adjustment {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Split => "split",
            Self::Dividend => "dividend",
            Self::All => "all",
        }
    }
}

/// Window and paging options shared by every historical call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window {
    /// Inclusive start.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive end.
    pub end: Option<DateTime<Utc>>,
    /// Maximum data points per page.
    pub limit: Option<u32>,
    /// Token from a previous page.
    pub page_token: Option<String>,
    /// Ordering.
    pub sort: Option<Sort>,
}

impl Window {
    fn extend(&self, query: &mut Query) {
        if let Some(start) = self.start {
            query.push(("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(end) = self.end {
            query.push(("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(token) = self.page_token.as_ref().filter(|t| !t.is_empty()) {
            query.push(("page_token", token.clone()));
        }
        if let Some(sort) = self.sort {
            query.push(("sort", sort.as_str().to_string()));
        }
    }
}

/// Stock bars query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsParams {
    /// Symbols, comma-joined on the wire.
    pub symbols: Vec<Symbol>,
    /// Aggregation period.
    pub timeframe: TimeFrame,
    /// Window and paging.
    pub window: Window,
    /// Source feed.
    pub feed: Option<DataFeed>,
    /// Corporate action adjustment.
    pub adjustment: Option<Adjustment>,
}

impl BarsParams {
    /// Bars for `symbols` at `timeframe`.
    #[must_use]
    pub fn new<S: Into<Symbol>>(symbols: impl IntoIterator<Item = S>, timeframe: TimeFrame) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            timeframe,
            window: Window::default(),
            feed: None,
            adjustment: None,
        }
    }

    fn to_query(&self) -> Query {
        let mut query = vec![
            ("symbols", join_symbols(&self.symbols)),
            ("timeframe", self.timeframe.to_query()),
        ];
        self.window.extend(&mut query);
        if let Some(feed) = self.feed {
            query.push(("feed", feed.as_str().to_string()));
        }
        if let Some(adjustment) = self.adjustment {
            query.push(("adjustment", adjustment.as_str().to_string()));
        }
        query
    }
}

/// Stock trades or quotes query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicksParams {
    /// Symbols, comma-joined on the wire.
    pub symbols: Vec<Symbol>,
    /// Window and paging.
    pub window: Window,
    /// Source feed.
    pub feed: Option<DataFeed>,
}

impl TicksParams {
    /// Ticks for `symbols`.
    #[must_use]
    pub fn new<S: Into<Symbol>>(symbols: impl IntoIterator<Item = S>) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn to_query(&self) -> Query {
        let mut query = vec![("symbols", join_symbols(&self.symbols))];
        self.window.extend(&mut query);
        if let Some(feed) = self.feed {
            query.push(("feed", feed.as_str().to_string()));
        }
        query
    }
}

/// Option bars query. Symbols are OCC symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionBarsParams {
    /// OCC symbols, comma-joined on the wire.
    pub symbols: Vec<Symbol>,
    /// Aggregation period.
    pub timeframe: TimeFrame,
    /// Window and paging.
    pub window: Window,
}

impl OptionBarsParams {
    fn to_query(&self) -> Query {
        let mut query = vec![
            ("symbols", join_symbols(&self.symbols)),
            ("timeframe", self.timeframe.to_query()),
        ];
        self.window.extend(&mut query);
        query
    }
}

/// Option trades query. Symbols are OCC symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionTradesParams {
    /// OCC symbols, comma-joined on the wire.
    pub symbols: Vec<Symbol>,
    /// Window and paging.
    pub window: Window,
}

impl OptionTradesParams {
    fn to_query(&self) -> Query {
        let mut query = vec![("symbols", join_symbols(&self.symbols))];
        self.window.extend(&mut query);
        query
    }
}

fn join_symbols(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(|s| s.trim().to_uppercase())
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// Client
// =============================================================================

/// Historical market data client.
#[derive(Debug, Clone)]
pub struct HistoricalClient {
    http: RestClient,
    base_url: String,
}

impl HistoricalClient {
    /// Client for the data host `base_url`.
    #[must_use]
    pub fn new(http: RestClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// `GET /v2/stocks/bars`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] if no response was received.
    pub async fn stock_bars(&self, params: &BarsParams) -> Result<RawResponse, RestError> {
        self.fetch("/v2/stocks/bars", params.to_query()).await
    }

    /// `GET /v2/stocks/trades`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] if no response was received.
    pub async fn stock_trades(&self, params: &TicksParams) -> Result<RawResponse, RestError> {
        self.fetch("/v2/stocks/trades", params.to_query()).await
    }

    /// `GET /v2/stocks/quotes`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] if no response was received.
    pub async fn stock_quotes(&self, params: &TicksParams) -> Result<RawResponse, RestError> {
        self.fetch("/v2/stocks/quotes", params.to_query()).await
    }

    /// `GET /v1beta1/options/bars`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] if no response was received.
    pub async fn option_bars(&self, params: &OptionBarsParams) -> Result<RawResponse, RestError> {
        self.fetch("/v1beta1/options/bars", params.to_query()).await
    }

    /// `GET /v1beta1/options/trades`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] if no response was received.
    pub async fn option_trades(
        &self,
        params: &OptionTradesParams,
    ) -> Result<RawResponse, RestError> {
        self.fetch("/v1beta1/options/trades", params.to_query()).await
    }

    async fn fetch(&self, path: &str, query: Query) -> Result<RawResponse, RestError> {
        self.http.get(&join_url(&self.base_url, path), &query).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn value<'a>(query: &'a Query, key: &str) -> Option<&'a str> {
        query.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn bars_query_has_all_options() {
        let mut params = BarsParams::new(["aapl", "TSLA"], TimeFrame::Minute(15));
        params.window = Window {
            start: Some(Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()),
            end: None,
            limit: Some(1000),
            page_token: Some("abc".to_string()),
            sort: Some(Sort::Desc),
        };
        params.feed = Some(DataFeed::Iex);
        params.adjustment = Some(Adjustment::Split);

        let query = params.to_query();
        assert_eq!(value(&query, "symbols"), Some("AAPL,TSLA"));
        assert_eq!(value(&query, "timeframe"), Some("15Min"));
        assert_eq!(value(&query, "start"), Some("2024-01-02T14:30:00Z"));
        assert_eq!(value(&query, "end"), None);
        assert_eq!(value(&query, "limit"), Some("1000"));
        assert_eq!(value(&query, "page_token"), Some("abc"));
        assert_eq!(value(&query, "sort"), Some("desc"));
        assert_eq!(value(&query, "feed"), Some("iex"));
        assert_eq!(value(&query, "adjustment"), Some("split"));
    }

    #[test]
    fn empty_page_token_omitted() {
        let mut params = TicksParams::new(["SPY"]);
        params.window.page_token = Some(String::new());
        assert_eq!(value(&params.to_query(), "page_token"), None);
    }

    #[test]
    fn timeframes() {
        assert_eq!(TimeFrame::Hour(4).to_query(), "4Hour");
        assert_eq!(TimeFrame::Day.to_query(), "1Day");
        assert_eq!(TimeFrame::Week.to_query(), "1Week");
        assert_eq!(TimeFrame::Month(3).to_query(), "3Month");
    }
}
