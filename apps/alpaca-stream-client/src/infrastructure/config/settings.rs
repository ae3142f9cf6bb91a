//! Client Configuration Settings
//!
//! Configuration for the stream client, loaded from environment variables.
//!
//! | Variable                   | Default                               |
//! |----------------------------|---------------------------------------|
//! | `ALPACA_KEY`               | required                              |
//! | `ALPACA_SECRET`            | required                              |
//! | `ALPACA_ENV`               | `paper`                               |
//! | `ALPACA_FEED`              | `sip`                                 |
//! | `ALPACA_STREAM_URL`        | derived from feed                     |
//! | `ALPACA_HTTP_TIMEOUT_SECS` | `30`                                  |
//! | `ALPACA_FRAME_POOL_SIZE`   | `8`                                   |
//! | `ALPACA_SYMBOLS`           | `SPY`                                 |
//! | `ALPACA_CHANNELS`          | `trades,quotes`                       |
//! | `ALPACA_METRICS_PORT`      | unset (exporter disabled)             |

use std::time::Duration;

use crate::application::ports::{Endpoint, InvalidEndpoint};
use crate::domain::streaming::DEFAULT_POOL_CAPACITY;
use crate::domain::subscription::{Channel, DataFeed, SubscriptionRequest, UnknownChannel};
use crate::infrastructure::alpaca::auth::{Credentials, CredentialsError};

/// Market data stream host. Paper and live accounts stream the same data.
pub const STREAM_BASE_URL: &str = "wss://stream.data.alpaca.markets";

/// Historical market data REST host.
pub const DATA_BASE_URL: &str = "https://data.alpaca.markets";

const PAPER_TRADING_URL: &str = "https://paper-api.alpaca.markets";
const LIVE_TRADING_URL: &str = "https://api.alpaca.markets";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SYMBOLS: &str = "SPY";
const DEFAULT_CHANNELS: &str = "trades,quotes";

/// Trading environment (paper vs live).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Paper trading environment (simulated).
    #[default]
    Paper,
    /// Live trading environment (real money).
    Live,
}

impl Environment {
    /// Parse environment from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LIVE" => Self::Live,
            _ => Self::Paper,
        }
    }

    /// Check if this is the live environment.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Get the environment name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Live => "live",
        }
    }

    /// Trading REST host for this environment.
    #[must_use]
    pub const fn trading_base_url(&self) -> &'static str {
        match self {
            Self::Paper => PAPER_TRADING_URL,
            Self::Live => LIVE_TRADING_URL,
        }
    }
}

/// REST client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Trading API host (orders).
    pub trading_base_url: String,
    /// Market data API host (historical).
    pub data_base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpSettings {
    /// Default hosts for `environment`.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            trading_base_url: environment.trading_base_url().to_string(),
            data_base_url: DATA_BASE_URL.to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Trading environment.
    pub environment: Environment,
    /// Market data feed.
    pub feed: DataFeed,
    /// API credentials.
    pub credentials: Credentials,
    /// Stream endpoint.
    pub stream_endpoint: Endpoint,
    /// REST settings.
    pub http: HttpSettings,
    /// Frames a connection may hold leased at once.
    pub frame_pool_size: usize,
    /// What the binary subscribes to.
    pub subscription: SubscriptionRequest,
    /// Prometheus exporter port, if enabled.
    pub metrics_port: Option<u16>,
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or empty, or a URL or
    /// channel name is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration by reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = required(&lookup, "ALPACA_KEY")?;
        let api_secret = required(&lookup, "ALPACA_SECRET")?;
        let credentials = Credentials::new(api_key, api_secret)?;

        let environment = lookup("ALPACA_ENV")
            .map(|s| Environment::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let feed = lookup("ALPACA_FEED")
            .map(|s| DataFeed::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let stream_endpoint = match lookup("ALPACA_STREAM_URL").filter(|s| !s.is_empty()) {
            Some(url) => Endpoint::parse(&url)?,
            None => Endpoint::for_feed(STREAM_BASE_URL, feed)?,
        };

        let mut http = HttpSettings::for_environment(environment);
        http.timeout = parse_or(&lookup, "ALPACA_HTTP_TIMEOUT_SECS")
            .map_or(DEFAULT_HTTP_TIMEOUT, Duration::from_secs);

        let frame_pool_size =
            parse_or(&lookup, "ALPACA_FRAME_POOL_SIZE").unwrap_or(DEFAULT_POOL_CAPACITY);

        let symbols = split_list(
            &lookup("ALPACA_SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.to_string()),
        )
        .into_iter()
        .map(|s| s.to_uppercase())
        .collect::<Vec<_>>();

        let channels = split_list(
            &lookup("ALPACA_CHANNELS").unwrap_or_else(|| DEFAULT_CHANNELS.to_string()),
        )
        .into_iter()
        .map(|s| s.parse::<Channel>())
        .collect::<Result<Vec<_>, _>>()?;

        let subscription = SubscriptionRequest::new(channels, symbols);
        if subscription.is_empty() {
            return Err(ConfigError::EmptySubscription);
        }

        Ok(Self {
            environment,
            feed,
            credentials,
            stream_endpoint,
            http,
            frame_pool_size,
            subscription,
            metrics_port: parse_or(&lookup, "ALPACA_METRICS_PORT"),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),

    /// Credentials rejected.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// Stream URL unusable.
    #[error(transparent)]
    InvalidEndpoint(#[from] InvalidEndpoint),

    /// Unknown channel name.
    #[error(transparent)]
    UnknownChannel(#[from] UnknownChannel),

    /// `ALPACA_SYMBOLS` or `ALPACA_CHANNELS` named nothing.
    #[error("subscription needs at least one symbol and one channel")]
    EmptySubscription,
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("ALPACA_KEY", "k"), ("ALPACA_SECRET", "s")]))
                .unwrap();

        assert_eq!(config.environment, Environment::Paper);
        assert_eq!(config.feed, DataFeed::Sip);
        assert_eq!(config.stream_endpoint.path(), "/v2/sip");
        assert_eq!(config.http.trading_base_url, PAPER_TRADING_URL);
        assert_eq!(config.http.timeout, DEFAULT_HTTP_TIMEOUT);
        assert_eq!(config.frame_pool_size, DEFAULT_POOL_CAPACITY);
        assert_eq!(config.subscription.symbols(), ["SPY"]);
        assert_eq!(config.subscription.channels(), [Channel::Trades, Channel::Quotes]);
        assert_eq!(config.metrics_port, None);
    }

    #[test]
    fn missing_key_is_error() {
        let err = ClientConfig::from_lookup(lookup_from(&[("ALPACA_SECRET", "s")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "ALPACA_KEY"));
    }

    #[test]
    fn empty_secret_is_error() {
        let err = ClientConfig::from_lookup(lookup_from(&[("ALPACA_KEY", "k"), ("ALPACA_SECRET", "")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(ref k) if k == "ALPACA_SECRET"));
    }

    #[test]
    fn overrides_applied() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("ALPACA_KEY", "k"),
            ("ALPACA_SECRET", "s"),
            ("ALPACA_ENV", "LIVE"),
            ("ALPACA_FEED", "opra"),
            ("ALPACA_HTTP_TIMEOUT_SECS", "5"),
            ("ALPACA_FRAME_POOL_SIZE", "16"),
            ("ALPACA_SYMBOLS", "aapl, tsla,,"),
            ("ALPACA_CHANNELS", "trades,dailyBars"),
            ("ALPACA_METRICS_PORT", "9464"),
        ]))
        .unwrap();

        assert!(config.environment.is_live());
        assert_eq!(config.http.trading_base_url, LIVE_TRADING_URL);
        assert_eq!(config.stream_endpoint.path(), "/v1beta1/opra");
        assert_eq!(config.http.timeout, Duration::from_secs(5));
        assert_eq!(config.frame_pool_size, 16);
        assert_eq!(config.subscription.symbols(), ["AAPL", "TSLA"]);
        assert_eq!(config.subscription.channels(), [Channel::Trades, Channel::DailyBars]);
        assert_eq!(config.metrics_port, Some(9464));
    }

    #[test]
    fn blank_symbols_are_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            ("ALPACA_KEY", "k"),
            ("ALPACA_SECRET", "s"),
            ("ALPACA_SYMBOLS", " , "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptySubscription));
    }

    #[test]
    fn blank_channels_are_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            ("ALPACA_KEY", "k"),
            ("ALPACA_SECRET", "s"),
            ("ALPACA_CHANNELS", ""),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptySubscription));
    }

    #[test]
    fn stream_url_override() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("ALPACA_KEY", "k"),
            ("ALPACA_SECRET", "s"),
            ("ALPACA_STREAM_URL", "wss://stream.data.sandbox.alpaca.markets/v2/test"),
        ]))
        .unwrap();
        assert_eq!(config.stream_endpoint.host(), "stream.data.sandbox.alpaca.markets");
        assert_eq!(config.stream_endpoint.path(), "/v2/test");
    }

    #[test]
    fn bad_channel_is_error() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            ("ALPACA_KEY", "k"),
            ("ALPACA_SECRET", "s"),
            ("ALPACA_CHANNELS", "trades,orderbook"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownChannel(_)));
    }

    #[test]
    fn environment_parsing() {
        assert_eq!(Environment::from_str_case_insensitive("live"), Environment::Live);
        assert_eq!(Environment::from_str_case_insensitive("PAPER"), Environment::Paper);
        assert_eq!(Environment::from_str_case_insensitive("unknown"), Environment::Paper);
    }
}
