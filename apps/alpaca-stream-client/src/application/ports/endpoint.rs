//! Stream Endpoint
//!
//! Parses a stream URL into the pieces the handshake needs.
//!
//! Stream URLs have the shape `<scheme>://<host>/<version>/<feed>`, e.g.
//! `wss://stream.data.alpaca.markets/v2/sip`.

use std::fmt;

use url::Url;

use crate::domain::subscription::DataFeed;

/// Port used when the URL does not name one.
pub const DEFAULT_PORT: u16 = 443;

/// URL could not be used as a stream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid endpoint {url}: {reason}")]
pub struct InvalidEndpoint {
    /// Offending URL.
    pub url: String,
    /// What was wrong with it.
    pub reason: String,
}

/// A parsed stream endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    host: String,
    path: String,
    port: u16,
}

impl Endpoint {
    /// Parse a stream URL.
    ///
    /// The path defaults to `/` and the port to [`DEFAULT_PORT`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidEndpoint`] if the URL does not parse or has no host.
    pub fn parse(raw: &str) -> Result<Self, InvalidEndpoint> {
        let invalid = |reason: String| InvalidEndpoint {
            url: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();

        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        let port = url.port().unwrap_or(DEFAULT_PORT);

        Ok(Self {
            url,
            host,
            path,
            port,
        })
    }

    /// Build `<base>/<version>/<feed>` for a market-data feed.
    ///
    /// `base` is scheme and host, e.g. `wss://stream.data.alpaca.markets`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidEndpoint`] if the resulting URL is invalid.
    pub fn for_feed(base: &str, feed: DataFeed) -> Result<Self, InvalidEndpoint> {
        let base = base.trim_end_matches('/');
        Self::parse(&format!("{base}/{}/{}", feed.version(), feed.as_str()))
    }

    /// URL scheme (`wss` or `ws`).
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Request path, never empty.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Port, defaulted to 443.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Full URL for the handshake request, with the resolved port spelled out.
    #[must_use]
    pub fn handshake_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme(),
            self.host,
            self.port,
            self.path
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
