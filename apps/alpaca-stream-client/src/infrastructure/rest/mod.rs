//! Alpaca REST Glue
//!
//! Single-shot request/response clients. Each call issues exactly one HTTP
//! request and hands back the raw status and body; callers parse the bytes
//! themselves. Nothing here retries.
//!
//! - [`OrdersClient`]: `POST /v2/orders`
//! - [`HistoricalClient`]: stock and option bars/trades/quotes
//!
//! Non-2xx responses are returned as [`RawResponse`]s, not errors. Only
//! failures to get a response at all are [`RestError`]s.

mod historical;
mod orders;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

pub use historical::{
    Adjustment, BarsParams, HistoricalClient, OptionBarsParams, OptionTradesParams, Sort,
    TicksParams, TimeFrame, Window,
};
pub use orders::{OrderLeg, OrderRequest, OrderSide, OrderType, OrdersClient, TimeInForce};

use crate::infrastructure::alpaca::auth::Credentials;
use crate::infrastructure::config::HttpSettings;

/// REST transport errors.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// Request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Status and body of one response, unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Opaque pagination token for the next page, if the body carries one.
    ///
    /// Feed it back as `page_token` on the next request.
    #[must_use]
    pub fn next_page_token(&self) -> Option<String> {
        serde_json::from_slice::<Value>(&self.body)
            .ok()?
            .get("next_page_token")?
            .as_str()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

/// Shared HTTP plumbing: auth headers and one-shot send.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    api_key: String,
    api_secret: String,
}

impl RestClient {
    /// Build a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Build`] if the TLS backend cannot initialize.
    pub fn new(credentials: &Credentials, settings: &HttpSettings) -> Result<Self, RestError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(RestError::Build)?;

        Ok(Self {
            client,
            api_key: credentials.key().to_string(),
            api_secret: credentials.secret().to_string(),
        })
    }

    /// `GET {url}?{query}`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Network`] if no response was received.
    pub async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<RawResponse, RestError> {
        tracing::debug!(url = %url, params = query.len(), "GET");
        let request = self
            .client
            .get(url)
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
            .query(query);
        Self::send(request).await
    }

    /// `POST {url}` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Network`] if no response was received.
    pub async fn post_json<B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<RawResponse, RestError> {
        tracing::debug!(url = %url, "POST");
        let request = self
            .client
            .post(url)
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
            .json(body);
        Self::send(request).await
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<RawResponse, RestError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        if !(200..300).contains(&status) {
            tracing::warn!(status, body = %String::from_utf8_lossy(&body), "Non-success response");
        }

        Ok(RawResponse { status, body })
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_page_token_present() {
        let response = RawResponse {
            status: 200,
            body: br#"{"bars":{},"next_page_token":"QUFQTHxN"}"#.to_vec(),
        };
        assert_eq!(response.next_page_token().as_deref(), Some("QUFQTHxN"));
    }

    #[test]
    fn next_page_token_null_or_missing() {
        let null = RawResponse {
            status: 200,
            body: br#"{"bars":{},"next_page_token":null}"#.to_vec(),
        };
        assert_eq!(null.next_page_token(), None);

        let garbage = RawResponse {
            status: 500,
            body: b"oops".to_vec(),
        };
        assert_eq!(garbage.next_page_token(), None);
        assert!(!garbage.is_success());
        assert_eq!(garbage.text(), "oops");
    }

    #[test]
    fn join_url_trims_slash() {
        assert_eq!(join_url("https://x.test/", "/v2/orders"), "https://x.test/v2/orders");
        assert_eq!(join_url("https://x.test", "/v2/orders"), "https://x.test/v2/orders");
    }
}
