//! Stream Metrics
//!
//! Counters for frame traffic and lifecycle outcomes, recorded through the
//! `metrics` facade. Nothing is exported unless a recorder is installed;
//! the binary installs the Prometheus exporter when a port is configured.
//!
//! # Metrics
//!
//! - `alpaca_stream_frames_total{kind}`: frames read, by frame kind
//! - `alpaca_stream_pongs_sent_total`: automatic keepalive replies
//! - `alpaca_stream_auth_total{result}`: auth exchanges by outcome
//! - `alpaca_stream_subscribe_total{result}`: subscribe exchanges by outcome
//! - `alpaca_stream_closes_total{reason}`: transitions to disconnected

use std::net::SocketAddr;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::domain::streaming::FrameKind;

// =============================================================================
// Exporter
// =============================================================================

/// Install the Prometheus exporter, serving `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error if a recorder is already installed or the listener
/// cannot be bound.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();
    tracing::info!(addr = %addr, "Prometheus exporter listening");
    Ok(())
}

fn register_metrics() {
    describe_counter!("alpaca_stream_frames_total", "Frames read from the transport by kind");
    describe_counter!(
        "alpaca_stream_pongs_sent_total",
        "Pong replies sent in answer to server pings"
    );
    describe_counter!("alpaca_stream_auth_total", "Authentication exchanges by result");
    describe_counter!("alpaca_stream_subscribe_total", "Subscribe exchanges by result");
    describe_counter!("alpaca_stream_closes_total", "Connection closes by reason");
}

// =============================================================================
// Recording
// =============================================================================

/// Outcome label for request/confirm exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeResult {
    /// Server confirmed.
    Confirmed,
    /// Server rejected or answered with something else.
    Rejected,
    /// Stream ended before an answer.
    Closed,
}

impl ExchangeResult {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Closed => "closed",
        }
    }
}

/// Why a connection went back to disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Local `close()`.
    Local,
    /// Close handle cancelled a read.
    Cancelled,
    /// Server close frame, end of stream, or reset.
    Remote,
}

impl CloseReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cancelled => "cancelled",
            Self::Remote => "remote",
        }
    }
}

/// Record one frame read from the transport.
pub fn record_frame(kind: FrameKind) {
    counter!("alpaca_stream_frames_total", "kind" => kind.as_str()).increment(1);
}

/// Record an automatic pong.
pub fn record_pong_sent() {
    counter!("alpaca_stream_pongs_sent_total").increment(1);
}

/// Record the outcome of an auth exchange.
pub fn record_auth(result: ExchangeResult) {
    counter!("alpaca_stream_auth_total", "result" => result.as_str()).increment(1);
}

/// Record the outcome of a subscribe exchange.
pub fn record_subscribe(result: ExchangeResult) {
    counter!("alpaca_stream_subscribe_total", "result" => result.as_str()).increment(1);
}

/// Record a transition to disconnected.
pub fn record_close(reason: CloseReason) {
    counter!("alpaca_stream_closes_total", "reason" => reason.as_str()).increment(1);
}
