//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the application ports, plus the REST glue
//! and the ambient logging/metrics/config stack.

/// Alpaca market data stream adapters (WebSocket transport, envelopes).
pub mod alpaca;

/// Configuration from environment variables.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Order and historical data REST clients.
pub mod rest;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;
