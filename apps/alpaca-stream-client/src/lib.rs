#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Alpaca Stream Client - Market Data Streaming Connection
//!
//! A client for Alpaca's real-time market data WebSocket protocol. One
//! connection walks connect → authenticate → subscribe → stream, answers
//! keepalive pings on its own, and hands the caller payload frames as raw
//! bytes.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Connection state machine, frame buffers, subscriptions
//!   - `streaming`: `ConnectionState`, `Frame`, `FramePool`
//!   - `subscription`: `Channel`, `DataFeed`, `SubscriptionRequest`
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: `Transport`/`Connector` traits, `Endpoint`
//!   - `services`: `StreamConnection`, two-phase shutdown
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `alpaca`: WebSocket transport, envelopes, payload decoder
//!   - `rest`: order submission and historical data
//!   - `config`, `telemetry`, `metrics`
//!
//! # Shutdown
//!
//! ```text
//!  control task                        reader task
//!  ────────────                        ───────────
//!  coordinator.close() ──cancel──────► read_message() returns None
//!        │                             reader dropped
//!        │                                  │
//!  coordinator.release(proof) ◄──connection─┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Connection lifecycle and subscription types.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::streaming::{
    ConnectionState, Frame, FrameBuffer, FrameKind, FramePool, IllegalTransition, LifecycleEvent,
    PoolExhausted,
};
pub use domain::subscription::{Channel, DataFeed, SubscriptionRequest, Symbol, WireFormat};

// Ports and services
pub use application::ports::{Connector, Endpoint, InvalidEndpoint, Transport, TransportError};
pub use application::services::{
    CloseHandle, CloseRequested, ShutdownCoordinator, ShutdownError, StreamConnection,
    StreamError, StreamReader,
};

// Alpaca adapters
pub use infrastructure::alpaca::{
    AuthError, CodecError, Credentials, MarketDataMessage, PayloadDecoder, SubscriptionMessage,
    WsConnector, WsTransport,
};

// Config
pub use infrastructure::config::{ClientConfig, ConfigError, Environment};

// REST
pub use infrastructure::rest::{HistoricalClient, OrdersClient, RawResponse, RestClient, RestError};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
