//! Alpaca Market Data Stream Adapters
//!
//! - **transport**: WebSocket [`Connector`](crate::application::ports::Connector)
//!   over tokio-tungstenite
//! - **messages** / **codec**: control envelopes in JSON (stocks) or
//!   `MessagePack` (options)
//! - **auth**: credentials and auth failure reasons
//! - **payload**: stateless trade/quote/bar decoder for payload frames

pub mod auth;
pub mod codec;
pub mod messages;
pub mod payload;
pub mod transport;

pub use auth::{AuthError, Credentials, CredentialsError};
pub use codec::{CodecError, EnvelopeCodec};
pub use messages::{
    AuthRequest, ControlMessage, ErrorMessage, SubscribeEnvelope, SubscriptionMessage,
    SuccessKind, SuccessMessage,
};
pub use payload::{MarketDataMessage, PayloadDecoder};
pub use transport::{WsConnector, WsTransport};
