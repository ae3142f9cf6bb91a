//! Streaming Connection Domain Types
//!
//! The lifecycle state machine and the transport frame model. Both are
//! free of I/O: the connection service drives them, adapters feed them.

mod frame;
mod state;

pub use frame::{DEFAULT_POOL_CAPACITY, Frame, FrameBuffer, FrameKind, FramePool, PoolExhausted};
pub use state::{ConnectionState, IllegalTransition, LifecycleEvent};
