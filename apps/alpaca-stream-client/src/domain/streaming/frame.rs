//! Transport Frames and Frame Buffer Leasing
//!
//! A [`Frame`] is one unit delivered by the framed transport. Its bytes
//! live in a [`FrameBuffer`] leased from the transport's [`FramePool`].
//! The lease is returned when the buffer is dropped, so every code path
//! that lets a frame go out of scope releases it exactly once. A pool with
//! no free leases refuses to hand out more instead of reusing a live one.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

/// Buffers above this capacity are freed instead of returned to the pool.
const MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

/// Default number of frames that may be leased at once.
pub const DEFAULT_POOL_CAPACITY: usize = 8;

// =============================================================================
// Frame Kind
// =============================================================================

/// Classification of a transport frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Application data (text or binary).
    Payload,
    /// Keepalive request; must be answered with a pong.
    Ping,
    /// Keepalive acknowledgment.
    Pong,
    /// Peer is closing the connection.
    Close,
    /// Any other control frame.
    Other,
}

impl FrameKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payload => "payload",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Close => "close",
            Self::Other => "other",
        }
    }
}

// =============================================================================
// Frame Pool
// =============================================================================

/// Every lease slot is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("frame pool exhausted: all {capacity} buffers are leased")]
pub struct PoolExhausted {
    /// Pool capacity.
    pub capacity: usize,
}

#[derive(Debug, Default)]
struct PoolState {
    free: Vec<Vec<u8>>,
    leased: usize,
}

#[derive(Debug)]
struct PoolInner {
    capacity: usize,
    state: Mutex<PoolState>,
}

/// Bounded pool of reusable frame buffers owned by one transport.
#[derive(Debug, Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

impl Default for FramePool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl FramePool {
    /// Create a pool allowing `capacity` simultaneous leases (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                capacity: capacity.max(1),
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    /// Lease a buffer and fill it with `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolExhausted`] if every buffer is currently leased.
    pub fn lease(&self, bytes: &[u8]) -> Result<FrameBuffer, PoolExhausted> {
        let mut buf = {
            let mut state = self.inner.state.lock();
            if state.leased >= self.inner.capacity {
                return Err(PoolExhausted {
                    capacity: self.inner.capacity,
                });
            }
            state.leased += 1;
            state.free.pop().unwrap_or_default()
        };

        buf.extend_from_slice(bytes);

        Ok(FrameBuffer {
            buf,
            pool: Arc::clone(&self.inner),
        })
    }

    /// Number of buffers currently leased.
    #[must_use]
    pub fn leased(&self) -> usize {
        self.inner.state.lock().leased
    }

    /// Maximum simultaneous leases.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

// =============================================================================
// Frame Buffer
// =============================================================================

/// Bytes of one frame, on lease from a [`FramePool`].
///
/// Dropping the buffer returns it to the pool. Data that must outlive the
/// frame has to be copied out first (see [`Frame::to_owned_payload`]).
pub struct FrameBuffer {
    buf: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl Deref for FrameBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("len", &self.buf.len())
            .finish_non_exhaustive()
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        let mut state = self.pool.state.lock();
        state.leased = state.leased.saturating_sub(1);

        if buf.capacity() <= MAX_RETAINED_CAPACITY && state.free.len() < self.pool.capacity {
            buf.clear();
            state.free.push(buf);
        }
    }
}

// =============================================================================
// Frame
// =============================================================================

/// One transport frame: a kind tag plus its leased bytes.
#[derive(Debug)]
pub struct Frame {
    kind: FrameKind,
    buffer: FrameBuffer,
}

impl Frame {
    /// Wrap a leased buffer.
    #[must_use]
    pub const fn new(kind: FrameKind, buffer: FrameBuffer) -> Self {
        Self { kind, buffer }
    }

    /// Frame classification.
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Borrow the frame bytes. Valid only while the frame is alive.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buffer
    }

    /// Copy the bytes into a caller-owned buffer.
    #[must_use]
    pub fn to_owned_payload(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}
