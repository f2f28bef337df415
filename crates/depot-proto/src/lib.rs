//! Wire protocol for the transit depot broker.
//!
//! Defines the framing, message types, and serialization format spoken
//! between the broker and its clients. Every message, in both directions,
//! is a 2-byte big-endian length followed by exactly that many bytes of
//! bincode-encoded payload.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::Codec;
pub use error::{ProtocolError, ProtocolResult};
pub use frame::FrameReader;
pub use message::{
    now_timestamp, ErrorCode, Message, Query, Reply, DEFAULT_PORT, MAX_FRAME_SIZE,
};
