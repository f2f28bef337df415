//! Async client for the transit depot broker.
//!
//! One [`DepotClient`] wraps one TCP connection and speaks strict
//! request/reply: each call sends a single framed query and reads frames
//! until the broker's answer arrives. The out-of-scope HTTP query service
//! and the integration tests both talk to the broker through this crate.

pub mod client;
pub mod error;

pub use client::DepotClient;
pub use error::{ClientError, ClientResult};
