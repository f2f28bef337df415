//! TCP broker for the transit depot.
//!
//! Exactly one process may hold the embedded store handle, so every other
//! process reaches the store through this broker: a length-framed binary
//! protocol over TCP, one task per connection, all connections sharing the
//! single store handle. Connection faults are isolated per connection and
//! never take the broker down.

pub mod config;
pub mod connection;
pub mod error;
pub mod server;

pub use config::DepotConfig;
pub use error::{ServerError, ServerResult};
pub use server::Broker;
