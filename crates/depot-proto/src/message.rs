use serde::{Deserialize, Serialize};

/// Default broker port, localhost-only.
pub const DEFAULT_PORT: u16 = 8888;

/// Hard ceiling on a frame payload: the length prefix is a u16.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Unix timestamp stamped onto every message.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A query against the ordered store, sent client to broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// Read one key.
    Get { key: Vec<u8> },
    /// Upsert one key.
    Set { key: Vec<u8>, value: Vec<u8> },
    /// Remove one key. Succeeds whether or not the key exists.
    Delete { key: Vec<u8> },
    /// Return all pairs in `[start, end)`; with `end` omitted, all pairs
    /// whose key starts with `start`, ascending.
    RangeScan { start: Vec<u8>, end: Option<Vec<u8>> },
    /// Delete everything a `RangeScan` with the same bounds would return.
    DeleteRange { start: Vec<u8>, end: Option<Vec<u8>> },
    /// Reserved for a streaming iterator mode. The broker answers with an
    /// explicit not-implemented error; it is never routed to the store.
    StartRangeIter { start: Vec<u8>, end: Option<Vec<u8>> },
}

/// What a successful response carries, broker to client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// `Get` found the key.
    ValueReturned { value: Vec<u8> },
    /// `Get` on an absent key. A normal outcome, not a transport error.
    KeyMissing,
    SetOk,
    /// Covers both `Delete` and `DeleteRange`.
    DeleteOk,
    /// `RangeScan` result, buffered whole.
    Entries { pairs: Vec<(Vec<u8>, Vec<u8>)> },
}

/// Structured error codes carried on error envelopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The payload could not be decoded as a query.
    InvalidRequest,
    /// The store failed serving an otherwise valid query.
    ServerFailure,
    /// Top-level message kind the broker does not recognize (protocol
    /// version mismatch between client and server).
    UnrecognizedQuery,
    /// Reserved query kind that is declared but not functional.
    NotImplemented,
}

/// Top-level tagged union on the wire. Both directions carry a timestamp;
/// responses echo the query they answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Query {
        timestamp: i64,
        query: Query,
    },
    Response {
        timestamp: i64,
        query: Query,
        reply: Reply,
    },
    Error {
        timestamp: i64,
        code: ErrorCode,
        message: String,
    },
}

impl Message {
    /// Wrap a query with the current timestamp.
    pub fn query(query: Query) -> Self {
        Self::Query {
            timestamp: now_timestamp(),
            query,
        }
    }

    /// Build a response echoing `query`, stamped with the current time.
    pub fn response(query: Query, reply: Reply) -> Self {
        Self::Response {
            timestamp: now_timestamp(),
            query,
            reply,
        }
    }

    /// Build an error envelope, stamped with the current time.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            timestamp: now_timestamp(),
            code,
            message: message.into(),
        }
    }

    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Query { .. } => 1,
            Self::Response { .. } => 2,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Query { .. } => "Query",
            Self::Response { .. } => "Response",
            Self::Error { .. } => "Error",
        }
    }
}

impl Query {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Get { .. } => "GET",
            Self::Set { .. } => "SET",
            Self::Delete { .. } => "DELETE",
            Self::RangeScan { .. } => "RANGE_SCAN",
            Self::DeleteRange { .. } => "DELETE_RANGE",
            Self::StartRangeIter { .. } => "START_RANGE_ITER",
        }
    }
}
