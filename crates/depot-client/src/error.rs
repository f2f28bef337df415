use depot_proto::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The broker answered with a structured error envelope.
    #[error("broker error ({code:?}): {message}")]
    Broker { code: ErrorCode, message: String },

    /// The broker closed the connection before answering.
    #[error("connection closed before a reply arrived")]
    ConnectionClosed,

    /// The broker sent something other than an answer to our query.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] depot_proto::ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
