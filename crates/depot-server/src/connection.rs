//! Per-connection read loop: reassemble frames, dispatch queries, reply.
//!
//! Framing state lives in an explicit [`FrameReader`] threaded through the
//! loop. A query is dispatched only once its full frame has arrived, so
//! tearing a connection down mid-message can never leave a half-applied
//! store mutation behind. Store calls are synchronous and in-process; the
//! loop only suspends on the socket.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use depot_proto::{Codec, ErrorCode, FrameReader, Message, ProtocolError, Query, Reply};
use depot_store::{OrderedStore, SledStore, StoreResult};

use crate::error::ServerResult;

/// What to do with the connection after answering.
enum Disposition {
    /// Write the message, keep serving.
    Continue(Message),
    /// Write the message, then close. Connection-fatal, never
    /// process-fatal.
    Close(Message),
}

/// Serve one accepted connection to completion.
pub async fn handle(mut stream: TcpStream, store: Arc<SledStore>, idle: Option<Duration>) {
    tracing::info!("connection opened");
    match read_loop(&mut stream, store.as_ref(), idle).await {
        Ok(()) => tracing::info!("connection closed"),
        Err(e) => tracing::warn!(error = %e, "connection terminated"),
    }
}

async fn read_loop(
    stream: &mut TcpStream,
    store: &SledStore,
    idle: Option<Duration>,
) -> ServerResult<()> {
    let mut frames = FrameReader::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = stream.read(&mut chunk);
        let n = match idle {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::info!(timeout_secs = limit.as_secs(), "idle timeout, closing");
                    return Ok(());
                }
            },
            None => read.await?,
        };

        if n == 0 {
            // EOF. Discard any partial message; nothing was dispatched.
            frames.finish()?;
            return Ok(());
        }

        for payload in frames.push(&chunk[..n]) {
            match answer(store, &payload) {
                Disposition::Continue(msg) => send(stream, &msg).await?,
                Disposition::Close(msg) => {
                    tracing::warn!(reply = msg.type_name(), "closing after fatal reply");
                    send(stream, &msg).await?;
                    return Ok(());
                }
            }
        }
    }
}

/// Decode one frame payload and produce the reply for it.
fn answer(store: &SledStore, payload: &[u8]) -> Disposition {
    let message = match Codec::decode_payload(payload) {
        Ok(message) => message,
        Err(e) => {
            return Disposition::Close(Message::error(
                ErrorCode::InvalidRequest,
                format!("undecodable message: {e}"),
            ))
        }
    };

    let query = match message {
        Message::Query { query, .. } => query,
        other => {
            // A peer speaking a newer protocol revision, or echoing our
            // own replies back. Either way we cannot serve it.
            return Disposition::Close(Message::error(
                ErrorCode::UnrecognizedQuery,
                format!("expected a query, got {}", other.type_name()),
            ));
        }
    };

    tracing::debug!(kind = query.kind(), "dispatching query");

    let result: StoreResult<Reply> = match &query {
        Query::Get { key } => store.get(key).map(|found| match found {
            Some(value) => Reply::ValueReturned { value },
            None => Reply::KeyMissing,
        }),
        Query::Set { key, value } => store.put(key, value).map(|()| Reply::SetOk),
        Query::Delete { key } => store.delete(key).map(|()| Reply::DeleteOk),
        Query::RangeScan { start, end } => store
            .scan(start, end.as_deref())
            .collect::<StoreResult<Vec<_>>>()
            .map(|pairs| Reply::Entries { pairs }),
        Query::DeleteRange { start, end } => store
            .delete_range(start, end.as_deref())
            .map(|_| Reply::DeleteOk),
        Query::StartRangeIter { .. } => {
            return Disposition::Continue(Message::error(
                ErrorCode::NotImplemented,
                "START_RANGE_ITER is reserved and not implemented",
            ));
        }
    };

    match result {
        Ok(reply) => Disposition::Continue(Message::response(query, reply)),
        Err(e) => Disposition::Close(Message::error(
            ErrorCode::ServerFailure,
            format!("store failure serving {}: {e}", query.kind()),
        )),
    }
}

/// Frame and write one message. A reply too large for the u16 frame is
/// downgraded to an error envelope on the live connection; the caller's
/// range was simply too broad.
async fn send(stream: &mut TcpStream, msg: &Message) -> ServerResult<()> {
    let wire = match Codec::encode(msg) {
        Ok(wire) => wire,
        Err(ProtocolError::MessageTooLarge { size, max }) => {
            tracing::warn!(size, max, "reply exceeds frame capacity");
            Codec::encode(&Message::error(
                ErrorCode::ServerFailure,
                format!("reply of {size} bytes exceeds the {max}-byte frame capacity"),
            ))?
        }
        Err(other) => return Err(other.into()),
    };
    stream.write_all(&wire).await?;
    Ok(())
}
