use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use depot_proto::{Codec, FrameReader, Message, Query, Reply};

use crate::error::{ClientError, ClientResult};

/// A connection to the broker, strict request/reply.
pub struct DepotClient {
    stream: TcpStream,
    reader: FrameReader,
}

impl DepotClient {
    /// Connect to a broker.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            reader: FrameReader::new(),
        })
    }

    /// Read one key. `Ok(None)` when the key is absent.
    pub async fn get(&mut self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        let reply = self.round_trip(Query::Get { key: key.to_vec() }).await?;
        match reply {
            Reply::ValueReturned { value } => Ok(Some(value)),
            Reply::KeyMissing => Ok(None),
            other => Err(unexpected(&other)),
        }
    }

    /// Upsert one key.
    pub async fn set(&mut self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        let reply = self
            .round_trip(Query::Set {
                key: key.to_vec(),
                value: value.to_vec(),
            })
            .await?;
        match reply {
            Reply::SetOk => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Delete one key. Succeeds whether or not the key existed.
    pub async fn delete(&mut self, key: &[u8]) -> ClientResult<()> {
        let reply = self.round_trip(Query::Delete { key: key.to_vec() }).await?;
        match reply {
            Reply::DeleteOk => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// All pairs in `[start, end)`, or all pairs under the `start` prefix
    /// when `end` is `None`, ascending.
    pub async fn scan(
        &mut self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> ClientResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let reply = self
            .round_trip(Query::RangeScan {
                start: start.to_vec(),
                end: end.map(<[u8]>::to_vec),
            })
            .await?;
        match reply {
            Reply::Entries { pairs } => Ok(pairs),
            other => Err(unexpected(&other)),
        }
    }

    /// Delete everything a `scan` with the same bounds would return.
    pub async fn delete_range(&mut self, start: &[u8], end: Option<&[u8]>) -> ClientResult<()> {
        let reply = self
            .round_trip(Query::DeleteRange {
                start: start.to_vec(),
                end: end.map(<[u8]>::to_vec),
            })
            .await?;
        match reply {
            Reply::DeleteOk => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Send one query and read frames until its answer arrives.
    pub async fn round_trip(&mut self, query: Query) -> ClientResult<Reply> {
        tracing::debug!(kind = query.kind(), "sending query");
        let wire = Codec::encode(&Message::query(query))?;
        self.stream.write_all(&wire).await?;

        let mut chunk = [0u8; 4096];
        loop {
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            let mut frames = self.reader.push(&chunk[..n]).into_iter();
            let payload = match frames.next() {
                None => continue,
                Some(payload) => payload,
            };
            if frames.next().is_some() {
                // Strict request/reply: exactly one frame answers a query.
                return Err(ClientError::UnexpectedReply(
                    "broker sent more than one frame for a single query".into(),
                ));
            }
            return match Codec::decode_payload(&payload)? {
                Message::Response { reply, .. } => Ok(reply),
                Message::Error { code, message, .. } => {
                    Err(ClientError::Broker { code, message })
                }
                Message::Query { query, .. } => Err(ClientError::UnexpectedReply(format!(
                    "broker sent a {} query",
                    query.kind()
                ))),
            };
        }
    }
}

fn unexpected(reply: &Reply) -> ClientError {
    ClientError::UnexpectedReply(format!("{reply:?}"))
}
