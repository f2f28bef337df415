use bytes::{Buf, BytesMut};

use crate::error::{ProtocolError, ProtocolResult};

/// Where the reader is within the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameState {
    /// Waiting for the 2-byte big-endian length prefix.
    AwaitingLength,
    /// Length known; accumulating until `declared` payload bytes arrive.
    AccumulatingBody { declared: usize },
}

/// Per-connection frame reassembly state.
///
/// A connection may deliver a frame across an arbitrary number of partial
/// reads, down to one byte at a time. The reader buffers chunks until the
/// declared length is satisfied, emits exactly that payload, and returns to
/// waiting for the next length prefix. One `push` can therefore yield zero,
/// one, or several complete payloads.
///
/// The reader itself never fails on short input; only [`finish`] (called at
/// connection teardown) reports a frame cut off mid-stream.
///
/// [`finish`]: FrameReader::finish
#[derive(Debug)]
pub struct FrameReader {
    buf: BytesMut,
    state: FrameState,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            state: FrameState::AwaitingLength,
        }
    }

    /// Feed one chunk of received bytes; returns every payload completed
    /// by it, in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut complete = Vec::new();

        loop {
            match self.state {
                FrameState::AwaitingLength => {
                    if self.buf.len() < 2 {
                        break;
                    }
                    let declared = u16::from_be_bytes([self.buf[0], self.buf[1]]) as usize;
                    self.buf.advance(2);
                    self.state = FrameState::AccumulatingBody { declared };
                }
                FrameState::AccumulatingBody { declared } => {
                    if self.buf.len() < declared {
                        break;
                    }
                    complete.push(self.buf.split_to(declared).to_vec());
                    self.state = FrameState::AwaitingLength;
                }
            }
        }

        complete
    }

    /// Close out the stream. An EOF that leaves a partial length prefix or
    /// a partial body behind is a protocol error; a clean boundary is not.
    pub fn finish(&self) -> ProtocolResult<()> {
        match self.state {
            FrameState::AwaitingLength if self.buf.is_empty() => Ok(()),
            FrameState::AwaitingLength => Err(ProtocolError::Framing(format!(
                "connection ended with {} byte(s) of an unfinished length prefix",
                self.buf.len()
            ))),
            FrameState::AccumulatingBody { declared } => Err(ProtocolError::Framing(format!(
                "connection ended mid-message: have {} of {} declared bytes",
                self.buf.len(),
                declared
            ))),
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u16).to_be_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn whole_frame_in_one_chunk() {
        let mut reader = FrameReader::new();
        let got = reader.push(&frame(b"hello"));
        assert_eq!(got, vec![b"hello".to_vec()]);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn one_byte_at_a_time_decodes_identically() {
        let wire = frame(b"partial sender");
        let mut reader = FrameReader::new();
        let mut got = Vec::new();
        for byte in &wire {
            got.extend(reader.push(std::slice::from_ref(byte)));
        }
        assert_eq!(got, vec![b"partial sender".to_vec()]);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let mut wire = frame(b"first");
        wire.extend_from_slice(&frame(b"second"));
        let mut reader = FrameReader::new();
        let got = reader.push(&wire);
        assert_eq!(got, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn length_prefix_split_across_chunks() {
        let wire = frame(b"split");
        let mut reader = FrameReader::new();
        assert!(reader.push(&wire[..1]).is_empty());
        let got = reader.push(&wire[1..]);
        assert_eq!(got, vec![b"split".to_vec()]);
    }

    #[test]
    fn empty_frame_yields_empty_payload() {
        // A declared length of zero completes immediately; rejecting the
        // empty payload is the decoder's job, not the reassembler's.
        let mut reader = FrameReader::new();
        let got = reader.push(&frame(b""));
        assert_eq!(got, vec![Vec::<u8>::new()]);
    }

    #[test]
    fn eof_mid_prefix_is_a_protocol_error() {
        let mut reader = FrameReader::new();
        reader.push(&[0x00]);
        assert!(reader.finish().is_err());
    }

    #[test]
    fn eof_mid_body_is_a_protocol_error() {
        let wire = frame(b"truncated");
        let mut reader = FrameReader::new();
        reader.push(&wire[..wire.len() - 3]);
        let err = reader.finish().unwrap_err();
        assert!(matches!(err, ProtocolError::Framing(_)));
    }

    #[test]
    fn clean_eof_between_frames_is_fine() {
        let mut reader = FrameReader::new();
        reader.push(&frame(b"complete"));
        assert!(reader.finish().is_ok());
    }

    proptest! {
        // Any chunking of the byte stream, including pathological 1-byte
        // reads, reassembles to the same payload sequence.
        #[test]
        fn reassembly_is_chunking_invariant(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 1..5),
            chunk_sizes in prop::collection::vec(1usize..17, 1..200),
        ) {
            let mut wire = Vec::new();
            for p in &payloads {
                wire.extend_from_slice(&frame(p));
            }

            let mut reader = FrameReader::new();
            let mut got = Vec::new();
            let mut offset = 0;
            let mut sizes = chunk_sizes.iter().cycle();
            while offset < wire.len() {
                let take = (*sizes.next().unwrap()).min(wire.len() - offset);
                got.extend(reader.push(&wire[offset..offset + take]));
                offset += take;
            }

            prop_assert_eq!(got, payloads);
            prop_assert!(reader.finish().is_ok());
        }
    }
}
