//! Length-prefixed frames between coordinator and workers
//!
//! Each frame is a 4-byte big-endian length followed by a UTF-8 payload of
//! at most `capacity` bytes. Payloads that do not fit are rejected on both
//! the sending and the receiving side.

use bytes::{Bytes, BytesMut};
use reviewstream_core::{Error, Result};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Default maximum payload size in bytes
pub const DEFAULT_FRAME_CAPACITY: usize = 4096;

/// Payload that tells a worker to exit
pub const SHUTDOWN_SENTINEL: &str = "shutdown";

const LENGTH_FIELD_LEN: usize = 4;

/// One unit of transport: a review, a result, or the sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: String,
}

impl Frame {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The "no result" reply
    pub fn empty() -> Self {
        Self::new(String::new())
    }

    pub fn shutdown() -> Self {
        Self::new(SHUTDOWN_SENTINEL)
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_payload(self) -> String {
        self.payload
    }

    /// Payload with surrounding whitespace and NUL padding removed
    pub fn trimmed(&self) -> &str {
        self.payload
            .trim_matches(|c: char| c.is_whitespace() || c == '\0')
    }

    pub fn is_shutdown(&self) -> bool {
        self.trimmed() == SHUTDOWN_SENTINEL
    }

    pub fn is_empty(&self) -> bool {
        self.trimmed().is_empty()
    }
}

/// Whether `payload` can travel in a frame of `capacity` bytes
pub fn fits_capacity(payload: &str, capacity: usize) -> bool {
    payload.len() <= capacity
}

/// Codec for [`Frame`]s with a hard payload limit
#[derive(Debug)]
pub struct FrameCodec {
    inner: LengthDelimitedCodec,
    capacity: usize,
}

impl FrameCodec {
    pub fn new(capacity: usize) -> Self {
        let inner = LengthDelimitedCodec::builder()
            .length_field_length(LENGTH_FIELD_LEN)
            .max_frame_length(capacity)
            .new_codec();
        Self { inner, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_CAPACITY)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.len() >= LENGTH_FIELD_LEN {
            let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
            if len > self.capacity {
                return Err(Error::FrameTooLarge {
                    len,
                    capacity: self.capacity,
                });
            }
        }

        match self.inner.decode(src)? {
            Some(bytes) => {
                let payload = String::from_utf8(bytes.to_vec())
                    .map_err(|e| Error::protocol(format!("Frame is not valid UTF-8: {e}")))?;
                Ok(Some(Frame { payload }))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        let len = frame.payload.len();
        if !fits_capacity(&frame.payload, self.capacity) {
            return Err(Error::FrameTooLarge {
                len,
                capacity: self.capacity,
            });
        }
        self.inner.encode(Bytes::from(frame.payload), dst)?;
        Ok(())
    }
}
