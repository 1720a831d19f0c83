use std::io::Cursor;

use bytes::{Buf, BytesMut};
use thiserror::Error as ThisError;
use tracing::{debug, trace};

use crate::frame::{DataType, Error, Frame};
use crate::inline;
use crate::limits::Limits;

/// Incremental decoder for one byte stream.
///
/// Bytes are copied into an owned buffer as they arrive and complete frames are removed from
/// its front. Nothing is consumed until a whole frame is buffered, so a stream can be split at
/// any byte and still decode to the same frames. A decoder keeps per-stream state and should
/// not be shared between connections.
#[derive(Debug)]
pub struct StreamDecoder {
    // Data fed in by the caller. When a frame is parsed, the corresponding data is removed from
    // the buffer.
    buffer: BytesMut,
    limits: Limits,
}

/// A failed [`StreamDecoder::feed`]. `frames` holds whatever completed ahead of the bad bytes
/// in the same call.
#[derive(Debug, ThisError, PartialEq)]
#[error("{error}")]
pub struct FeedError {
    pub frames: Vec<Frame>,
    #[source]
    pub error: Error,
}

impl StreamDecoder {
    pub fn new() -> StreamDecoder {
        StreamDecoder::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> StreamDecoder {
        StreamDecoder {
            // Allocate the buffer with 4kb of capacity.
            buffer: BytesMut::with_capacity(4096),
            limits,
        }
    }

    /// Appends `chunk` and returns every frame that is now complete, in arrival order.
    ///
    /// A malformed frame fails the whole stream. The error carries the frames decoded before it
    /// in the same call, and the bad bytes stay buffered until [`StreamDecoder::reset`].
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, FeedError> {
        self.push(chunk);

        let mut frames = Vec::new();
        loop {
            match self.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => return Ok(frames),
                Err(error) => return Err(FeedError { frames, error }),
            }
        }
    }

    /// Appends `chunk` without decoding anything, for callers that pull frames one at a time
    /// with [`StreamDecoder::next_frame`].
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Decodes a single frame from the bytes already buffered.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        decode_frame(&mut self.buffer, &self.limits)
    }

    /// Drops everything buffered, e.g. when the connection closes.
    pub fn reset(&mut self) {
        if !self.buffer.is_empty() {
            debug!(discarded = self.buffer.len(), "decoder reset");
        }
        self.buffer.clear();
    }

    /// Number of bytes waiting for the rest of their frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes one complete frame from the front of `src`.
///
/// Returns `Ok(None)` when `src` only holds part of a frame; `src` is left untouched in that
/// case. Blank inline lines are dropped and decoding carries on with the bytes behind them.
pub(crate) fn decode_frame(src: &mut BytesMut, limits: &Limits) -> Result<Option<Frame>, Error> {
    loop {
        let Some(&first_byte) = src.first() else {
            return Ok(None);
        };

        let mut cursor = Cursor::new(&src[..]);
        let parsed = if DataType::try_from(first_byte).is_ok() {
            parse_typed(&mut cursor, limits).map(Some)
        } else {
            inline::parse_line(&mut cursor, limits)
        };

        match parsed {
            Ok(frame) => {
                let position = cursor.position() as usize;

                // Remove the parsed frame from the buffer.
                src.advance(position);

                match frame {
                    Some(frame) => {
                        trace!(consumed = position, %frame, "decoded frame");
                        return Ok(Some(frame));
                    }
                    None => debug!(consumed = position, "skipped blank inline line"),
                }
            }
            // Not enough data to parse a frame.
            Err(Error::Incomplete) => {
                if src.len() > limits.max_buffer_len {
                    return Err(Error::BufferFull {
                        len: src.len(),
                        max: limits.max_buffer_len,
                    });
                }
                return Ok(None);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Runs the allocation free check first, so an incomplete frame costs a scan and never a copy.
fn parse_typed(cursor: &mut Cursor<&[u8]>, limits: &Limits) -> Result<Frame, Error> {
    Frame::check(cursor, limits)?;
    let end = cursor.position();

    cursor.set_position(0);
    let frame = Frame::parse(cursor, limits)?;
    debug_assert_eq!(cursor.position(), end);

    Ok(frame)
}
