use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::decoder;
use crate::frame::Frame;
use crate::limits::Limits;
use crate::Error;

/// Adapts the stream decoder to `tokio_util` framing, so a `FramedRead` can yield frames straight
/// from an `AsyncRead`. The framed reader owns the buffer, this codec only holds the limits.
#[derive(Debug, Default, Clone)]
pub struct FrameCodec {
    limits: Limits,
}

impl FrameCodec {
    pub fn new(limits: Limits) -> FrameCodec {
        FrameCodec { limits }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decoder::decode_frame(src, &self.limits)?)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(format!(
                "connection reset by peer; {} bytes of an unfinished frame",
                buf.len()
            )
            .into()),
        }
    }
}
