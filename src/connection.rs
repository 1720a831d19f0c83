use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use crate::command::Command;
use crate::decoder::StreamDecoder;
use crate::frame::Frame;
use crate::limits::Limits;
use crate::Error;

/// Reads frames off a byte stream, typically the read half of a `TcpStream`.
pub struct Connection<R> {
    stream: R,
    // Data is read from the socket into the decoder buffer. When a frame is parsed, the
    // corresponding data is removed from the buffer.
    decoder: StreamDecoder,
}

impl<R: AsyncRead + Unpin> Connection<R> {
    pub fn new(stream: R) -> Connection<R> {
        Connection::with_limits(stream, Limits::default())
    }

    pub fn with_limits(stream: R, limits: Limits) -> Connection<R> {
        Connection {
            stream,
            decoder: StreamDecoder::with_limits(limits),
        }
    }

    /// Waits for the next complete frame.
    ///
    /// Returns `Ok(None)` when the peer closes the stream between frames. Closing in the middle
    /// of a frame, or sending a malformed one, is an error. Either way the decoder is reset.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        let mut chunk = [0u8; 4096];

        loop {
            match self.decoder.next_frame() {
                Ok(Some(frame)) => return Ok(Some(frame)),
                Ok(None) => {}
                Err(err) => {
                    warn!(%err, "closing stream on malformed frame");
                    self.decoder.reset();
                    return Err(err.into());
                }
            }

            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                let pending = self.decoder.buffered();
                self.decoder.reset();
                debug!(pending, "stream closed");

                if pending == 0 {
                    return Ok(None);
                }
                return Err("connection reset by peer".into());
            }

            self.decoder.push(&chunk[..n]);
        }
    }

    /// Waits for the next frame and projects it into a [`Command`].
    pub async fn read_command(&mut self) -> Result<Option<Command>, Error> {
        match self.read_frame().await? {
            Some(frame) => Ok(Some(Command::try_from(frame)?)),
            None => Ok(None),
        }
    }

    pub fn decoder(&self) -> &StreamDecoder {
        &self.decoder
    }
}
