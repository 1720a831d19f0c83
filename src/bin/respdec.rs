use std::path::PathBuf;

use clap::Parser;
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, instrument};

use respdec::codec::FrameCodec;
use respdec::limits::{
    DEFAULT_MAX_ARRAY_LEN, DEFAULT_MAX_BUFFER_LEN, DEFAULT_MAX_BULK_LEN, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_INLINE_LEN, DEFAULT_MAX_LINE_LEN,
};
use respdec::{Command, Error, Limits};

/// Decodes a captured RESP byte stream and prints one line per frame.
#[derive(Parser, Debug)]
struct Args {
    /// File holding the raw bytes, stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Print the command each frame carries instead of the frame
    #[arg(short, long)]
    commands: bool,

    /// Read buffer capacity in bytes
    #[arg(long, default_value_t = 4096)]
    chunk_size: usize,

    /// Maximum bytes buffered while waiting for a frame to complete
    #[arg(long, env = "MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_BUFFER_LEN)]
    max_frame_size: usize,

    /// Maximum declared bulk string length
    #[arg(long, env = "RESPDEC_MAX_BULK_LEN", default_value_t = DEFAULT_MAX_BULK_LEN)]
    max_bulk_len: usize,

    /// Maximum declared array length
    #[arg(long, env = "RESPDEC_MAX_ARRAY_LEN", default_value_t = DEFAULT_MAX_ARRAY_LEN)]
    max_array_len: usize,

    /// Maximum array nesting, values above 1024 are clamped
    #[arg(long, env = "RESPDEC_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Maximum length of an inline command line
    #[arg(long, env = "RESPDEC_MAX_INLINE_LEN", default_value_t = DEFAULT_MAX_INLINE_LEN)]
    max_inline_len: usize,

    /// Maximum length of a simple string, error, integer or length header line
    #[arg(long, env = "RESPDEC_MAX_LINE_LEN", default_value_t = DEFAULT_MAX_LINE_LEN)]
    max_line_len: usize,
}

impl Args {
    fn limits(&self) -> Limits {
        Limits::new()
            .max_buffer_len(self.max_frame_size)
            .max_bulk_len(self.max_bulk_len)
            .max_array_len(self.max_array_len)
            .max_depth(self.max_depth)
            .max_inline_len(self.max_inline_len)
            .max_line_len(self.max_line_len)
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let args = Args::parse();

    match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            decode(file, &args).await
        }
        None => decode(tokio::io::stdin(), &args).await,
    }
}

#[instrument(name = "decode", skip(reader, args), fields(input = ?args.input))]
async fn decode<R: AsyncRead + Unpin>(reader: R, args: &Args) -> Result<(), Error> {
    let codec = FrameCodec::new(args.limits());
    let mut frames = FramedRead::with_capacity(reader, codec, args.chunk_size);
    let mut count = 0usize;

    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                error!(frames = count, "{}", e);
                return Err(e);
            }
        };
        count += 1;

        if args.commands {
            match Command::try_from(&frame) {
                Ok(cmd) => println!("{}", cmd),
                Err(e) => println!("invalid command: {}", e),
            }
        } else {
            println!("{}", frame);
        }
    }

    info!(frames = count, "end of input");
    Ok(())
}
