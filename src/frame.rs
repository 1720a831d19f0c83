// https://redis.io/docs/reference/protocol-spec

use std::fmt;
use std::io::Cursor;
use std::str::{self, Utf8Error};

use bytes::{Buf, Bytes};
use thiserror::Error as ThisError;

use crate::limits::{Limits, MAX_DEPTH_CEILING};

pub(crate) static CRLF: &[u8; 2] = b"\r\n";

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("protocol error; invalid frame data type {0:#04x}")]
    InvalidDataType(u8),
    #[error("protocol error; invalid integer {0:?}")]
    InvalidInteger(String),
    #[error("protocol error; invalid length {0}")]
    InvalidLength(i64),
    #[error("protocol error; bulk string is not terminated by CRLF")]
    MissingTerminator,
    #[error("protocol error; invalid UTF-8 string")]
    InvalidUtf8(#[from] Utf8Error),
    #[error("protocol error; bulk string of {len} bytes exceeds the {max} byte limit")]
    BulkTooLong { len: usize, max: usize },
    #[error("protocol error; array of {len} elements exceeds the {max} element limit")]
    ArrayTooLong { len: usize, max: usize },
    #[error("protocol error; arrays nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("protocol error; too big inline request, {0} bytes without a line break")]
    InlineTooLong(usize),
    #[error("protocol error; {0} bytes without a line break")]
    LineTooLong(usize),
    #[error("protocol error; {len} buffered bytes exceed the {max} byte limit")]
    BufferFull { len: usize, max: usize },
}

impl Error {
    /// Returns true when the error only means more bytes are needed.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::Incomplete)
    }
}

/// A single RESP2 value.
///
/// Bulk strings and arrays carry an `Option` so the protocol's null forms (`$-1` and `*-1`)
/// stay distinct from the empty string and the empty array.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Option<Vec<Frame>>),
}

impl Frame {
    pub fn bulk(data: impl Into<Bytes>) -> Frame {
        Frame::Bulk(Some(data.into()))
    }

    pub fn null_bulk() -> Frame {
        Frame::Bulk(None)
    }

    pub fn null_array() -> Frame {
        Frame::Array(None)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Bulk(None) | Frame::Array(None))
    }

    /// Checks that an entire typed frame is available at the cursor, without allocating.
    ///
    /// On success the cursor is positioned right after the frame. On
    /// [`Error::Incomplete`] the caller must discard the cursor position and retry once more
    /// bytes are buffered.
    pub fn check(src: &mut Cursor<&[u8]>, limits: &Limits) -> Result<(), Error> {
        check_typed(src, limits, 1)
    }

    /// Parses one typed frame starting at the cursor.
    ///
    /// The cursor only ever moves forward over bytes it has read, so the underlying buffer is
    /// never touched. Callers usually run [`Frame::check`] first so that bulk payloads are
    /// copied once, when the frame is known to be complete.
    pub fn parse(src: &mut Cursor<&[u8]>, limits: &Limits) -> Result<Frame, Error> {
        parse_typed(src, limits, 1)
    }
}

fn check_typed(src: &mut Cursor<&[u8]>, limits: &Limits, depth: usize) -> Result<(), Error> {
    let data_type = DataType::try_from(get_byte(src)?)?;

    match data_type {
        DataType::SimpleString | DataType::SimpleError | DataType::Integer => {
            get_bounded_line(src, limits)?;
        }
        DataType::BulkString => {
            if let Some(length) = get_length(src, limits)? {
                check_bulk_len(length, limits)?;
                get_payload(src, length)?;
            }
        }
        DataType::Array => {
            if let Some(length) = get_length(src, limits)? {
                check_array_len(length, depth, limits)?;
                for _ in 0..length {
                    check_typed(src, limits, depth + 1)?;
                }
            }
        }
    }

    Ok(())
}

fn parse_typed(src: &mut Cursor<&[u8]>, limits: &Limits, depth: usize) -> Result<Frame, Error> {
    // The first byte in an RESP-serialized payload always identifies its type.
    // Subsequent bytes constitute the type's contents.
    let data_type = DataType::try_from(get_byte(src)?)?;

    match data_type {
        DataType::SimpleString => {
            let line = get_bounded_line(src, limits)?;
            Ok(Frame::Simple(str::from_utf8(line)?.to_string()))
        }
        DataType::SimpleError => {
            let line = get_bounded_line(src, limits)?;
            Ok(Frame::Error(str::from_utf8(line)?.to_string()))
        }
        DataType::Integer => {
            let line = get_bounded_line(src, limits)?;
            Ok(Frame::Integer(parse_integer(line)?))
        }
        // $<length>\r\n<data>\r\n
        DataType::BulkString => {
            let Some(length) = get_length(src, limits)? else {
                return Ok(Frame::Bulk(None));
            };
            check_bulk_len(length, limits)?;

            let data = get_payload(src, length)?;
            Ok(Frame::Bulk(Some(Bytes::copy_from_slice(data))))
        }
        // *<number-of-elements>\r\n<element-1>...<element-n>
        DataType::Array => {
            let Some(length) = get_length(src, limits)? else {
                return Ok(Frame::Array(None));
            };
            check_array_len(length, depth, limits)?;

            // Every element takes at least three bytes, don't trust the header beyond that.
            let mut frames = Vec::with_capacity(length.min(src.remaining() / 3));
            for _ in 0..length {
                frames.push(parse_typed(src, limits, depth + 1)?);
            }

            Ok(Frame::Array(Some(frames)))
        }
    }
}

fn check_bulk_len(length: usize, limits: &Limits) -> Result<(), Error> {
    if length > limits.max_bulk_len {
        return Err(Error::BulkTooLong {
            len: length,
            max: limits.max_bulk_len,
        });
    }
    Ok(())
}

fn check_array_len(length: usize, depth: usize, limits: &Limits) -> Result<(), Error> {
    // Parsing recurses once per level, so the ceiling holds even for hand-built limits.
    let max_depth = limits.max_depth.min(MAX_DEPTH_CEILING);
    if depth > max_depth {
        return Err(Error::NestingTooDeep(max_depth));
    }
    if length > limits.max_array_len {
        return Err(Error::ArrayTooLong {
            len: length,
            max: limits.max_array_len,
        });
    }
    Ok(())
}

fn parse_integer(line: &[u8]) -> Result<i64, Error> {
    str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| Error::InvalidInteger(String::from_utf8_lossy(line).into_owned()))
}

/// Reads a `$` or `*` header. `None` stands for the null form, `-1`.
fn get_length(src: &mut Cursor<&[u8]>, limits: &Limits) -> Result<Option<usize>, Error> {
    let line = get_bounded_line(src, limits)?;

    // Lengths are plain digits or `-1`, unlike `:` integers no sign prefix is allowed.
    if line.first() == Some(&b'+') {
        return Err(Error::InvalidInteger(String::from_utf8_lossy(line).into_owned()));
    }
    let length = parse_integer(line)?;

    match length {
        -1 => Ok(None),
        length if length < -1 => Err(Error::InvalidLength(length)),
        length => usize::try_from(length)
            .map(Some)
            .map_err(|_| Error::InvalidLength(length)),
    }
}

/// Reads exactly `length` bytes followed by CRLF.
fn get_payload<'a>(src: &mut Cursor<&'a [u8]>, length: usize) -> Result<&'a [u8], Error> {
    if src.remaining() < length + CRLF.len() {
        return Err(Error::Incomplete);
    }

    let start = src.position() as usize;
    let end = start + length;
    let buf: &'a [u8] = *src.get_ref();

    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(Error::MissingTerminator);
    }

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

/// Like [`get_line`], but fails once more than `max_line_len` bytes are buffered without a CRLF,
/// instead of rescanning an ever growing line on every call.
fn get_bounded_line<'a>(src: &mut Cursor<&'a [u8]>, limits: &Limits) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;

    match get_line(src) {
        Err(Error::Incomplete) => {
            let pending = src.get_ref().len() - start;
            if pending > limits.max_line_len {
                return Err(Error::LineTooLong(pending));
            }
            Err(Error::Incomplete)
        }
        line => line,
    }
}

/// Returns the bytes up to the next CRLF and moves the cursor past it. The cursor is left in
/// place when no CRLF is buffered yet.
pub(crate) fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let end = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "{}", s),
            Frame::Error(s) => write!(f, "(error) {}", s),
            Frame::Integer(i) => write!(f, "(integer) {}", i),
            Frame::Bulk(Some(bytes)) => write!(f, "\"{}\"", bytes.escape_ascii()),
            Frame::Bulk(None) | Frame::Array(None) => write!(f, "(nil)"),
            Frame::Array(Some(frames)) if frames.is_empty() => write!(f, "(empty array)"),
            Frame::Array(Some(frames)) => {
                write!(f, "[")?;
                for (i, frame) in frames.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", frame)?;
                }
                write!(f, "]")
            }
        }
    }
}
