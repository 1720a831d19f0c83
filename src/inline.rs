//! The inline command dialect: a single space separated line such as `SET key "hello world"`,
//! as typed into a telnet session.

use std::io::Cursor;

use bytes::Bytes;

use crate::frame::{self, Error, Frame};
use crate::limits::Limits;

/// Parses one inline command line at the cursor into an array of bulk strings, the same shape
/// clients use for typed commands.
///
/// Once its CRLF has arrived the line is always consumed. `Ok(None)` means the line held
/// nothing but whitespace.
pub(crate) fn parse_line(
    src: &mut Cursor<&[u8]>,
    limits: &Limits,
) -> Result<Option<Frame>, Error> {
    let start = src.position() as usize;

    let line = match frame::get_line(src) {
        Ok(line) => line,
        Err(Error::Incomplete) => {
            let pending = src.get_ref().len() - start;
            if pending > limits.max_inline_len {
                return Err(Error::InlineTooLong(pending));
            }
            return Err(Error::Incomplete);
        }
        Err(err) => return Err(err),
    };

    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }

    let parts = split_quoted(line)
        .into_iter()
        .map(|part| Frame::Bulk(Some(part)))
        .collect();

    Ok(Some(Frame::Array(Some(parts))))
}

/// Splits a line on spaces, keeping double quoted spans together.
///
/// A quote preceded by a backslash does not open or close a span, and the backslash is kept.
/// Unterminated quotes run to the end of the line.
pub fn split_quoted(line: &[u8]) -> Vec<Bytes> {
    let mut parts = Vec::new();
    let mut current = Vec::new();
    let mut in_quotes = false;

    for (i, &byte) in line.iter().enumerate() {
        match byte {
            b'"' if i == 0 || line[i - 1] != b'\\' => in_quotes = !in_quotes,
            b' ' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(Bytes::from(std::mem::take(&mut current)));
                }
            }
            _ => current.push(byte),
        }
    }

    if !current.is_empty() {
        parts.push(Bytes::from(current));
    }

    parts
}
