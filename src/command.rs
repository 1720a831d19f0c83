use std::{fmt, slice, str};

use thiserror::Error as ThisError;

use crate::frame::Frame;

/// A command as sent by a client: a name followed by its arguments.
///
/// The name is upper-cased so that dispatch is case insensitive; arguments keep their case.
/// Only the protocol shape is validated here, not whether the command exists or how many
/// arguments it takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl TryFrom<&Frame> for Command {
    type Error = CommandError;

    fn try_from(frame: &Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the Redis server as RESP arrays.
        let frames = match frame {
            Frame::Array(Some(array)) => array,
            frame => {
                return Err(CommandError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame.clone(),
                })
            }
        };

        let parser = &mut CommandParser {
            parts: frames.iter().enumerate(),
        };

        let name = parser.parse_command_name()?;

        let mut args = Vec::with_capacity(frames.len() - 1);
        while let Some(arg) = parser.next_string()? {
            args.push(arg);
        }

        Ok(Command { name, args })
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        Command::try_from(&frame)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}

/// Projects a decoded frame into a [`Command`], or `None` when the frame is not shaped like one.
pub fn extract_command(frame: &Frame) -> Option<Command> {
    Command::try_from(frame).ok()
}

struct CommandParser<'a> {
    parts: std::iter::Enumerate<slice::Iter<'a, Frame>>,
}

impl<'a> CommandParser<'a> {
    fn parse_command_name(&mut self) -> Result<String, CommandError> {
        self.next_string()?
            .map(|name| name.to_uppercase())
            .ok_or(CommandError::Empty)
    }

    fn next_string(&mut self) -> Result<Option<String>, CommandError> {
        let Some((index, frame)) = self.parts.next() else {
            return Ok(None);
        };

        match frame {
            // Both `Simple` and `Bulk` representation may be strings. Strings are parsed to UTF-8.
            // While errors are stored as strings, they are considered separate types.
            Frame::Simple(s) => Ok(Some(s.clone())),
            Frame::Bulk(Some(bytes)) => str::from_utf8(&bytes[..])
                .map(|s| Some(s.to_string()))
                .map_err(CommandError::InvalidUTF8String),
            frame => Err(CommandError::InvalidElement {
                index,
                actual: frame.clone(),
            }),
        }
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandError {
    #[error("protocol error; invalid frame, expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("protocol error; empty command")]
    Empty,
    #[error("protocol error; expected simple or bulk string at position {index}, got {actual}")]
    InvalidElement { index: usize, actual: Frame },
    #[error("protocol error; invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
}
