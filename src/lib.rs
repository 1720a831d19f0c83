pub mod codec;
pub mod command;
pub mod connection;
pub mod decoder;
pub mod frame;
pub mod inline;
pub mod limits;

pub use command::{extract_command, Command, CommandError};
pub use decoder::{FeedError, StreamDecoder};
pub use frame::Frame;
pub use limits::Limits;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
