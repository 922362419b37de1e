//! Sink implementations
//!
//! Contains LogSink, FileSink, and TerminalSink.

mod file;
mod log;
mod terminal;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::terminal::TerminalSink;
