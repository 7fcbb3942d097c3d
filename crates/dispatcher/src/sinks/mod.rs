//! Sink implementations
//!
//! Contains LogSink and AngleFileSink.

mod file;
mod log;

pub use self::file::{AngleFileSink, AngleFileSinkConfig, RomSummaryFile};
pub use self::log::LogSink;
