//! Log following for Stellaris `game.log` / `error.log`.
//!
//! [`TailReader`] follows one file through growth, truncation and
//! replacement. [`StreamProcessor`] drives a reader for one [`LogStream`],
//! drops lines that fail the relevance test for its role, and forwards the
//! rest as [`StreamEvent`]s.

mod error;
mod stream;
mod tailer;
mod wake;

use std::path::PathBuf;

use modwatch_types::LogRole;

pub use error::TailError;
pub use stream::{StreamEvent, StreamExit, StreamProcessor};
pub use tailer::{DEFAULT_POLL_INTERVAL, StartAt, TailBatch, TailEvent, TailReader};

/// One watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStream {
    pub role: LogRole,
    pub path: PathBuf,
}

impl LogStream {
    pub fn new(role: LogRole, path: impl Into<PathBuf>) -> Self {
        Self {
            role,
            path: path.into(),
        }
    }
}
