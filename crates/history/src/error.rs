//! Error types for one-shot log queries.

use std::path::PathBuf;

/// Errors produced by historical scans.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("log file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
