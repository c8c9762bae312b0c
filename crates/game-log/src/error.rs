//! Tail error types.

use std::path::PathBuf;

/// Errors that end a tail.
///
/// A missing file or a rotated file is not an error; the reader absorbs
/// both and reports them as [`crate::TailEvent`]s.
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a regular file", path.display())]
    NotAFile { path: PathBuf },
}

impl TailError {
    pub(crate) fn unreadable(path: &std::path::Path, source: std::io::Error) -> Self {
        TailError::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    }
}
