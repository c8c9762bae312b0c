//! One-shot queries over the Stellaris logs.
//!
//! These share the live classification rules from `modwatch-matcher` but run
//! once against the files on disk, with no tailing or concurrency.

mod buffer;
mod error;
mod fresh;
mod scan;

pub use buffer::RingBuffer;
pub use error::ScanError;
pub use fresh::{Freshness, FreshnessComparator, FreshnessReport, LogFreshness, SourceEdit};
pub use scan::{FileSummary, ScanReport, StaticScanner, Summary};
