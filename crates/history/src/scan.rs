//! Point-in-time scans of the log files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use modwatch_config::Config;
use modwatch_matcher::PatternMatcher;
use modwatch_types::{ClassifiedLine, LogRole, Severity};

use crate::buffer::RingBuffer;
use crate::error::ScanError;

/// Result of a filtered tail scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub role: LogRole,
    pub path: PathBuf,
    /// Lines in the file.
    pub total_lines: usize,
    /// Lines that passed the filter, before the tail window was applied.
    pub matched: usize,
    /// The last matched lines, oldest first.
    pub lines: Vec<ClassifiedLine>,
}

/// Per-file statistics.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub role: LogRole,
    pub path: PathBuf,
    pub exists: bool,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    pub total_lines: usize,
    pub relevant_lines: usize,
    /// Relevant lines per severity.
    pub by_severity: BTreeMap<Severity, usize>,
    /// Lines matching an extra pattern, relevant or not.
    pub extra_matches: usize,
}

impl FileSummary {
    fn empty(role: LogRole, path: &Path) -> Self {
        Self {
            role,
            path: path.to_path_buf(),
            exists: false,
            size: 0,
            modified: None,
            total_lines: 0,
            relevant_lines: 0,
            by_severity: BTreeMap::new(),
            extra_matches: 0,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Summary of both log files.
#[derive(Debug, Clone)]
pub struct Summary {
    pub game: FileSummary,
    pub error: FileSummary,
}

/// One-shot filtered reads sharing the live classification rules.
pub struct StaticScanner {
    matcher: PatternMatcher,
    game_path: PathBuf,
    error_path: PathBuf,
}

impl StaticScanner {
    pub fn new(config: &Config) -> Self {
        Self {
            matcher: PatternMatcher::new(config),
            game_path: config.game_log_path(),
            error_path: config.error_log_path(),
        }
    }

    /// The last `n` error-log lines attributed to the mod by folder name.
    pub fn errors(&self, n: usize) -> Result<ScanReport, ScanError> {
        self.tail(LogRole::ErrorLog, &self.error_path, n, |m, line| {
            m.is_relevant(LogRole::ErrorLog, line)
        })
    }

    /// The last `n` game-log lines carrying the mod prefix or an extra pattern.
    pub fn game(&self, n: usize) -> Result<ScanReport, ScanError> {
        self.tail(LogRole::GameLog, &self.game_path, n, |m, line| {
            m.is_relevant(LogRole::GameLog, line) || m.matches_extra(line)
        })
    }

    /// Statistics for both files. Missing files are reported, not errors.
    pub fn summary(&self) -> Result<Summary, ScanError> {
        Ok(Summary {
            game: self.summarize(LogRole::GameLog, &self.game_path)?,
            error: self.summarize(LogRole::ErrorLog, &self.error_path)?,
        })
    }

    fn tail(
        &self,
        role: LogRole,
        path: &Path,
        n: usize,
        keep: impl Fn(&PatternMatcher, &str) -> bool,
    ) -> Result<ScanReport, ScanError> {
        let mut window = RingBuffer::new(n);
        let mut total_lines = 0;
        let mut matched = 0;

        for_each_line(path, |line| {
            total_lines += 1;
            if keep(&self.matcher, line) {
                matched += 1;
                window.push(self.matcher.classify_any(role, line));
            }
        })?;

        tracing::debug!(%role, total_lines, matched, "scan complete");
        Ok(ScanReport {
            role,
            path: path.to_path_buf(),
            total_lines,
            matched,
            lines: window.into_vec(),
        })
    }

    fn summarize(&self, role: LogRole, path: &Path) -> Result<FileSummary, ScanError> {
        let mut summary = FileSummary::empty(role, path);
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(summary),
            Err(e) => return Err(e.into()),
        };

        summary.exists = true;
        summary.size = meta.len();
        summary.modified = meta.modified().ok().map(DateTime::<Local>::from);

        for_each_line(path, |line| {
            summary.total_lines += 1;
            if self.matcher.matches_extra(line) {
                summary.extra_matches += 1;
            }
            if let Some(classified) = self.matcher.classify(role, line) {
                summary.relevant_lines += 1;
                *summary.by_severity.entry(classified.severity).or_insert(0) += 1;
            }
        })?;

        Ok(summary)
    }
}

/// Calls `f` with each line of `path`, decoded lossily.
fn for_each_line(path: &Path, mut f: impl FnMut(&str)) -> Result<(), ScanError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScanError::Missing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let mut bytes = buf.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest;
        }
        if let Some(rest) = bytes.strip_suffix(b"\r") {
            bytes = rest;
        }
        f(&String::from_utf8_lossy(bytes));
    }
    Ok(())
}
