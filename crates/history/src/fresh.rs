//! Are the logs newer than the last edit to the mod source?

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use modwatch_config::Config;
use modwatch_types::LogRole;
use walkdir::WalkDir;

use crate::error::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The log file does not exist.
    Missing,
    /// Written after the newest source file.
    Fresh,
    /// Older than the newest source file; the game has not run since the edit.
    Stale,
    /// No source tree to compare against.
    Unknown,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Freshness::Missing => "missing",
            Freshness::Fresh => "fresh",
            Freshness::Stale => "stale",
            Freshness::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct LogFreshness {
    pub role: LogRole,
    pub path: PathBuf,
    pub modified: Option<DateTime<Local>>,
    pub freshness: Freshness,
}

#[derive(Debug, Clone)]
pub struct SourceEdit {
    pub path: PathBuf,
    pub modified: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct FreshnessReport {
    /// Most recently modified file under the source tree, if any.
    pub newest_source: Option<SourceEdit>,
    pub logs: Vec<LogFreshness>,
}

impl FreshnessReport {
    /// True when every present log is fresh.
    pub fn all_fresh(&self) -> bool {
        self.logs
            .iter()
            .filter(|l| l.freshness != Freshness::Missing)
            .all(|l| l.freshness == Freshness::Fresh)
    }
}

/// Compares log modification times against the mod source tree.
pub struct FreshnessComparator {
    logs: Vec<(LogRole, PathBuf)>,
    source: Option<PathBuf>,
}

impl FreshnessComparator {
    pub fn new(config: &Config) -> Self {
        Self {
            logs: vec![
                (LogRole::GameLog, config.game_log_path()),
                (LogRole::ErrorLog, config.error_log_path()),
            ],
            source: config.mod_source_path.clone(),
        }
    }

    pub fn compare(&self) -> Result<FreshnessReport, ScanError> {
        let newest_source = match &self.source {
            Some(root) => newest_file(root),
            None => None,
        };

        let mut logs = Vec::with_capacity(self.logs.len());
        for (role, path) in &self.logs {
            let modified = match std::fs::metadata(path) {
                Ok(meta) => meta.modified().ok(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    logs.push(LogFreshness {
                        role: *role,
                        path: path.clone(),
                        modified: None,
                        freshness: Freshness::Missing,
                    });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let freshness = match (&newest_source, modified) {
                (Some(edit), Some(log_time)) => {
                    if DateTime::<Local>::from(log_time) >= edit.modified {
                        Freshness::Fresh
                    } else {
                        Freshness::Stale
                    }
                }
                _ => Freshness::Unknown,
            };

            logs.push(LogFreshness {
                role: *role,
                path: path.clone(),
                modified: modified.map(DateTime::<Local>::from),
                freshness,
            });
        }

        Ok(FreshnessReport {
            newest_source,
            logs,
        })
    }
}

/// Newest regular file under `root`, skipping hidden entries.
fn newest_file(root: &Path) -> Option<SourceEdit> {
    let mut newest: Option<(PathBuf, SystemTime)> = None;

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping source entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let modified = entry
            .metadata()
            .map_err(std::io::Error::from)
            .and_then(|m| m.modified());
        let Ok(modified) = modified else {
            continue;
        };
        if newest.as_ref().is_none_or(|(_, t)| modified > *t) {
            newest = Some((entry.into_path(), modified));
        }
    }

    newest.map(|(path, modified)| SourceEdit {
        path,
        modified: modified.into(),
    })
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}
