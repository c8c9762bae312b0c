//! Shared types for classified log lines.
//!
//! A [`ClassifiedLine`] is built once per relevant line read from a watched
//! log file and handed to the Combined View and, for error-log lines, to the
//! Alert View.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which watched file a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogRole {
    /// `logs/game.log`: script output, matched by the bracketed mod prefix.
    GameLog,
    /// `logs/error.log`: engine errors, matched by mod folder name.
    ErrorLog,
}

impl LogRole {
    /// Returns both roles in the order streams are started.
    pub fn all() -> &'static [LogRole] {
        &[LogRole::GameLog, LogRole::ErrorLog]
    }

    /// Short fixed-width tag used by the terminal views.
    pub fn tag(&self) -> &'static str {
        match self {
            LogRole::GameLog => "GAME",
            LogRole::ErrorLog => "ERR ",
        }
    }

    /// File name under `{docs}/logs/`.
    pub fn file_name(&self) -> &'static str {
        match self {
            LogRole::GameLog => "game.log",
            LogRole::ErrorLog => "error.log",
        }
    }
}

impl fmt::Display for LogRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogRole::GameLog => write!(f, "game"),
            LogRole::ErrorLog => write!(f, "error"),
        }
    }
}

/// Severity inferred from line content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Success,
    Debug,
    Info,
}

impl Severity {
    /// Returns all severities in classification precedence order.
    pub fn all() -> &'static [Severity] {
        &[
            Severity::Error,
            Severity::Warning,
            Severity::Success,
            Severity::Debug,
            Severity::Info,
        ]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Success => write!(f, "success"),
            Severity::Debug => write!(f, "debug"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A line that passed the relevance test for its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedLine {
    /// Unix milliseconds at which the line was observed.
    pub timestamp: i64,
    pub raw: String,
    pub source_role: LogRole,
    pub severity: Severity,
    pub is_mod_relevant: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub matched_extra_pattern: bool,
}

impl ClassifiedLine {
    /// Whether this line belongs on the Alert View.
    ///
    /// Only relevant error-log lines alert; game-log lines never do.
    pub fn is_alert_worthy(&self) -> bool {
        self.is_mod_relevant && self.source_role == LogRole::ErrorLog
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Current wall clock as Unix milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(role: LogRole, relevant: bool) -> ClassifiedLine {
        ClassifiedLine {
            timestamp: 1_700_000_000_000,
            raw: "mod/the_living_network/events/x.txt: error".into(),
            source_role: role,
            severity: Severity::Error,
            is_mod_relevant: relevant,
            matched_extra_pattern: false,
        }
    }

    #[test]
    fn only_relevant_error_log_lines_alert() {
        assert!(line(LogRole::ErrorLog, true).is_alert_worthy());
        assert!(!line(LogRole::ErrorLog, false).is_alert_worthy());
        assert!(!line(LogRole::GameLog, true).is_alert_worthy());
    }

    #[test]
    fn classified_line_json_shape() {
        let json = serde_json::to_string(&line(LogRole::ErrorLog, true)).unwrap();
        assert!(json.contains("\"sourceRole\":\"errorLog\""));
        assert!(json.contains("\"isModRelevant\":true"));
        assert!(!json.contains("matchedExtraPattern"));

        let parsed: ClassifiedLine = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, line(LogRole::ErrorLog, true));
    }

    #[test]
    fn role_tags_are_fixed_width() {
        for role in LogRole::all() {
            assert_eq!(role.tag().len(), 4);
        }
        assert_eq!(LogRole::ErrorLog.file_name(), "error.log");
    }

    #[test]
    fn severity_order_matches_precedence() {
        let all = Severity::all();
        assert_eq!(all.first(), Some(&Severity::Error));
        assert_eq!(all.last(), Some(&Severity::Info));
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
