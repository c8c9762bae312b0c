//! Terminal rendering for the Combined View, Alert View, and reports.

use std::io::IsTerminal;

use chrono::{DateTime, Local};
use modwatch_history::{FileSummary, Freshness, FreshnessReport, ScanReport, Summary};
use modwatch_monitor::{AlertBlock, Notice, SessionSummary};
use modwatch_types::{ClassifiedLine, Severity};
use owo_colors::OwoColorize;

/// Output style chosen once at startup.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub json: bool,
    pub color: bool,
}

impl Style {
    pub fn detect(json: bool) -> Self {
        Self {
            json,
            color: !json && std::io::stdout().is_terminal(),
        }
    }

    /// One Combined View line.
    pub fn line(&self, line: &ClassifiedLine) -> String {
        if self.json {
            return to_json(line);
        }
        let text = format!("[{}] {}", line.source_role.tag(), line.raw);
        if !self.color {
            return text;
        }
        match line.severity {
            Severity::Error => text.red().to_string(),
            Severity::Warning => text.yellow().to_string(),
            Severity::Success => text.green().to_string(),
            Severity::Debug => text.dimmed().to_string(),
            Severity::Info => text,
        }
    }

    pub fn alert(&self, block: &AlertBlock) -> String {
        if self.json {
            let value = serde_json::json!({
                "alert": block.number,
                "at": block.at.to_rfc3339(),
                "line": block.line,
            });
            return value.to_string();
        }
        let text = block.to_string();
        if self.color {
            text.bright_red().bold().to_string()
        } else {
            text
        }
    }

    pub fn notice(&self, notice: &Notice) -> String {
        let text = format!("modwatch: {notice}");
        if self.color { text.cyan().to_string() } else { text }
    }

    pub fn session_summary(&self, summary: &SessionSummary) -> String {
        let mut text = format!("{} lines, {} alerts", summary.lines, summary.alerts);
        if !summary.failed_streams.is_empty() {
            let failed: Vec<String> = summary.failed_streams.iter().map(|r| r.to_string()).collect();
            text.push_str(&format!(", failed streams: {}", failed.join(", ")));
        }
        text
    }

    pub fn scan(&self, report: &ScanReport) -> Vec<String> {
        if self.json {
            return report.lines.iter().map(to_json).collect();
        }
        let mut out = Vec::with_capacity(report.lines.len() + 1);
        let header = format!(
            "{} of {} matching lines in {} ({} read)",
            report.lines.len(),
            report.matched,
            report.path.display(),
            report.total_lines,
        );
        out.push(self.heading(&header));
        for line in &report.lines {
            let rendered = self.line(line);
            if line.matched_extra_pattern && !line.is_mod_relevant && self.color {
                out.push(rendered.magenta().to_string());
            } else {
                out.push(rendered);
            }
        }
        out
    }

    pub fn summary(&self, summary: &Summary) -> Vec<String> {
        let mut out = Vec::new();
        for file in [&summary.game, &summary.error] {
            out.extend(self.file_summary(file));
            out.push(String::new());
        }
        out.pop();
        out
    }

    fn file_summary(&self, file: &FileSummary) -> Vec<String> {
        let mut out = vec![self.heading(&format!("{} log: {}", file.role, file.path.display()))];
        if !file.exists {
            out.push("  not found".to_string());
            return out;
        }
        out.push(format!(
            "  {} bytes, modified {}",
            file.size,
            format_time(file.modified.as_ref())
        ));
        out.push(format!(
            "  {} lines, {} from the mod, {} extra pattern matches",
            file.total_lines, file.relevant_lines, file.extra_matches
        ));
        for severity in Severity::all() {
            out.push(format!("  {:<8} {}", severity.to_string(), file.count(*severity)));
        }
        out
    }

    pub fn freshness(&self, report: &FreshnessReport) -> Vec<String> {
        let mut out = Vec::new();
        match &report.newest_source {
            Some(edit) => out.push(format!(
                "newest source edit: {} ({})",
                format_time(Some(&edit.modified)),
                edit.path.display()
            )),
            None => out.push("newest source edit: unknown (set mod_source_path)".to_string()),
        }
        for log in &report.logs {
            let state = log.freshness.to_string();
            let state = match (self.color, log.freshness) {
                (false, _) => state,
                (true, Freshness::Fresh) => state.green().to_string(),
                (true, Freshness::Stale) => state.yellow().to_string(),
                (true, Freshness::Missing) => state.red().to_string(),
                (true, Freshness::Unknown) => state.dimmed().to_string(),
            };
            out.push(format!(
                "{:<5} log: {}  modified {}",
                log.role.to_string(),
                state,
                format_time(log.modified.as_ref())
            ));
        }
        out
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn to_json(line: &ClassifiedLine) -> String {
    match serde_json::to_string(line) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode line");
            String::new()
        }
    }
}

fn format_time(at: Option<&DateTime<Local>>) -> String {
    match at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modwatch_types::LogRole;

    const PLAIN: Style = Style {
        json: false,
        color: false,
    };

    fn line(role: LogRole, raw: &str, severity: Severity) -> ClassifiedLine {
        ClassifiedLine {
            timestamp: 1_700_000_000_000,
            raw: raw.into(),
            source_role: role,
            severity,
            is_mod_relevant: true,
            matched_extra_pattern: false,
        }
    }

    #[test]
    fn plain_lines_carry_role_tag() {
        let game = line(LogRole::GameLog, "[LN] hello", Severity::Info);
        let err = line(LogRole::ErrorLog, "mod/ln/a.txt: error", Severity::Error);
        assert_eq!(PLAIN.line(&game), "[GAME] [LN] hello");
        assert_eq!(PLAIN.line(&err), "[ERR ] mod/ln/a.txt: error");
    }

    #[test]
    fn colored_error_differs_from_plain() {
        let style = Style {
            json: false,
            color: true,
        };
        let err = line(LogRole::ErrorLog, "boom", Severity::Error);
        let info = line(LogRole::GameLog, "hi", Severity::Info);
        assert_ne!(style.line(&err), PLAIN.line(&err));
        assert_eq!(style.line(&info), PLAIN.line(&info));
    }

    #[test]
    fn json_lines_use_camel_case() {
        let style = Style {
            json: true,
            color: false,
        };
        let out = style.line(&line(LogRole::ErrorLog, "x", Severity::Warning));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["sourceRole"], "errorLog");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["raw"], "x");
    }

    #[test]
    fn notice_is_prefixed() {
        assert_eq!(PLAIN.notice(&Notice::Stopped), "modwatch: session stopped");
    }

    #[test]
    fn session_summary_lists_failed_streams() {
        let summary = SessionSummary {
            lines: 3,
            alerts: 1,
            failed_streams: vec![LogRole::ErrorLog],
        };
        assert_eq!(
            PLAIN.session_summary(&summary),
            "3 lines, 1 alerts, failed streams: error"
        );
    }
}
