//! Line classification for Stellaris logs.
//!
//! Two independent axes, both pure given a [`Config`]:
//! - relevance: does the line belong to the configured mod? The rule differs
//!   per [`LogRole`]. Game-log lines carry the mod's own prefix; error-log
//!   lines only carry file paths, so they are attributed by folder name.
//! - severity: keyword inference, first match wins.
//!
//! All patterns are compiled once in [`PatternMatcher::new`].

use modwatch_config::Config;
use modwatch_types::{ClassifiedLine, LogRole, Severity, now_millis};
use regex::Regex;

/// Severity keywords in precedence order, already uppercase.
const SEVERITY_KEYWORDS: &[(&[&str], Severity)] = &[
    (&["ERROR", "FAIL"], Severity::Error),
    (&["WARNING", "WARN"], Severity::Warning),
    (&["SUCCESS", "COMPLETE"], Severity::Success),
    (&["DEBUG"], Severity::Debug),
];

/// Precompiled relevance, severity, and extra-pattern matchers.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    /// Literal `[PREFIX]` forms.
    bracketed: Vec<String>,
    /// `PREFIX:` / `PREFIX ` at the start of a message.
    separated: Option<Regex>,
    folder_names: Vec<String>,
    extra: Vec<Regex>,
}

impl PatternMatcher {
    /// Builds the matchers from configuration.
    pub fn new(config: &Config) -> Self {
        let prefixes: Vec<&str> = config
            .mod_prefixes
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        let bracketed = prefixes.iter().map(|p| format!("[{p}]")).collect();

        let separated = if prefixes.is_empty() {
            None
        } else {
            let alternation = prefixes
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            // Line start, optionally after the `[time][file:line]:` header.
            let pattern = format!(r"^(?:\[[^\]]*\]\s*)*:?\s*(?:{alternation})(?::|\s)");
            match Regex::new(&pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to compile prefix pattern");
                    None
                }
            }
        };

        let folder_names = config
            .mod_folder_names
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();

        let extra = config
            .extra_patterns
            .iter()
            .filter(|p| !p.is_empty())
            .filter_map(|p| compile_extra(p))
            .collect();

        Self {
            bracketed,
            separated,
            folder_names,
            extra,
        }
    }

    /// Whether error-log attribution has anything to match against.
    pub fn has_folder_names(&self) -> bool {
        !self.folder_names.is_empty()
    }

    /// Role-specific relevance test.
    pub fn is_relevant(&self, role: LogRole, line: &str) -> bool {
        match role {
            LogRole::GameLog => self.matches_prefix(line),
            LogRole::ErrorLog => self.matches_folder(line),
        }
    }

    /// `[PREFIX]` anywhere, or `PREFIX:` / `PREFIX ` at a message start.
    pub fn matches_prefix(&self, line: &str) -> bool {
        self.bracketed.iter().any(|b| line.contains(b.as_str()))
            || self.separated.as_ref().is_some_and(|re| re.is_match(line))
    }

    /// Plain case-sensitive substring test against the mod folder names.
    pub fn matches_folder(&self, line: &str) -> bool {
        self.folder_names.iter().any(|f| line.contains(f.as_str()))
    }

    /// Whether any extra highlight pattern matches.
    pub fn matches_extra(&self, line: &str) -> bool {
        self.extra.iter().any(|re| re.is_match(line))
    }

    /// Classifies a line, returning `None` when it fails the relevance test.
    pub fn classify(&self, role: LogRole, line: &str) -> Option<ClassifiedLine> {
        if !self.is_relevant(role, line) {
            return None;
        }
        Some(self.build(role, line, true))
    }

    /// Classifies a line regardless of relevance.
    pub fn classify_any(&self, role: LogRole, line: &str) -> ClassifiedLine {
        let relevant = self.is_relevant(role, line);
        self.build(role, line, relevant)
    }

    fn build(&self, role: LogRole, line: &str, relevant: bool) -> ClassifiedLine {
        ClassifiedLine {
            timestamp: now_millis(),
            raw: line.to_string(),
            source_role: role,
            severity: classify_severity(line),
            is_mod_relevant: relevant,
            matched_extra_pattern: self.matches_extra(line),
        }
    }
}

/// Infers severity by case-insensitive keyword, first match wins.
pub fn classify_severity(line: &str) -> Severity {
    let upper = line.to_ascii_uppercase();
    SEVERITY_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| upper.contains(k)))
        .map(|(_, severity)| *severity)
        .unwrap_or(Severity::Info)
}

/// Compiles an extra pattern, falling back to a literal match when it is not
/// a valid regex.
fn compile_extra(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(_) => {
            tracing::debug!(pattern, "extra pattern is not a regex, matching literally");
            Regex::new(&regex::escape(pattern)).ok()
        }
    }
}
