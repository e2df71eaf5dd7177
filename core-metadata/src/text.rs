//! Text-level edits over a serialized record
//!
//! Runs after the element edits, for changes no element path can express:
//! literal substitutions first, then regex rules. Afterwards the remaining
//! fill markers are counted so unfinished templates show up in the logs.

use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

use crate::error::{MetadataError, Result};

pub const DEFAULT_FILL_MARKER: &str = "xxx";

#[derive(Debug, Clone)]
struct RegexRule {
    pattern: Regex,
    replacement: String,
}

#[derive(Debug, Clone, Default)]
pub struct TextEdits {
    literals: Vec<(String, String)>,
    rules: Vec<RegexRule>,
    fill_marker: Option<Regex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEditOutcome {
    pub text: String,
    /// Substitutions made by the regex rules
    pub regex_replacements: usize,
    /// Case-insensitive occurrences of the fill marker left in the text
    pub remaining_fills: usize,
}

impl TextEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_literal(mut self, find: impl Into<String>, replace: impl Into<String>) -> Self {
        self.literals.push((find.into(), replace.into()));
        self
    }

    pub fn with_regex(mut self, pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|e| MetadataError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.rules.push(RegexRule {
            pattern: compiled,
            replacement: replacement.into(),
        });
        Ok(self)
    }

    pub fn with_fill_marker(mut self, marker: &str) -> Result<Self> {
        let compiled = RegexBuilder::new(&regex::escape(marker))
            .case_insensitive(true)
            .build()
            .map_err(|e| MetadataError::InvalidPattern {
                pattern: marker.to_string(),
                reason: e.to_string(),
            })?;
        self.fill_marker = Some(compiled);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.rules.is_empty()
    }

    pub fn apply(&self, input: &str) -> TextEditOutcome {
        let mut text = input.to_string();
        for (find, replace) in &self.literals {
            if !find.is_empty() {
                text = text.replace(find.as_str(), replace);
            }
        }

        let mut regex_replacements = 0;
        for rule in &self.rules {
            let count = rule.pattern.find_iter(&text).count();
            if count > 0 {
                text = rule
                    .pattern
                    .replace_all(&text, rule.replacement.as_str())
                    .into_owned();
                info!(pattern = %rule.pattern, count, "Replaced text matching pattern");
            }
            regex_replacements += count;
        }

        let remaining_fills = self
            .fill_marker
            .as_ref()
            .map(|m| m.find_iter(&text).count())
            .unwrap_or(0);
        if remaining_fills > 0 {
            debug!(remaining_fills, "Fill markers remain in metadata");
        }

        TextEditOutcome {
            text,
            regex_replacements,
            remaining_fills,
        }
    }
}
