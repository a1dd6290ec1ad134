//! Blocked word matching for comments

use regex::{Regex, RegexBuilder};

/// Case-insensitive matcher over a list of blocked words
#[derive(Debug, Clone)]
pub struct WordFilter {
    pattern: Option<Regex>,
}

impl WordFilter {
    pub fn new<S: AsRef<str>>(words: &[S]) -> Self {
        let alternatives: Vec<String> = words
            .iter()
            .map(|w| w.as_ref().trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Self { pattern: None };
        }

        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| tracing::warn!("Failed to build word filter: {}", e))
            .ok();
        Self { pattern }
    }

    pub fn contains_blocked_word(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }

    /// Replace every blocked word with one `*` per character
    pub fn mask(&self, text: &str) -> String {
        match &self.pattern {
            Some(p) => p
                .replace_all(text, |caps: &regex::Captures| "*".repeat(caps[0].chars().count()))
                .into_owned(),
            None => text.to_string(),
        }
    }
}
