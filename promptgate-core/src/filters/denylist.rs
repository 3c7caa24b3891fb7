// promptgate-core/src/filters/denylist.rs
//! The word-list filter: a static denylist applied by case-insensitive
//! substring matching.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use regex::{Regex, RegexBuilder};

use crate::config::FilterConfig;
use crate::detection::{log_detection_debug, Detection};
use crate::errors::CoreError;

/// The fixed redaction tag used for denylist hits.
pub const DENYLIST_TAG: &str = "[REDACTED]";

/// Detection category reported for denylist hits.
pub const DENYLIST_CATEGORY: &str = "profanity";

/// Filters denylisted words out of text.
///
/// Matching is deliberately not anchored to word boundaries: a denylist
/// entry occurring inside a longer word still matches. That is the
/// documented contract; adding `\b` anchors would change observable
/// behavior.
#[derive(Debug, Clone)]
pub struct DenylistFilter {
    entries: Vec<(String, Regex)>,
}

impl DenylistFilter {
    /// Builds a filter from the denylist in `config`. Each entry compiles to
    /// a case-insensitive literal pattern; an uncompilable entry is a
    /// configuration fault surfaced at construction time.
    pub fn new(config: &FilterConfig) -> Result<Self, CoreError> {
        let mut entries = Vec::with_capacity(config.denylist.len());
        for word in &config.denylist {
            let regex = RegexBuilder::new(&regex::escape(word))
                .case_insensitive(true)
                .build()
                .map_err(|e| CoreError::RuleCompilationError(word.clone(), e))?;
            entries.push((word.to_lowercase(), regex));
        }
        debug!("Compiled {} denylist entries.", entries.len());
        Ok(Self { entries })
    }

    /// Filters denylisted content from `text`.
    ///
    /// For each entry, a case-insensitive substring test against the original
    /// text decides whether a detection is reported; replacement substitutes
    /// every case-insensitive occurrence of the literal entry in the running
    /// result with [`DENYLIST_TAG`], independently per entry.
    pub fn apply(&self, text: &str) -> Result<(String, Vec<Detection>), CoreError> {
        let mut result = text.to_string();
        let mut detected = Vec::new();
        let lowered = text.to_lowercase();

        for (word, regex) in &self.entries {
            if lowered.contains(word.as_str()) {
                log_detection_debug(module_path!(), DENYLIST_CATEGORY, word);
                detected.push(Detection::new(DENYLIST_CATEGORY, word.clone()));
                result = regex.replace_all(&result, DENYLIST_TAG).into_owned();
            }
        }

        Ok((result, detected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;

    fn default_filter() -> DenylistFilter {
        let config = FilterConfig::load_default_rules().unwrap();
        DenylistFilter::new(&config).unwrap()
    }

    #[test]
    fn detects_and_replaces_denylisted_word() {
        let filter = default_filter();
        let (out, detected) = filter.apply("this is offensive content").unwrap();
        assert_eq!(out, "this is [REDACTED] content");
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].to_string(), "profanity: offensive");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let filter = default_filter();
        let (out, detected) = filter.apply("this is OFFENSIVE content").unwrap();
        assert_eq!(out, "this is [REDACTED] content");
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].matched_text, "offensive");
    }

    #[test]
    fn clean_text_passes_through() {
        let filter = default_filter();
        let (out, detected) = filter.apply("perfectly polite text").unwrap();
        assert_eq!(out, "perfectly polite text");
        assert!(detected.is_empty());
    }

    /// Documented limitation: matching is an unanchored substring test, so
    /// entries also match inside longer words.
    #[test]
    fn unanchored_matching_hits_substrings_of_longer_words() {
        let filter = default_filter();
        let (out, detected) = filter.apply("somebadword1text").unwrap();
        assert_eq!(out, "some[REDACTED]text");
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].matched_text, "badword1");
    }
}
