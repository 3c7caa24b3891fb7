// promptgate-core/src/filters/redaction.rs
//! The redaction filter: scans text against the compiled rule set and
//! replaces sensitive matches with fixed redaction tags.
//!
//! License: MIT OR APACHE 2.0

use std::sync::Arc;

use crate::config::FilterConfig;
use crate::detection::{log_detection_debug, Detection};
use crate::errors::CoreError;
use crate::filters::compiler::{get_or_compile_rules, CompiledRules};

/// Applies the configured redaction rules to text.
///
/// Replacement is a literal whole-text substring replacement of each matched
/// text, not position-based splicing. If the same matched substring recurs
/// verbatim elsewhere in the text, those occurrences are redacted too. That
/// recurrence behavior is intended and covered by tests; do not switch to
/// span-indexed replacement without changing the documented contract.
#[derive(Debug, Clone)]
pub struct RedactionFilter {
    compiled: Arc<CompiledRules>,
}

impl RedactionFilter {
    /// Builds a filter from a `FilterConfig`, compiling (or reusing cached)
    /// rules. Malformed rules fail here, at construction time.
    pub fn new(config: &FilterConfig) -> Result<Self, CoreError> {
        let compiled = get_or_compile_rules(config)
            .map_err(|e| CoreError::Fatal(format!("Failed to compile redaction rules: {e}")))?;
        Ok(Self { compiled })
    }

    pub fn from_compiled(compiled: Arc<CompiledRules>) -> Self {
        Self { compiled }
    }

    /// Redacts sensitive information from `text`.
    ///
    /// For each rule in declared order, all non-overlapping matches against a
    /// snapshot of the current text are collected; each match appends a
    /// [`Detection`] and replaces every verbatim occurrence of the matched
    /// text with the rule's redaction tag. Later rules scan the already
    /// partially redacted text, so on a contested span the later rule's tag
    /// wins.
    ///
    /// Empty or match-free text is returned unchanged with no detections.
    pub fn apply(&self, text: &str) -> Result<(String, Vec<Detection>), CoreError> {
        let mut result = text.to_string();
        let mut detected = Vec::new();

        for rule in &self.compiled.rules {
            let snapshot = result.clone();
            for m in rule.regex.find_iter(&snapshot) {
                log_detection_debug(module_path!(), &rule.name, m.as_str());
                detected.push(Detection::new(&rule.name, m.as_str()));
                result = result.replace(m.as_str(), &rule.replace_with);
            }
        }

        Ok((result, detected))
    }
}
