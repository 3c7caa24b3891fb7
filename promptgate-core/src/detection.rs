// promptgate-core/src/detection.rs
//! Detection records produced by the content filters, plus the diagnostic
//! log markers consumed by calling layers.

use serde::{Deserialize, Serialize};
use std::fmt;

use log::debug;
use once_cell::sync::Lazy;

/// Marker prefix for input-phase detection events. Callers parse diagnostic
/// lines textually, so this string must stay verbatim.
pub const INPUT_FILTER_MARKER: &str = "Input Filter - Detected";

/// Marker prefix for output-phase detection events. Same compatibility
/// constraint as [`INPUT_FILTER_MARKER`].
pub const OUTPUT_FILTER_MARKER: &str = "Output Filter - Detected";

/// A static boolean that is initialized once to determine if PII is allowed in debug logs.
static PII_DEBUG_ALLOWED: Lazy<bool> = Lazy::new(|| {
    std::env::var("PROMPTGATE_ALLOW_DEBUG_PII")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
});

/// A single instance of a pattern or denylist match.
///
/// Ordering of accumulated detections follows rule declaration order, then
/// left-to-right match order within the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Detection {
    /// The rule category that fired (e.g. "phone", "profanity").
    pub category: String,
    /// The literal text that matched.
    pub matched_text: String,
}

impl Detection {
    pub fn new(category: impl Into<String>, matched_text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            matched_text: matched_text.into(),
        }
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.matched_text)
    }
}

/// Joins detections into the comma-separated form used in diagnostic lines,
/// e.g. `"phone: 555-123-4567, email: a@b.com"`.
pub fn join_detections(detections: &[Detection]) -> String {
    detections
        .iter()
        .map(Detection::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    if s.len() <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", s.len())
    }
}

fn get_loggable_content(sensitive_content: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        sensitive_content.to_string()
    } else {
        redact_sensitive(sensitive_content)
    }
}

/// Debug-logs a single filter match without leaking PII unless the
/// `PROMPTGATE_ALLOW_DEBUG_PII` override is set.
pub fn log_detection_debug(module_path: &str, category: &str, matched_text: &str) {
    debug!(
        "{} Detection: Category='{}', Matched='{}'",
        module_path,
        category,
        get_loggable_content(matched_text)
    );
}
