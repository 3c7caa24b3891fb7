// promptgate-core/src/filters/mod.rs
//! Content filters: rule compilation, pattern-based redaction, and the
//! word-list denylist.

pub mod compiler;
pub mod denylist;
pub mod redaction;

pub use compiler::{compile_rules, get_or_compile_rules, CompiledRule, CompiledRules};
pub use denylist::{DenylistFilter, DENYLIST_CATEGORY, DENYLIST_TAG};
pub use redaction::RedactionFilter;
