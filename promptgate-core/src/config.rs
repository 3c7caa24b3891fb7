//! Configuration management for `promptgate-core`.
//!
//! This module defines the core data structures for content filter rules and
//! the denylist. It handles serialization/deserialization of YAML
//! configurations and provides utilities for loading, merging, and validating
//! these configs.
//!
//! Rule declaration order is load-bearing: filters apply rules in the order
//! they appear in the configuration, and merging must never reorder them.
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Maximum allowed length for a regex pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// Represents a single content filter rule used by the redaction filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterRule {
    /// Unique category identifier for the rule (e.g., "credit_card").
    pub name: String,
    /// Human-readable description of what the rule targets.
    pub description: Option<String>,
    /// The regex pattern string.
    pub pattern: String,
    /// The redaction tag to replace matches with.
    pub replace_with: String,
    /// If true, the pattern matches case-insensitively (free-text categories
    /// such as email). Structured numeric patterns stay case-sensitive.
    pub case_insensitive: bool,
    /// If true, enables multiline mode for the regex engine.
    pub multiline: bool,
    /// If true, the dot character `.` in regex will match newlines.
    pub dot_matches_new_line: bool,
    /// Explicit override for enabling/disabling the rule.
    pub enabled: Option<bool>,
    /// Security severity level (e.g., "high", "medium").
    pub severity: Option<String>,
    /// Metadata tags for categorization.
    pub tags: Option<Vec<String>>,
}

impl Default for FilterRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            pattern: String::new(),
            replace_with: "[REDACTED]".to_string(),
            case_insensitive: false,
            multiline: false,
            dot_matches_new_line: false,
            enabled: None,
            severity: None,
            tags: None,
        }
    }
}

/// Represents the top-level filter configuration for PromptGate.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Regex-based redaction rules, in application order.
    pub rules: Vec<FilterRule>,
    /// Static denylist entries for the word-list filter.
    pub denylist: Vec<String>,
}

impl FilterConfig {
    /// Loads filter rules from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading custom filter rules from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: FilterConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_rules(&config.rules)?;
        info!("Loaded {} rules from file {}.", config.rules.len(), path.display());

        Ok(config)
    }

    /// Loads default filter rules from the embedded configuration.
    pub fn load_default_rules() -> Result<Self> {
        debug!("Loading default filter rules from embedded string...");
        let default_yaml = include_str!("../config/default_filters.yaml");
        let config: FilterConfig =
            serde_yml::from_str(default_yaml).context("Failed to parse default filter rules")?;

        debug!("Loaded {} default rules.", config.rules.len());
        Ok(config)
    }

    /// Filters active rules based on enable/disable lists.
    ///
    /// Relative order of the surviving rules is preserved.
    pub fn set_active_rules(&mut self, enable_rules: &[String], disable_rules: &[String]) {
        let enable_set: HashSet<&str> = enable_rules.iter().map(String::as_str).collect();
        let disable_set: HashSet<&str> = disable_rules.iter().map(String::as_str).collect();

        debug!("Initial rules count before filtering: {}", self.rules.len());

        let all_rule_names: HashSet<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();

        for rule_name in enable_set.difference(&all_rule_names) {
            warn!("Rule '{}' in `enable_rules` list does not exist.", rule_name);
        }

        for rule_name in disable_set.difference(&all_rule_names) {
            warn!("Rule '{}' in `disable_rules` list does not exist.", rule_name);
        }

        self.rules.retain(|rule| {
            let rule_name_str = rule.name.as_str();
            !disable_set.contains(rule_name_str)
                && (rule.enabled != Some(false) || enable_set.contains(rule_name_str))
        });

        debug!("Final active rules count after filtering: {}", self.rules.len());
    }
}

/// Merges user-defined rules and denylist entries with defaults.
///
/// A user rule with the same name replaces the default in place; new user
/// rules are appended after the defaults in their own declared order. This
/// keeps the application order stable, unlike a map-based merge.
pub fn merge_rules(default_config: FilterConfig, user_config: Option<FilterConfig>) -> FilterConfig {
    debug!(
        "merge_rules called. Initial default rules count: {}",
        default_config.rules.len()
    );

    let mut final_rules = default_config.rules;
    let mut final_denylist = default_config.denylist;

    if let Some(user_cfg) = user_config {
        debug!("User config provided. Merging {} user rules.", user_cfg.rules.len());
        for user_rule in user_cfg.rules {
            match final_rules.iter_mut().find(|r| r.name == user_rule.name) {
                Some(existing) => *existing = user_rule,
                None => final_rules.push(user_rule),
            }
        }

        for entry in user_cfg.denylist {
            if !final_denylist.iter().any(|e| e.eq_ignore_ascii_case(&entry)) {
                final_denylist.push(entry);
            }
        }
    }

    debug!("Final total rules after merge: {}", final_rules.len());

    FilterConfig {
        rules: final_rules,
        denylist: final_denylist,
    }
}

/// Validates rule integrity (names, regex compilation, pattern length).
///
/// Malformed configuration fails fast here, before any chain construction.
pub fn validate_rules(rules: &[FilterRule]) -> Result<()> {
    let mut rule_names = HashSet::new();
    let mut errors = Vec::new();

    for rule in rules {
        if rule.name.is_empty() {
            errors.push("A rule has an empty `name` field.".to_string());
        } else if !rule_names.insert(rule.name.clone()) {
            errors.push(format!("Duplicate rule name found: '{}'.", rule.name));
        }

        if rule.pattern.is_empty() {
            errors.push(format!("Rule '{}' has an empty `pattern` field.", rule.name));
            continue;
        }

        if rule.pattern.len() > MAX_PATTERN_LENGTH {
            errors.push(format!(
                "Rule '{}': pattern length ({}) exceeds maximum allowed ({}).",
                rule.name,
                rule.pattern.len(),
                MAX_PATTERN_LENGTH
            ));
            continue;
        }

        if let Err(e) = Regex::new(&rule.pattern) {
            errors.push(format!("Rule '{}' has an invalid regex pattern: {}", rule.name, e));
        }
    }

    if !errors.is_empty() {
        let full_error_message = format!("Rule validation failed:\n{}", errors.join("\n"));
        Err(anyhow!(full_error_message))
    } else {
        Ok(())
    }
}
