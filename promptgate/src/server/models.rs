// promptgate/src/server/models.rs
//! Request/response schemas for the REST surface.

use std::collections::HashMap;

use promptgate_core::MemoryMatch;
use serde::{Deserialize, Serialize};

fn default_search_limit() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    pub text: String,
    pub collection: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub collection: String,
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct FunctionInput {
    pub function_name: String,
    pub plugin_name: String,
    pub prompt: String,
    pub input_text: String,
    #[serde(default)]
    pub parameters: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub target_language: String,
}

#[derive(Debug, Deserialize)]
pub struct WeatherRequest {
    /// Free-text weather question; the city is extracted by the LLM.
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub text: String,
    /// Filter toggles by name ("pii", "profanity", "logging"); absent keys
    /// default to enabled, unknown keys are rejected.
    #[serde(default)]
    pub filters: HashMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: String,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct AddMemoryResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<MemoryMatch>,
    pub synthesized_response: String,
}

#[derive(Debug, Serialize)]
pub struct CollectionsResponse {
    pub collections: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FunctionResponse {
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct TranslationResponse {
    pub translated_text: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// A weather answer, or the structured "could not determine city" payload.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WeatherResponse {
    Report {
        current_weather: String,
        forecast: String,
        assistant_response: String,
        debug_logs: Vec<String>,
    },
    UnknownCity {
        error: String,
        example_queries: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct FilterResponse {
    /// Human-readable "Detected and redacted" summary of the input phase,
    /// absent when nothing fired.
    pub input_processing: Option<String>,
    /// The (redacted) pipeline result.
    pub output_processing: String,
    /// Diagnostic event lines, empty when the logging toggle is off.
    pub logs: Vec<String>,
}
