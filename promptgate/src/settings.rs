// promptgate/src/settings.rs
//! Environment-driven service settings.
//!
//! Credentials for the hosted OpenAI-compatible service come from the
//! environment (optionally via a `.env` file). Missing chat credentials fail
//! fast at startup rather than on the first request.

use anyhow::{Context, Result};
use log::debug;

/// Default embedding deployment when none is configured.
pub const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "text-embedding-ada-002";

/// Connection settings for the hosted generation/embedding service.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the OpenAI-compatible API.
    pub endpoint: String,
    pub api_key: String,
    /// Chat model/deployment name.
    pub deployment: String,
    /// Embedding model/deployment name.
    pub embedding_deployment: String,
}

impl Settings {
    /// Loads settings from the process environment, reading a `.env` file
    /// first if one is present.
    pub fn from_env() -> Result<Self> {
        if dotenvy::dotenv().is_ok() {
            debug!("Loaded environment overrides from .env file.");
        }

        let endpoint = std::env::var("AZURE_OPENAI_ENDPOINT")
            .context("AZURE_OPENAI_ENDPOINT is not set")?;
        let api_key =
            std::env::var("AZURE_OPENAI_API_KEY").context("AZURE_OPENAI_API_KEY is not set")?;
        let deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT")
            .context("AZURE_OPENAI_DEPLOYMENT is not set")?;
        let embedding_deployment = std::env::var("AZURE_OPENAI_EMBEDDING_DEPLOYMENT")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_DEPLOYMENT.to_string());

        Ok(Self {
            endpoint,
            api_key,
            deployment,
            embedding_deployment,
        })
    }
}
