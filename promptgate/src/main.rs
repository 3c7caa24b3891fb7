// promptgate/src/main.rs
//! Binary entry point: parses the CLI, wires the service graph, and serves
//! the demo API.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{debug, LevelFilter};

use promptgate::cli::Cli;
use promptgate::logger::init_logger;
use promptgate::openai::{OpenAiClient, OpenAiConfig};
use promptgate::server::{seed_memory, serve, AppState};
use promptgate::settings::Settings;

use promptgate_core::{
    merge_rules, ChatCompletion, EmbeddingGenerator, FilterConfig, SemanticMemory,
    VolatileMemoryStore, WeatherPlugin,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        Some(LevelFilter::Debug)
    } else if cli.quiet {
        Some(LevelFilter::Error)
    } else {
        None
    };
    init_logger(level);

    let settings = Settings::from_env()?;

    let default_config = FilterConfig::load_default_rules()?;
    let user_config = match &cli.config {
        Some(path) => {
            debug!("Loading custom filter configuration from {}", path.display());
            Some(FilterConfig::load_from_file(path)?)
        }
        None => None,
    };
    let filter_config = merge_rules(default_config, user_config);

    let client = Arc::new(OpenAiClient::new(OpenAiConfig::from(&settings))?);
    let chat: Arc<dyn ChatCompletion> = client.clone();
    let embeddings: Arc<dyn EmbeddingGenerator> = client;

    let memory: Arc<dyn SemanticMemory> = Arc::new(VolatileMemoryStore::new(embeddings));
    seed_memory(memory.as_ref()).await?;

    let state = AppState {
        chat,
        memory,
        filter_config: Arc::new(filter_config),
        weather: WeatherPlugin::new(),
    };

    serve(state, &cli.host, cli.port).await
}
