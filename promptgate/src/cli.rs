// promptgate/src/cli.rs
//! This file defines the command-line interface (CLI) for the promptgate
//! server binary.
//! License: MIT OR Apache-2.0

use clap::Parser;
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "promptgate",
    author = "PromptGate contributors",
    version = env!("CARGO_PKG_VERSION"),
    about = "Content-filtered LLM demo backend",
    long_about = "PromptGate serves a set of demo endpoints around a prompt-templated LLM kernel: content-filtered text processing, volatile semantic memory, translation and summarization functions, and a simulated weather plugin. All generation and embedding work is delegated to a hosted OpenAI-compatible service configured via the environment."
)]
pub struct Cli {
    /// Host interface to bind the HTTP server to.
    #[arg(long, env = "PROMPTGATE_HOST", default_value = "127.0.0.1", help = "Host interface to bind to.")]
    pub host: String,

    /// TCP port to listen on.
    #[arg(long, short = 'p', env = "PROMPTGATE_PORT", default_value_t = 8000, help = "TCP port to listen on.")]
    pub port: u16,

    /// Path to a custom filter rule configuration file (YAML), merged over
    /// the embedded defaults.
    #[arg(long = "config", value_name = "FILE", help = "Path to a custom filter rule configuration file (YAML).")]
    pub config: Option<PathBuf>,

    /// Disable informational messages
    #[arg(long, short = 'q', help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG for this process to DEBUG)
    #[arg(long, short = 'd', help = "Enable debug logging.")]
    pub debug: bool,
}
