// promptgate/src/lib.rs
//! # PromptGate Demo API
//!
//! This crate provides the REST surface for the PromptGate filter pipeline:
//! an axum router over an explicitly wired [`server::AppState`] (completion
//! service, embedding-backed volatile memory, filter configuration, and the
//! simulated weather plugin), plus the CLI and environment configuration for
//! the binary.

pub mod cli;
pub mod logger;
pub mod openai;
pub mod server;
pub mod settings;
