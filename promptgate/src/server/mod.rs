// promptgate/src/server/mod.rs
//! The axum REST surface over the PromptGate kernel.
//!
//! All shared state lives in the explicit [`AppState`] value handed to the
//! router; there are no process-global services. Per-request kernels are
//! cheap to construct (the chat service and filter configuration sit behind
//! `Arc`s) and keep the filter chain scoped to one invocation.

pub mod handlers;
pub mod models;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use promptgate_core::{ChatCompletion, FilterConfig, SemanticMemory, WeatherPlugin};

/// Demo memory collections, seeded at startup.
pub const FINANCE_COLLECTION: &str = "finance";
pub const PERSONAL_COLLECTION: &str = "personal";
pub const WEATHER_COLLECTION: &str = "weather";

/// Everything a handler needs, wired explicitly at startup.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<dyn ChatCompletion>,
    pub memory: Arc<dyn SemanticMemory>,
    pub filter_config: Arc<FilterConfig>,
    pub weather: WeatherPlugin,
}

/// Maps handler failures to an HTTP 500 with a `detail` payload. Wrapped-call
/// faults (quota, network) arrive here unchanged from the pipeline.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/filters/process", post(handlers::process_with_filters))
        .route("/memory/add", post(handlers::add_to_memory))
        .route("/memory/search", post(handlers::search_memory))
        .route("/memory/collections", get(handlers::get_collections))
        .route("/functions/semantic", post(handlers::invoke_semantic_function))
        .route("/translate", post(handlers::translate_text))
        .route("/weather", post(handlers::get_weather))
        .route("/summarize", post(handlers::summarize_text))
        .layer(cors)
        .with_state(state)
}

/// Binds and serves the API until the process is stopped.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("PromptGate demo API listening on {addr}");
    axum::serve(listener, router(state)).await.context("Server error")?;
    Ok(())
}

/// Populates the demo collections with their initial facts.
pub async fn seed_memory(memory: &dyn SemanticMemory) -> Result<()> {
    let seeds: &[(&str, &str, &str)] = &[
        (FINANCE_COLLECTION, "budget", "Your budget for 2024 is $100,000"),
        (FINANCE_COLLECTION, "savings", "Your savings from 2023 are $50,000"),
        (FINANCE_COLLECTION, "investments", "Your investments are $80,000"),
        (PERSONAL_COLLECTION, "fact1", "John was born in Seattle in 1980"),
        (
            PERSONAL_COLLECTION,
            "fact2",
            "John graduated from University of Washington in 2002",
        ),
        (PERSONAL_COLLECTION, "fact3", "John has two children named Alex and Sam"),
        (
            WEATHER_COLLECTION,
            "fact1",
            "The weather in New York is typically hot and humid in summer",
        ),
        (WEATHER_COLLECTION, "fact2", "London often experiences rain throughout the year"),
        (WEATHER_COLLECTION, "fact3", "Tokyo has a rainy season in June and July"),
    ];

    for (collection, id, text) in seeds {
        memory
            .save_information(collection, id, text)
            .await
            .with_context(|| format!("Failed to seed memory item {collection}/{id}"))?;
    }

    info!("Seeded {} demo memory items.", seeds.len());
    Ok(())
}
