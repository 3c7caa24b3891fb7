// promptgate/src/server/handlers.rs
//! Request handlers. Each handler wires a per-request kernel from the shared
//! state, runs the invocation, and serializes the outcome.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use log::info;
use uuid::Uuid;

use promptgate_core::{
    build_content_filters, ChatCompletion, InvocationLogFilter, Kernel, KernelArguments,
    KernelFunction, INPUT_FILTER_MARKER,
};

use super::models::{
    AddMemoryResponse, CollectionsResponse, FilterRequest, FilterResponse, FunctionInput,
    FunctionResponse, MemoryItem, SearchQuery, SearchResponse, StatusResponse, SummarizeRequest,
    SummaryResponse, TranslationRequest, TranslationResponse, WeatherRequest, WeatherResponse,
};
use super::{ApiError, AppState};

const RAG_PROMPT: &str = "Assistant can have a conversation about any topic.\n\n\
Here is some background information that might help answer the user's question:\n\
{{$background}}\n\n\
User: {{$user_query}}\n\
Assistant:";

const CITY_EXTRACTION_PROMPT: &str = "Extract the city name from the following weather query. \
If multiple cities are mentioned, focus on the first one.\n\
If no city is explicitly mentioned, respond with \"unknown\".\n\
Query: {{$input}}\n\
City:";

const WEATHER_ANSWER_PROMPT: &str = "You are a helpful weather assistant.\n\
Current conditions: {{$current_weather}}\n\
Forecast: {{$forecast}}\n\n\
Answer the user's question using the data above.\n\
User: {{$input}}\n\
Assistant:";

const TRANSLATE_PROMPT: &str = "{{$input}}\n\nTranslate this into {{$target_language}}:";

const SUMMARIZE_PROMPT: &str = "{{$input}}\n\nTL;DR in one sentence:";

fn input_args(text: &str) -> KernelArguments {
    let mut args = KernelArguments::new();
    args.insert("input".to_string(), text.to_string());
    args
}

/// Per-request kernel with the invocation logging interceptor registered
/// outermost, so every function run leaves its invoking/invoked lines in the
/// outcome's events.
fn logged_kernel(chat: Arc<dyn ChatCompletion>) -> Kernel {
    let mut kernel = Kernel::new(chat);
    kernel.add_filter(Arc::new(InvocationLogFilter));
    kernel
}

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "PromptGate demo API is running".to_string(),
        time: Utc::now().to_rfc3339(),
    })
}

/// `POST /filters/process`: runs the echo template through the selected
/// content filters and reports what was detected and redacted.
pub async fn process_with_filters(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> Result<Json<FilterResponse>, ApiError> {
    // Malformed selections (unknown filter names) fail here, before any
    // chain is built.
    let (pre, post) = build_content_filters(&state.filter_config, &request.filters)?;

    let mut kernel = logged_kernel(state.chat.clone());
    for filter in pre.into_iter().chain(post) {
        kernel.add_filter(filter);
    }

    let request_id = Uuid::new_v4();
    info!("Processing text via kernel function with filters (request {request_id})");

    let echo = KernelFunction::new("FiltersDemo", "process_text", "{{$input}}");
    let outcome = kernel.invoke(&echo, &input_args(&request.text)).await?;

    let input_processing: Vec<String> = outcome
        .events
        .iter()
        .filter_map(|line| {
            line.split_once(INPUT_FILTER_MARKER)
                .map(|(_, item)| item.trim().to_string())
        })
        .collect();

    let logging = request.filters.get("logging").copied().unwrap_or(true);

    Ok(Json(FilterResponse {
        input_processing: if input_processing.is_empty() {
            None
        } else {
            Some(format!("Detected and redacted:\n{}", input_processing.join("\n")))
        },
        output_processing: outcome.result_text,
        logs: if logging { outcome.events } else { Vec::new() },
    }))
}

pub async fn add_to_memory(
    State(state): State<AppState>,
    Json(item): Json<MemoryItem>,
) -> Result<Json<AddMemoryResponse>, ApiError> {
    state
        .memory
        .save_information(&item.collection, &item.id, &item.text)
        .await?;
    Ok(Json(AddMemoryResponse {
        status: "success".to_string(),
        message: format!("Added item {} to collection {}", item.id, item.collection),
    }))
}

/// `POST /memory/search`: ranked matches plus an LLM-synthesized answer
/// grounded in the retrieved facts.
pub async fn search_memory(
    State(state): State<AppState>,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let results = state
        .memory
        .search(&query.collection, &query.query, query.limit)
        .await?;

    let mut synthesized_response = String::new();
    if !results.is_empty() {
        let background = results
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let rag_function = KernelFunction::new("MemoryPlugin", "rag_response", RAG_PROMPT);
        let mut args = KernelArguments::new();
        args.insert("background".to_string(), background);
        args.insert("user_query".to_string(), query.query.clone());

        let kernel = logged_kernel(state.chat.clone());
        synthesized_response = kernel.invoke(&rag_function, &args).await?.result_text;
    }

    Ok(Json(SearchResponse {
        results,
        synthesized_response,
    }))
}

pub async fn get_collections(
    State(state): State<AppState>,
) -> Result<Json<CollectionsResponse>, ApiError> {
    Ok(Json(CollectionsResponse {
        collections: state.memory.collections().await,
    }))
}

/// `POST /functions/semantic`: invokes an ad-hoc prompt-templated function.
pub async fn invoke_semantic_function(
    State(state): State<AppState>,
    Json(data): Json<FunctionInput>,
) -> Result<Json<FunctionResponse>, ApiError> {
    let function = KernelFunction::new(&data.plugin_name, &data.function_name, &data.prompt)
        .with_max_tokens(500);

    let mut args = data.parameters.clone().unwrap_or_default();
    args.insert("input".to_string(), data.input_text.clone());

    let kernel = logged_kernel(state.chat.clone());
    let outcome = kernel.invoke(&function, &args).await?;

    Ok(Json(FunctionResponse {
        result: outcome.result_text,
    }))
}

pub async fn translate_text(
    State(state): State<AppState>,
    Json(request): Json<TranslationRequest>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let translate_fn =
        KernelFunction::new("Translator", "translator", TRANSLATE_PROMPT).with_max_tokens(500);

    let mut args = input_args(&request.text);
    args.insert("target_language".to_string(), request.target_language.clone());

    let kernel = logged_kernel(state.chat.clone());
    let outcome = kernel.invoke(&translate_fn, &args).await?;

    Ok(Json(TranslationResponse {
        translated_text: outcome.result_text,
    }))
}

/// `POST /weather`: extracts the city with a prompt function, looks up the
/// simulated data, and lets the LLM phrase the final answer.
pub async fn get_weather(
    State(state): State<AppState>,
    Json(request): Json<WeatherRequest>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let kernel = logged_kernel(state.chat.clone());

    let extract_fn =
        KernelFunction::new("WeatherQueryProcessor", "process_query", CITY_EXTRACTION_PROMPT);
    let extraction = kernel.invoke(&extract_fn, &input_args(&request.query)).await?;
    let city = extraction.result_text.trim().to_lowercase();

    if city == "unknown" {
        return Ok(Json(WeatherResponse::UnknownCity {
            error: "Could not determine the city from your query. Please include a city name in your question."
                .to_string(),
            example_queries: vec![
                "What's the weather like in New York?".to_string(),
                "Will it rain tomorrow in London?".to_string(),
                "Tell me about the forecast for Tokyo".to_string(),
            ],
        }));
    }

    let current_weather = state.weather.current_weather(&city);
    let forecast = state.weather.forecast(&city);

    let answer_fn = KernelFunction::new("Weather", "respond", WEATHER_ANSWER_PROMPT);
    let mut args = input_args(&request.query);
    args.insert("current_weather".to_string(), current_weather.clone());
    args.insert("forecast".to_string(), forecast.clone());
    let answer = kernel.invoke(&answer_fn, &args).await?;

    let mut debug_logs = extraction.events;
    debug_logs.extend(answer.events.iter().cloned());

    Ok(Json(WeatherResponse::Report {
        current_weather,
        forecast,
        assistant_response: answer.result_text,
        debug_logs,
    }))
}

pub async fn summarize_text(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summarize_fn =
        KernelFunction::new("Summarizer", "tldr", SUMMARIZE_PROMPT).with_max_tokens(100);

    let kernel = logged_kernel(state.chat.clone());
    let outcome = kernel.invoke(&summarize_fn, &input_args(&request.text)).await?;

    Ok(Json(SummaryResponse {
        summary: outcome.result_text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use promptgate_core::{
        ChatCompletion, ChatRequest, CoreError, EmbeddingGenerator, FilterConfig, VolatileMemoryStore,
        WeatherPlugin,
    };

    /// Chat stub: echoes the prompt back, or answers a canned city for the
    /// extraction template.
    struct StubChat;

    #[async_trait]
    impl ChatCompletion for StubChat {
        async fn complete(&self, request: ChatRequest) -> Result<String, CoreError> {
            let prompt = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            if prompt.contains("Extract the city name") {
                if prompt.to_lowercase().contains("london") {
                    Ok("London".to_string())
                } else {
                    Ok("unknown".to_string())
                }
            } else {
                Ok(prompt)
            }
        }
    }

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingGenerator for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, CoreError> {
            // Bag-of-bytes vector: deterministic and query-correlated enough
            // for ranking tests.
            let mut v = vec![0.0f32; 26];
            for b in text.to_lowercase().bytes().filter(|b| b.is_ascii_lowercase()) {
                v[(b - b'a') as usize] += 1.0;
            }
            Ok(v)
        }
    }

    fn state() -> AppState {
        AppState {
            chat: Arc::new(StubChat),
            memory: Arc::new(VolatileMemoryStore::new(Arc::new(StubEmbedder))),
            filter_config: Arc::new(FilterConfig::load_default_rules().unwrap()),
            weather: WeatherPlugin::new(),
        }
    }

    #[tokio::test]
    async fn filters_endpoint_redacts_and_reports() {
        let state = state();
        let request = FilterRequest {
            text: "My SSN is 123-45-6789".to_string(),
            filters: HashMap::new(),
        };

        let Json(response) = process_with_filters(State(state), Json(request)).await.unwrap();
        assert_eq!(response.output_processing, "My SSN is [REDACTED SSN]");
        let summary = response.input_processing.expect("detections were made");
        assert!(summary.starts_with("Detected and redacted:"));
        assert!(summary.contains("ssn: 123-45-6789"));
        assert!(!response.logs.is_empty());
    }

    #[tokio::test]
    async fn filters_endpoint_honors_logging_toggle() {
        let state = state();
        let mut filters = HashMap::new();
        filters.insert("logging".to_string(), false);
        let request = FilterRequest {
            text: "nothing sensitive".to_string(),
            filters,
        };

        let Json(response) = process_with_filters(State(state), Json(request)).await.unwrap();
        assert!(response.input_processing.is_none());
        assert!(response.logs.is_empty());
    }

    #[tokio::test]
    async fn filters_endpoint_rejects_unknown_filter_names() {
        let state = state();
        let mut filters = HashMap::new();
        filters.insert("telemetry".to_string(), true);
        let request = FilterRequest {
            text: "hello".to_string(),
            filters,
        };

        let result = process_with_filters(State(state), Json(request)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn memory_roundtrip_ranks_and_synthesizes() {
        let state = state();
        super::super::seed_memory(state.memory.as_ref()).await.unwrap();

        let Json(response) = search_memory(
            State(state),
            Json(SearchQuery {
                collection: "finance".to_string(),
                query: "what is my budget for 2024".to_string(),
                limit: 2,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.results.len(), 2);
        assert!(!response.synthesized_response.is_empty());
        assert!(response
            .synthesized_response
            .contains("what is my budget for 2024"));
    }

    #[tokio::test]
    async fn weather_endpoint_reports_known_city() {
        let state = state();
        let Json(response) = get_weather(
            State(state),
            Json(WeatherRequest {
                query: "What's the weather like in London?".to_string(),
            }),
        )
        .await
        .unwrap();

        match response {
            WeatherResponse::Report {
                current_weather,
                forecast,
                assistant_response,
                ..
            } => {
                assert!(current_weather.contains("Cloudy"));
                assert!(forecast.contains("showers"));
                assert!(assistant_response.contains("Cloudy"));
            }
            WeatherResponse::UnknownCity { .. } => panic!("expected a weather report"),
        }
    }

    #[tokio::test]
    async fn weather_debug_logs_carry_invocation_events() {
        let state = state();
        let Json(response) = get_weather(
            State(state),
            Json(WeatherRequest {
                query: "What's the weather like in London?".to_string(),
            }),
        )
        .await
        .unwrap();

        match response {
            WeatherResponse::Report { debug_logs, .. } => {
                assert!(!debug_logs.is_empty());
                assert!(debug_logs
                    .iter()
                    .any(|l| l.contains("FunctionInvoking - WeatherQueryProcessor.process_query")));
                assert!(debug_logs
                    .iter()
                    .any(|l| l.contains("FunctionInvoked - Weather.respond (")));
            }
            WeatherResponse::UnknownCity { .. } => panic!("expected a weather report"),
        }
    }

    #[tokio::test]
    async fn weather_endpoint_falls_back_on_unknown_city() {
        let state = state();
        let Json(response) = get_weather(
            State(state),
            Json(WeatherRequest {
                query: "Will it rain?".to_string(),
            }),
        )
        .await
        .unwrap();

        match response {
            WeatherResponse::UnknownCity { error, example_queries } => {
                assert!(error.contains("Could not determine the city"));
                assert_eq!(example_queries.len(), 3);
            }
            WeatherResponse::Report { .. } => panic!("expected the unknown-city payload"),
        }
    }

    #[tokio::test]
    async fn translate_renders_prompt_with_target_language() {
        let state = state();
        let Json(response) = translate_text(
            State(state),
            Json(TranslationRequest {
                text: "good morning".to_string(),
                target_language: "French".to_string(),
            }),
        )
        .await
        .unwrap();

        // The stub echoes the rendered prompt, proving substitution happened.
        assert!(response.translated_text.contains("good morning"));
        assert!(response.translated_text.contains("Translate this into French:"));
    }
}
