// promptgate-core/src/lib.rs
//! # PromptGate Core Library
//!
//! `promptgate-core` provides the platform-independent logic for content
//! filtering around templated LLM function invocation. It defines the data
//! structures for filter rules, compiles them into efficient matchers, and
//! implements the continuation-passing filter pipeline that wraps every
//! invocation with pre- and post-processing interceptors.
//!
//! The substantive computation (text generation, tool-call decisions,
//! embedding and relevance ranking) is delegated to external collaborators
//! behind the [`ChatCompletion`] and [`EmbeddingGenerator`] traits; this
//! crate only inspects and rewrites the text flowing in and out of them.
//!
//! ## Modules
//!
//! * `config`: Defines `FilterRule`s and `FilterConfig` for specifying sensitive patterns.
//! * `filters`: Rule compilation plus the redaction and denylist filters.
//! * `detection`: Detection records and the diagnostic log markers.
//! * `pipeline`: The `InvocationFilter` chain, `FilterContext`, and `run_pipeline`.
//! * `kernel`: Prompt-templated function invocation wrapped by the pipeline.
//! * `services`: Collaborator trait boundaries for generation and embeddings.
//! * `memory`: The volatile semantic memory store.
//! * `plugins`: Simulated data providers (weather).
//!
//! ## Usage Example
//!
//! ```rust
//! use promptgate_core::{FilterConfig, RedactionFilter};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let config = FilterConfig::load_default_rules()?;
//!     let filter = RedactionFilter::new(&config)?;
//!
//!     let (redacted, detections) = filter.apply("Call 555-123-4567 now")?;
//!     assert_eq!(redacted, "Call [REDACTED PHONE] now");
//!     assert_eq!(detections[0].to_string(), "phone: 555-123-4567");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! The library uses `anyhow::Error` for configuration loading and defines
//! the structured [`CoreError`] enum for pipeline and service faults. Filter
//! construction fails fast on malformed configuration; faults inside a
//! filter's own transformation degrade to a logged no-op rather than
//! aborting the wrapped call.
//!
//! ## Design Principles
//!
//! * **Explicit wiring:** kernels, chains, and stores are plain values built
//!   from configuration and passed by reference; no global singletons.
//! * **Synchronous chain:** the filter chain is deterministic and CPU-only;
//!   the only suspension points are the external service calls.
//! * **Stateless filters:** filters share nothing across requests beyond the
//!   read-only compiled rule tables.
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod config;
pub mod detection;
pub mod errors;
pub mod filters;
pub mod kernel;
pub mod memory;
pub mod pipeline;
pub mod plugins;
pub mod services;

/// Re-exports the public configuration types and functions for managing filter rules.
pub use config::{merge_rules, validate_rules, FilterConfig, FilterRule, MAX_PATTERN_LENGTH};

/// Re-exports the custom error type for clear error reporting.
pub use errors::CoreError;

/// Re-exports detection records and the verbatim diagnostic markers.
pub use detection::{
    join_detections, redact_sensitive, Detection, INPUT_FILTER_MARKER, OUTPUT_FILTER_MARKER,
};

/// Re-exports the content filters and compiled rule types.
pub use filters::{
    compile_rules, DenylistFilter, RedactionFilter, CompiledRule, CompiledRules, DENYLIST_CATEGORY,
    DENYLIST_TAG,
};

/// Re-exports the pipeline contract.
pub use pipeline::{
    build_content_filters, run_pipeline, FilterChain, FilterContext, InputContentFilter,
    InvocationFilter, InvocationLogFilter, Next, OutputContentFilter, PipelineOutcome,
    WrappedCall,
};

/// Re-exports templated invocation types.
pub use kernel::{Kernel, KernelArguments, KernelFunction};

/// Re-exports the collaborator service boundaries.
pub use services::{ChatCompletion, ChatMessage, ChatRequest, EmbeddingGenerator, ToolSpec};

/// Re-exports the volatile semantic memory store.
pub use memory::{MemoryMatch, SemanticMemory, VolatileMemoryStore};

/// Re-exports the simulated plugins.
pub use plugins::WeatherPlugin;
