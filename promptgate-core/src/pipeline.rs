// promptgate-core/src/pipeline.rs
//! The invocation filter pipeline.
//!
//! A unit of work (one templated text-generation or tool invocation) is
//! wrapped by an ordered chain of interceptors. Each interceptor receives the
//! mutable [`FilterContext`] plus a [`Next`] continuation and must invoke
//! that continuation exactly once; pre-phase work happens before the
//! `next.run(...)` call, post-phase work after it returns. The chain itself
//! is synchronous and CPU-only; the only suspension point is the wrapped
//! call's own await.
//!
//! Failure semantics:
//! * errors from the wrapped call propagate unchanged through post-phase
//!   interceptors (they observe successful completions only);
//! * faults inside a filter's own transformation are caught at the filter
//!   boundary, logged, and degrade to a no-op for that filter;
//! * a chain whose call never ran surfaces as [`CoreError::CallDropped`].
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};

use crate::config::FilterConfig;
use crate::detection::{join_detections, Detection, INPUT_FILTER_MARKER, OUTPUT_FILTER_MARKER};
use crate::errors::CoreError;
use crate::filters::{DenylistFilter, RedactionFilter};

/// The mutable unit passed through the chain for one invocation.
///
/// Holds the current text payload (input, then output), the detections
/// accumulated so far, and an ordered diagnostic event sink. It exists only
/// for the duration of one invocation and is never persisted.
#[derive(Debug, Default)]
pub struct FilterContext {
    pub plugin_name: String,
    pub function_name: String,
    /// The current input payload. Pre-phase interceptors must replace this
    /// with the fully redacted text before invoking the continuation; the
    /// wrapped call only ever sees the redacted input.
    pub input: String,
    /// The wrapped call's output, once produced.
    pub result: Option<String>,
    pub input_detections: Vec<Detection>,
    pub output_detections: Vec<Detection>,
    /// The un-redacted output, retained for diagnostics only. Never
    /// re-exposed to the caller as the primary result.
    pub original_output: Option<String>,
    /// Wall-clock duration of the wrapped call's execution window.
    pub elapsed: Option<Duration>,
    /// Ordered diagnostic lines recorded during this invocation.
    pub events: Vec<String>,
}

impl FilterContext {
    pub fn new(plugin_name: &str, function_name: &str, input: &str) -> Self {
        Self {
            plugin_name: plugin_name.to_string(),
            function_name: function_name.to_string(),
            input: input.to_string(),
            ..Default::default()
        }
    }

    /// Records a diagnostic line into the per-invocation sink and mirrors it
    /// to the `log` facade at info level.
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.events.push(format!(
            "{} - INFO - {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            message
        ));
    }

    /// `Plugin.function` label used in diagnostic lines.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.plugin_name, self.function_name)
    }
}

/// The externally delegated unit of work the pipeline surrounds.
///
/// Implementations read `ctx.input` and must set `ctx.result` on success.
#[async_trait]
pub trait WrappedCall: Send + Sync {
    async fn invoke(&self, ctx: &mut FilterContext) -> Result<(), CoreError>;
}

/// An interceptor in the chain.
///
/// Implementations must invoke `next.run(ctx)` exactly once. Skipping the
/// continuation silently drops the wrapped call, which the pipeline reports
/// as [`CoreError::CallDropped`].
#[async_trait]
pub trait InvocationFilter: Send + Sync + std::fmt::Debug {
    async fn invoke(&self, ctx: &mut FilterContext, next: Next<'_>) -> Result<(), CoreError>;
}

/// The continuation handed to each interceptor: the remaining chain plus the
/// wrapped call at the end of it.
pub struct Next<'a> {
    chain: &'a [Arc<dyn InvocationFilter>],
    call: &'a dyn WrappedCall,
}

impl<'a> Next<'a> {
    /// Runs the rest of the chain, then the wrapped call.
    pub fn run<'c>(
        self,
        ctx: &'c mut FilterContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'c>>
    where
        'a: 'c,
    {
        Box::pin(async move {
            match self.chain.split_first() {
                Some((head, rest)) => {
                    head.invoke(
                        ctx,
                        Next {
                            chain: rest,
                            call: self.call,
                        },
                    )
                    .await
                }
                None => self.call.invoke(ctx).await,
            }
        })
    }
}

/// An ordered chain of interceptors. Interceptors run in registration order;
/// the first registered is outermost.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn InvocationFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, filter: Arc<dyn InvocationFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Executes the chain around `call`, mutating `ctx` in place.
    pub async fn execute(
        &self,
        ctx: &mut FilterContext,
        call: &dyn WrappedCall,
    ) -> Result<(), CoreError> {
        Next {
            chain: &self.filters,
            call,
        }
        .run(ctx)
        .await
    }
}

/// Diagnostic interceptor: records a line when the wrapped function starts
/// and another with its duration when the continuation returns.
///
/// Register outermost so the recorded window covers the whole chain below
/// it, matching what a request-level log capture would see.
#[derive(Debug)]
pub struct InvocationLogFilter;

#[async_trait]
impl InvocationFilter for InvocationLogFilter {
    async fn invoke(&self, ctx: &mut FilterContext, next: Next<'_>) -> Result<(), CoreError> {
        let qualified = ctx.qualified_name();
        ctx.record(format!("FunctionInvoking - {qualified}"));

        let start = Instant::now();
        next.run(ctx).await?;
        let duration = start.elapsed();

        ctx.record(format!(
            "FunctionInvoked - {qualified} ({:.3}s)",
            duration.as_secs_f64()
        ));
        Ok(())
    }
}

/// Pre-phase interceptor: redacts the caller-supplied input before the
/// wrapped call ever sees it.
#[derive(Debug)]
pub struct InputContentFilter {
    redaction: RedactionFilter,
    denylist: DenylistFilter,
}

impl InputContentFilter {
    pub fn new(config: &FilterConfig) -> Result<Self, CoreError> {
        Ok(Self {
            redaction: RedactionFilter::new(config)?,
            denylist: DenylistFilter::new(config)?,
        })
    }
}

#[async_trait]
impl InvocationFilter for InputContentFilter {
    async fn invoke(&self, ctx: &mut FilterContext, next: Next<'_>) -> Result<(), CoreError> {
        ctx.record(format!(
            "Input Filter - Processing input for {}",
            ctx.qualified_name()
        ));

        // Content redaction first, then the denylist over the already
        // redacted text. A fault in either filter keeps the last-known-good
        // text and continues the chain.
        let mut filtered = ctx.input.clone();
        match self.redaction.apply(&filtered) {
            Ok((text, detected)) => {
                if !detected.is_empty() {
                    ctx.record(format!(
                        "{} sensitive information: {}",
                        INPUT_FILTER_MARKER,
                        join_detections(&detected)
                    ));
                }
                filtered = text;
                ctx.input_detections.extend(detected);
            }
            Err(e) => warn!("Input redaction filter fault, continuing unfiltered: {e}"),
        }

        match self.denylist.apply(&filtered) {
            Ok((text, detected)) => {
                if !detected.is_empty() {
                    ctx.record(format!(
                        "{} profanity: {}",
                        INPUT_FILTER_MARKER,
                        join_detections(&detected)
                    ));
                }
                filtered = text;
                ctx.input_detections.extend(detected);
            }
            Err(e) => warn!("Input denylist filter fault, continuing unfiltered: {e}"),
        }

        // The continuation must only ever observe the redacted input.
        ctx.input = filtered;

        next.run(ctx).await
    }
}

/// Post-phase interceptor: times the continuation, then redacts the result.
///
/// Register this innermost (after any pre-phase interceptors) so the measured
/// window covers only the wrapped call, not pre/post filter overhead.
#[derive(Debug)]
pub struct OutputContentFilter {
    redaction: RedactionFilter,
}

impl OutputContentFilter {
    pub fn new(config: &FilterConfig) -> Result<Self, CoreError> {
        Ok(Self {
            redaction: RedactionFilter::new(config)?,
        })
    }
}

#[async_trait]
impl InvocationFilter for OutputContentFilter {
    async fn invoke(&self, ctx: &mut FilterContext, next: Next<'_>) -> Result<(), CoreError> {
        let start = Instant::now();
        // Wrapped-call failures propagate unchanged; nothing below runs.
        next.run(ctx).await?;
        let elapsed = start.elapsed();
        ctx.elapsed = Some(elapsed);

        ctx.record(format!(
            "Output Filter - Function {} executed in {:.4}s",
            ctx.qualified_name(),
            elapsed.as_secs_f64()
        ));

        let Some(result) = ctx.result.clone() else {
            return Ok(());
        };

        ctx.record(format!(
            "Output Filter - Processing result for {}",
            ctx.qualified_name()
        ));

        match self.redaction.apply(&result) {
            Ok((filtered, detected)) => {
                if !detected.is_empty() {
                    ctx.record(format!(
                        "{} sensitive information in output: {}",
                        OUTPUT_FILTER_MARKER,
                        join_detections(&detected)
                    ));
                    ctx.original_output = Some(result);
                    ctx.output_detections.extend(detected);
                    ctx.result = Some(filtered);
                }
            }
            Err(e) => warn!("Output redaction filter fault, keeping unfiltered result: {e}"),
        }

        Ok(())
    }
}

/// What one pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The redacted result text, the only result callers should surface.
    pub result_text: String,
    pub input_detections: Vec<Detection>,
    pub output_detections: Vec<Detection>,
    /// The un-redacted output, for diagnostics/metadata only.
    pub original_output: Option<String>,
    pub elapsed: Option<Duration>,
    pub events: Vec<String>,
}

impl PipelineOutcome {
    pub(crate) fn from_context(ctx: FilterContext) -> Result<Self, CoreError> {
        let qualified = ctx.qualified_name();
        let result_text = ctx.result.ok_or(CoreError::CallDropped(qualified))?;
        Ok(Self {
            result_text,
            input_detections: ctx.input_detections,
            output_detections: ctx.output_detections,
            original_output: ctx.original_output,
            elapsed: ctx.elapsed,
            events: ctx.events,
        })
    }
}

/// Runs `call` wrapped by the given pre- and post-phase interceptors.
///
/// Pre-phase interceptors are registered outermost, post-phase innermost, so
/// post-phase timing brackets only the wrapped call.
pub async fn run_pipeline(
    plugin_name: &str,
    function_name: &str,
    input_text: &str,
    pre_interceptors: Vec<Arc<dyn InvocationFilter>>,
    post_interceptors: Vec<Arc<dyn InvocationFilter>>,
    call: &dyn WrappedCall,
) -> Result<PipelineOutcome, CoreError> {
    let mut chain = FilterChain::new();
    for filter in pre_interceptors {
        chain.add(filter);
    }
    for filter in post_interceptors {
        chain.add(filter);
    }

    let mut ctx = FilterContext::new(plugin_name, function_name, input_text);
    chain.execute(&mut ctx, call).await?;
    PipelineOutcome::from_context(ctx)
}

/// Builds the pre/post content filter pair from a caller-supplied selection
/// map (e.g. the REST layer's `{"pii": true, "profanity": false}`).
///
/// Recognized keys are `pii`, `profanity`, and `logging`; anything else is a
/// malformed configuration and fails fast here, at chain-construction time.
/// Absent keys default to enabled. When either content toggle is on, both the
/// input and output content filters are registered.
pub fn build_content_filters(
    config: &FilterConfig,
    selection: &HashMap<String, bool>,
) -> Result<(Vec<Arc<dyn InvocationFilter>>, Vec<Arc<dyn InvocationFilter>>), CoreError> {
    for key in selection.keys() {
        match key.as_str() {
            "pii" | "profanity" | "logging" => {}
            other => return Err(CoreError::UnknownFilter(other.to_string())),
        }
    }

    let pii = selection.get("pii").copied().unwrap_or(true);
    let profanity = selection.get("profanity").copied().unwrap_or(true);

    let mut pre: Vec<Arc<dyn InvocationFilter>> = Vec::new();
    let mut post: Vec<Arc<dyn InvocationFilter>> = Vec::new();

    if pii || profanity {
        pre.push(Arc::new(InputContentFilter::new(config)?));
        post.push(Arc::new(OutputContentFilter::new(config)?));
    }

    Ok((pre, post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A wrapped call that records the input it was given and echoes it back.
    struct SpyCall {
        seen_inputs: Mutex<Vec<String>>,
    }

    impl SpyCall {
        fn new() -> Self {
            Self {
                seen_inputs: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WrappedCall for SpyCall {
        async fn invoke(&self, ctx: &mut FilterContext) -> Result<(), CoreError> {
            self.seen_inputs.lock().unwrap().push(ctx.input.clone());
            ctx.result = Some(ctx.input.clone());
            Ok(())
        }
    }

    struct FailingCall;

    #[async_trait]
    impl WrappedCall for FailingCall {
        async fn invoke(&self, _ctx: &mut FilterContext) -> Result<(), CoreError> {
            Err(CoreError::Service("quota exceeded".to_string()))
        }
    }

    /// Defective interceptor that never invokes its continuation.
    #[derive(Debug)]
    struct DroppingFilter;

    #[async_trait]
    impl InvocationFilter for DroppingFilter {
        async fn invoke(&self, _ctx: &mut FilterContext, _next: Next<'_>) -> Result<(), CoreError> {
            Ok(())
        }
    }

    fn content_filters(
    ) -> (Vec<Arc<dyn InvocationFilter>>, Vec<Arc<dyn InvocationFilter>>) {
        let config = FilterConfig::load_default_rules().unwrap();
        build_content_filters(&config, &HashMap::new()).unwrap()
    }

    #[tokio::test]
    async fn wrapped_call_observes_only_redacted_input() {
        let (pre, post) = content_filters();
        let call = SpyCall::new();
        let outcome = run_pipeline(
            "FiltersDemo",
            "process_text",
            "Call 555-123-4567, it is offensive",
            pre,
            post,
            &call,
        )
        .await
        .unwrap();

        let seen = call.seen_inputs.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], "Call [REDACTED PHONE], it is [REDACTED]");
        assert!(outcome
            .input_detections
            .iter()
            .any(|d| d.category == "phone" && d.matched_text == "555-123-4567"));
        assert!(outcome
            .input_detections
            .iter()
            .any(|d| d.to_string() == "profanity: offensive"));
    }

    #[tokio::test]
    async fn elapsed_is_non_negative_and_present_on_success() {
        let (pre, post) = content_filters();
        let call = SpyCall::new();
        let outcome = run_pipeline("FiltersDemo", "process_text", "plain text", pre, post, &call)
            .await
            .unwrap();
        let elapsed = outcome.elapsed.expect("post phase records elapsed time");
        assert!(elapsed >= Duration::ZERO);
        assert_eq!(outcome.result_text, "plain text");
        assert!(outcome.output_detections.is_empty());
        assert!(outcome.original_output.is_none());
    }

    #[tokio::test]
    async fn output_redaction_keeps_original_for_diagnostics() {
        struct LeakyCall;

        #[async_trait]
        impl WrappedCall for LeakyCall {
            async fn invoke(&self, ctx: &mut FilterContext) -> Result<(), CoreError> {
                ctx.result = Some("reach me at a@b.com".to_string());
                Ok(())
            }
        }

        let (pre, post) = content_filters();
        let outcome = run_pipeline("FiltersDemo", "process_text", "hello", pre, post, &LeakyCall)
            .await
            .unwrap();
        assert_eq!(outcome.result_text, "reach me at [REDACTED EMAIL]");
        assert_eq!(outcome.original_output.as_deref(), Some("reach me at a@b.com"));
        assert_eq!(outcome.output_detections.len(), 1);
        assert_eq!(outcome.output_detections[0].category, "email");
    }

    #[tokio::test]
    async fn call_errors_propagate_unchanged_through_post_phase() {
        let (pre, post) = content_filters();
        let err = run_pipeline("FiltersDemo", "process_text", "hello", pre, post, &FailingCall)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Service(_)));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn dropped_continuation_is_reported() {
        let pre: Vec<Arc<dyn InvocationFilter>> = vec![Arc::new(DroppingFilter)];
        let err = run_pipeline("FiltersDemo", "process_text", "hello", pre, vec![], &SpyCall::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::CallDropped(_)));
        assert!(err.to_string().contains("FiltersDemo.process_text"));
    }

    #[tokio::test]
    async fn marker_lines_are_recorded_verbatim() {
        let (pre, post) = content_filters();
        let call = SpyCall::new();
        let outcome = run_pipeline(
            "FiltersDemo",
            "process_text",
            "Email a@b.com",
            pre,
            post,
            &call,
        )
        .await
        .unwrap();
        assert!(outcome
            .events
            .iter()
            .any(|line| line.contains("Input Filter - Detected")));
        // The echoed output still contains the redaction tag, not the email,
        // so no output marker fires.
        assert!(!outcome
            .events
            .iter()
            .any(|line| line.contains("Output Filter - Detected")));
    }

    #[tokio::test]
    async fn invocation_log_filter_records_start_and_duration() {
        let pre: Vec<Arc<dyn InvocationFilter>> = vec![Arc::new(InvocationLogFilter)];
        let call = SpyCall::new();
        let outcome = run_pipeline("Weather", "respond", "hello", pre, vec![], &call)
            .await
            .unwrap();

        assert_eq!(outcome.events.len(), 2);
        assert!(outcome.events[0].contains("FunctionInvoking - Weather.respond"));
        assert!(outcome.events[1].contains("FunctionInvoked - Weather.respond ("));
        assert!(outcome.events[1].ends_with("s)"));
    }

    #[tokio::test]
    async fn invocation_log_filter_skips_invoked_line_on_call_failure() {
        let pre: Vec<Arc<dyn InvocationFilter>> = vec![Arc::new(InvocationLogFilter)];
        let err = run_pipeline("Weather", "respond", "hello", pre, vec![], &FailingCall)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Service(_)));
    }

    #[tokio::test]
    async fn unknown_filter_name_fails_at_construction() {
        let config = FilterConfig::load_default_rules().unwrap();
        let mut selection = HashMap::new();
        selection.insert("telemetry".to_string(), true);
        let err = build_content_filters(&config, &selection).unwrap_err();
        assert!(matches!(err, CoreError::UnknownFilter(name) if name == "telemetry"));
    }
}
