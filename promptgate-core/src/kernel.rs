// promptgate-core/src/kernel.rs
//! Prompt-templated function invocation, wrapped by the filter pipeline.
//!
//! A [`KernelFunction`] is a named prompt template with `{{$variable}}`
//! placeholders. [`Kernel::invoke`] renders the template and runs the
//! completion call through the registered filter chain, so pre-phase filters
//! rewrite the `input` argument before it ever reaches the prompt.
//!
//! The kernel is an explicit value constructed from configuration and passed
//! by reference wherever a chain and wrapped call are built. There is no
//! process-global kernel.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::errors::CoreError;
use crate::pipeline::{
    FilterChain, FilterContext, InvocationFilter, PipelineOutcome, WrappedCall,
};
use crate::services::{ChatCompletion, ChatRequest};

/// Named arguments for one invocation. The `input` argument is the payload
/// the filter pipeline operates on.
pub type KernelArguments = HashMap<String, String>;

lazy_static! {
    static ref TEMPLATE_VAR: Regex = Regex::new(r"\{\{\s*\$(\w+)\s*\}\}").unwrap();
}

/// A prompt-templated function.
#[derive(Debug, Clone)]
pub struct KernelFunction {
    pub plugin_name: String,
    pub function_name: String,
    pub prompt: String,
    pub max_tokens: Option<u32>,
}

impl KernelFunction {
    pub fn new(
        plugin_name: impl Into<String>,
        function_name: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            function_name: function_name.into(),
            prompt: prompt.into(),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Renders the prompt template with the given arguments. Placeholders
    /// without a matching argument render as the empty string.
    pub fn render(&self, args: &KernelArguments) -> String {
        TEMPLATE_VAR
            .replace_all(&self.prompt, |caps: &regex::Captures<'_>| {
                args.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

/// The wrapped call at the end of the chain: render the template with the
/// (possibly rewritten) input, then delegate to the completion service.
struct TemplatedCall<'a> {
    chat: &'a dyn ChatCompletion,
    function: &'a KernelFunction,
    args: &'a KernelArguments,
}

#[async_trait]
impl WrappedCall for TemplatedCall<'_> {
    async fn invoke(&self, ctx: &mut FilterContext) -> Result<(), CoreError> {
        let mut args = self.args.clone();
        // The context's input is authoritative: pre-phase filters have
        // already replaced it with the redacted text.
        args.insert("input".to_string(), ctx.input.clone());
        let prompt = self.function.render(&args);

        debug!(
            "Invoking completion service for {} ({} template chars)",
            ctx.qualified_name(),
            prompt.len()
        );

        let mut request = ChatRequest::from_prompt(prompt);
        request.max_tokens = self.function.max_tokens;
        let reply = self.chat.complete(request).await?;
        ctx.result = Some(reply);
        Ok(())
    }
}

/// Dispatches templated function invocations through the filter chain to the
/// completion service.
pub struct Kernel {
    chat: Arc<dyn ChatCompletion>,
    filters: FilterChain,
}

impl Kernel {
    pub fn new(chat: Arc<dyn ChatCompletion>) -> Self {
        Self {
            chat,
            filters: FilterChain::new(),
        }
    }

    /// Registers an interceptor. Registration order is execution order; the
    /// first added is outermost.
    pub fn add_filter(&mut self, filter: Arc<dyn InvocationFilter>) {
        self.filters.add(filter);
    }

    pub fn chat(&self) -> &dyn ChatCompletion {
        self.chat.as_ref()
    }

    /// Invokes `function` with `args` through the filter chain.
    ///
    /// The pipeline input is the `input` argument (empty if absent); the
    /// outcome's `result_text` is the redacted completion text.
    pub async fn invoke(
        &self,
        function: &KernelFunction,
        args: &KernelArguments,
    ) -> Result<PipelineOutcome, CoreError> {
        let input = args.get("input").cloned().unwrap_or_default();
        let mut ctx = FilterContext::new(&function.plugin_name, &function.function_name, &input);

        let call = TemplatedCall {
            chat: self.chat.as_ref(),
            function,
            args,
        };
        self.filters.execute(&mut ctx, &call).await?;

        PipelineOutcome::from_context(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::pipeline::build_content_filters;

    struct EchoChat;

    #[async_trait]
    impl ChatCompletion for EchoChat {
        async fn complete(&self, request: ChatRequest) -> Result<String, CoreError> {
            Ok(request.messages.last().map(|m| m.content.clone()).unwrap_or_default())
        }
    }

    fn args(input: &str) -> KernelArguments {
        let mut args = KernelArguments::new();
        args.insert("input".to_string(), input.to_string());
        args
    }

    #[test]
    fn render_substitutes_named_parameters() {
        let function = KernelFunction::new(
            "Translator",
            "translator",
            "{{$input}}\n\nTranslate this into {{$target_language}}:",
        );
        let mut args = args("good morning");
        args.insert("target_language".to_string(), "French".to_string());
        assert_eq!(
            function.render(&args),
            "good morning\n\nTranslate this into French:"
        );
    }

    #[test]
    fn render_blanks_unknown_placeholders() {
        let function = KernelFunction::new("Demo", "demo", "a {{$missing}} b");
        assert_eq!(function.render(&KernelArguments::new()), "a  b");
    }

    #[tokio::test]
    async fn invoke_runs_echo_template_through_filters() {
        let config = FilterConfig::load_default_rules().unwrap();
        let (pre, post) = build_content_filters(&config, &HashMap::new()).unwrap();

        let mut kernel = Kernel::new(Arc::new(EchoChat));
        for filter in pre.into_iter().chain(post) {
            kernel.add_filter(filter);
        }

        let echo = KernelFunction::new("FiltersDemo", "process_text", "{{$input}}");
        let outcome = kernel
            .invoke(&echo, &args("my ssn is 123-45-6789"))
            .await
            .unwrap();

        assert_eq!(outcome.result_text, "my ssn is [REDACTED SSN]");
        assert!(outcome
            .input_detections
            .iter()
            .any(|d| d.category == "ssn" && d.matched_text == "123-45-6789"));
    }

    #[tokio::test]
    async fn invoke_without_filters_passes_input_through() {
        let kernel = Kernel::new(Arc::new(EchoChat));
        let echo = KernelFunction::new("FiltersDemo", "process_text", "{{$input}}");
        let outcome = kernel.invoke(&echo, &args("plain text")).await.unwrap();
        assert_eq!(outcome.result_text, "plain text");
        assert!(outcome.input_detections.is_empty());
        assert!(outcome.elapsed.is_none());
    }
}
