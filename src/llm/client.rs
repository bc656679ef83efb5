//! Multi-turn streaming client with tool dispatch and bounded retry.

use std::sync::Arc;

use futures_util::StreamExt;

use super::config::LlmConfig;
use super::provider::{ChatProvider, ChatRequest, HttpProvider};
use super::stream::StreamAccumulator;
use super::LlmError;
use crate::event_bus::Logger;
use crate::message::Message;
use crate::tools::{ToolContext, ToolDefinition, ToolRegistry};

/// Final result of one multi-turn conversation.
#[derive(Clone, Debug)]
pub struct LlmResult {
    /// Content of the last assistant turn.
    pub answer: String,
    /// Reasoning stream of the last assistant turn, if any.
    pub reasoning: String,
    /// Baseline messages plus every assistant/tool turn produced.
    pub messages: Vec<Message>,
}

/// A chat-completion client bound to one role configuration.
///
/// The client itself is stateless across calls beyond its HTTP connection
/// pool; per-conversation state (Python/Wolfram sessions, the current lemma)
/// lives in the [`ToolContext`] supplied by the caller.
pub struct LlmClient {
    provider: Arc<dyn ChatProvider>,
    config: LlmConfig,
    registry: Arc<ToolRegistry>,
    logger: Logger,
    module: String,
}

impl LlmClient {
    #[must_use]
    pub fn new(
        config: LlmConfig,
        registry: Arc<ToolRegistry>,
        logger: Logger,
        module: impl Into<String>,
    ) -> Self {
        let provider = Arc::new(HttpProvider::from_config(&config));
        Self::with_provider(provider, config, registry, logger, module)
    }

    /// Build a client over an explicit provider (tests, custom transports).
    #[must_use]
    pub fn with_provider(
        provider: Arc<dyn ChatProvider>,
        config: LlmConfig,
        registry: Arc<ToolRegistry>,
        logger: Logger,
        module: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            config,
            registry,
            logger,
            module: module.into(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Run a multi-turn conversation to completion.
    ///
    /// `messages` is the baseline: every retry restarts from it, never from
    /// a partial stream. `tools` overrides the client-configured tool list;
    /// `None` means "use the configured tools", `Some(&[])` means none.
    pub async fn get_result(
        &self,
        messages: &[Message],
        tools: Option<&[String]>,
        mut ctx: Option<&mut ToolContext>,
    ) -> Result<LlmResult, LlmError> {
        let tool_defs = match tools {
            Some(names) => self.registry.definitions(names),
            None => self.registry.definitions(&self.config.tools),
        };

        let attempts = self.config.max_api_retry.max(1);
        let mut last: Option<LlmError> = None;
        for attempt in 1..=attempts {
            match self
                .attempt(messages.to_vec(), &tool_defs, ctx.as_deref_mut())
                .await
            {
                Ok(result) => return Ok(result),
                Err(err @ LlmError::MissingApiKey { .. }) => return Err(err),
                Err(err) => {
                    self.logger.warning(
                        &self.module,
                        format!("event=llm_retry attempt={attempt}/{attempts} error={err}"),
                    );
                    last = Some(err);
                }
            }
        }
        Err(LlmError::RetriesExhausted {
            attempts,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// One full attempt: stream, dispatch tools, loop until a plain stop.
    async fn attempt(
        &self,
        mut messages: Vec<Message>,
        tool_defs: &[ToolDefinition],
        mut ctx: Option<&mut ToolContext>,
    ) -> Result<LlmResult, LlmError> {
        loop {
            let request = ChatRequest {
                model: self.config.model.clone(),
                messages: messages.clone(),
                tools: tool_defs.to_vec(),
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                extra: self.config.extra_params.clone(),
            };

            let mut stream = self.provider.stream_chat(request).await?;
            let mut acc = StreamAccumulator::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                for choice in &chunk.choices {
                    if let Some(delta) = &choice.delta {
                        if let Some(reasoning) = &delta.reasoning_content {
                            self.logger.fragment(reasoning.clone());
                        }
                        if let Some(content) = &delta.content {
                            self.logger.fragment(content.clone());
                        }
                    }
                }
                acc.absorb(&chunk);
            }
            self.logger.stream_end();

            let outcome = acc.finish()?;
            messages.push(Message::assistant_turn(
                outcome.content.clone(),
                Some(outcome.reasoning.clone()),
                outcome.tool_calls.clone(),
            ));

            if outcome.tool_calls.is_empty() {
                return Ok(LlmResult {
                    answer: outcome.content,
                    reasoning: outcome.reasoning,
                    messages,
                });
            }

            let tool_ctx = ctx.as_deref_mut().ok_or(LlmError::NoToolContext)?;
            for call in &outcome.tool_calls {
                self.logger.info(
                    &self.module,
                    format!("event=tool_call name={} id={}", call.function.name, call.id),
                );
                let result = self
                    .registry
                    .dispatch(&call.function.name, &call.function.arguments, tool_ctx)
                    .await;
                self.logger.info(
                    &self.module,
                    format!(
                        "event=tool_result name={} result_len={}",
                        call.function.name,
                        result.len()
                    ),
                );
                messages.push(Message::tool(call.id.clone(), result));
            }
            // Loop: the provider decides whether to keep calling tools.
        }
    }
}
