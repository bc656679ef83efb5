//! Autonomous math-research sub-agent.
//!
//! Each call spawns a fresh inner LLM client restricted to the computational
//! tools (`run_python`, `run_wolfram`) with its own sandbox sessions. The
//! outer conversation is never exposed to the sub-agent and nothing is
//! remembered across calls.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{required_str, names, Tool, ToolContext, ToolDefinition, ToolError, ToolRegistry};
use crate::event_bus::Logger;
use crate::llm::{ChatProvider, HttpProvider, LlmClient, LlmConfig};
use crate::message::Message;

const SUBAGENT_SYSTEM_PROMPT: &str = "\
You are a mathematical research sub-agent. Solve the given subtask correctly (compute/verify/derive).
Correctness is mandatory: clearly state assumptions; every result you provide must be mathematically sound and rigorously verified.
Ask for clarifications if the task is ambiguous. Tell the main agent if the task is not self-contained or too large for you to handle.
Tools available: run_python (SymPy/NumPy/SciPy), run_wolfram (Wolfram Language).
OUTPUT RULES (token-efficient): plain text only (do NOT use markdown). Minimize blank lines, indentation, and extra spaces, but do NOT omit mathematical steps: fully expand derivations (no 'obvious', 'routine', 'it is easy'). Prefer compact dense formatting (e.g., short paragraphs; equations inline; optional section labels like Result/Assumptions/Proof/Checks).
If the subtask is too large: do NOT attempt to solve it beyond your capacity; state what you verified/failed + suggest a smaller, more manageable subtask that you can complete for the next step.";

const SUBAGENT_EXPERIENCES: &str = "\
<experiences>
Use SymPy first; if inconclusive/hard symbolic, switch to Wolfram for powerful symbolic capability. Always include assumptions (domains/parameters). For param equations/inequalities prefer Reduce and verify branches by substitution. For numerics: increase precision; test random points + edge/singularity cases. Watch branch cuts (Log/Sqrt/Power).
</experiences>";

/// Builds inner clients for sub-agent calls.
#[derive(Clone)]
pub struct SubagentFactory {
    config: LlmConfig,
    provider: Arc<dyn ChatProvider>,
    registry: Arc<ToolRegistry>,
}

impl SubagentFactory {
    /// Production factory: HTTP provider derived from the sub-agent config.
    #[must_use]
    pub fn from_config(config: LlmConfig, registry: Arc<ToolRegistry>) -> Self {
        let provider = Arc::new(HttpProvider::from_config(&config));
        Self::with_provider(config, provider, registry)
    }

    #[must_use]
    pub fn with_provider(
        config: LlmConfig,
        provider: Arc<dyn ChatProvider>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            config,
            provider,
            registry,
        }
    }

    fn client(&self, logger: Logger) -> LlmClient {
        LlmClient::with_provider(
            self.provider.clone(),
            self.config.clone(),
            self.registry.clone(),
            logger,
            "subagent",
        )
    }
}

/// `math_research_subagent`.
pub struct SubagentTool;

#[async_trait]
impl Tool for SubagentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::MATH_RESEARCH_SUBAGENT.to_string(),
            description: "Delegate a small, self-contained mathematical research task \
                          (compute/verify/derive) to an autonomous sub-agent with Python and \
                          Wolfram tools. Returns its plain-text answer."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "task_description": {
                        "type": "string",
                        "description": "Clear, self-contained description of the subtask"
                    }
                },
                "required": ["task_description"]
            }),
        }
    }

    async fn execute(
        &self,
        args: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let task = required_str(&args, "task_description")?.to_string();
        let factory = ctx
            .subagent
            .clone()
            .ok_or(ToolError::Unavailable("math_research_subagent"))?;

        ctx.logger.info("subagent", "event=subagent_start");

        let messages = vec![
            Message::system(&format!(
                "{SUBAGENT_SYSTEM_PROMPT}\n\n{SUBAGENT_EXPERIENCES}"
            )),
            Message::user(&format!(
                "<task_description>\n{task}\n</task_description>"
            )),
        ];

        // Fresh sandbox sessions; no sub-agent recursion.
        let mut inner = ToolContext::new(
            ctx.pool.clone(),
            ctx.current_lemma_id,
            ctx.runtime.clone(),
            ctx.logger.clone(),
        );

        let client = factory.client(ctx.logger.clone());
        let result = client
            .get_result(&messages, None, Some(&mut inner))
            .await
            .map_err(|err| ToolError::Subagent(err.to_string()))?;

        ctx.logger.info(
            "subagent",
            format!("event=subagent_done answer_len={}", result.answer.len()),
        );
        Ok(result.answer)
    }
}
