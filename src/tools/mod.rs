//! Tool runtime: the named registry the LLM client dispatches into.
//!
//! Each tool returns a textual result that becomes a tool-role message in
//! the conversation. Errors never abort the conversation; they are
//! formatted into the result text so the model can self-correct on the next
//! turn. Dispatch is serial within one conversation; all per-conversation
//! state (sandbox sessions, the current lemma pointer) lives in
//! [`ToolContext`].

mod editing;
mod format;
mod python;
mod reading;
mod subagent;
mod wolfram;

pub use editing::{ModifyProofTool, ModifyStatementTool};
pub use format::{RefinerFormatReminderTool, SolverFormatReminderTool};
pub use python::{PythonOutput, PythonSession, RunPythonTool};
pub use reading::{ReadCurrentConjectureTool, ReadLemmaTool, ReadReviewTool};
pub use subagent::{SubagentFactory, SubagentTool};
pub use wolfram::{RunWolframTool, WolframSession};

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ToolRuntimeConfig;
use crate::event_bus::Logger;
use crate::lemma::LemmaError;
use crate::llm::repair::parse_tool_arguments;
use crate::pool::LemmaPool;

/// Wire names of the registered tools.
pub mod names {
    pub const RUN_PYTHON: &str = "run_python";
    pub const RUN_WOLFRAM: &str = "run_wolfram";
    pub const MATH_RESEARCH_SUBAGENT: &str = "math_research_subagent";
    pub const MODIFY_STATEMENT: &str = "modify_statement";
    pub const MODIFY_PROOF: &str = "modify_proof";
    pub const READ_LEMMA: &str = "read_lemma";
    pub const READ_CURRENT_CONJECTURE_AGAIN: &str = "read_current_conjecture_again";
    pub const READ_REVIEW_AGAIN: &str = "read_review_again";
    pub const SOLVER_RESPONSE_FORMAT_REMINDER: &str = "solver_response_format_reminder";
    pub const REFINER_RESPONSE_FORMAT_REMINDER: &str = "refiner_response_format_reminder";
}

/// Declared shape of a tool, rendered into the provider request.
#[derive(Clone, Debug)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

impl ToolDefinition {
    /// OpenAI function-calling wire shape.
    #[must_use]
    pub fn to_openai(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    #[diagnostic(code(alphasolve::tools::invalid_arguments))]
    InvalidArguments(String),

    #[error("no current lemma to operate on")]
    #[diagnostic(code(alphasolve::tools::no_current_lemma))]
    NoCurrentLemma,

    #[error(transparent)]
    #[diagnostic(code(alphasolve::tools::lemma))]
    Lemma(#[from] LemmaError),

    #[error("marker not found in proof: '{marker}'")]
    #[diagnostic(
        code(alphasolve::tools::marker_not_found),
        help("Markers must appear verbatim in the current proof text.")
    )]
    MarkerNotFound { marker: String },

    #[error("timeout")]
    #[diagnostic(code(alphasolve::tools::timeout))]
    Timeout,

    #[error("tool session failed: {0}")]
    #[diagnostic(code(alphasolve::tools::session))]
    Session(String),

    #[error(transparent)]
    #[diagnostic(code(alphasolve::tools::io))]
    Io(#[from] std::io::Error),

    #[error("sub-agent failed: {0}")]
    #[diagnostic(code(alphasolve::tools::subagent))]
    Subagent(String),

    #[error("{0} is not available in this context")]
    #[diagnostic(code(alphasolve::tools::unavailable))]
    Unavailable(&'static str),
}

/// Per-conversation tool state.
///
/// Sandbox sessions are lazily started and scoped to one conversation;
/// the lemma pool handle and current-lemma pointer give the editing and
/// reading tools their target.
pub struct ToolContext {
    pub pool: LemmaPool,
    pub current_lemma_id: Option<usize>,
    pub runtime: ToolRuntimeConfig,
    pub logger: Logger,
    pub python: Option<PythonSession>,
    pub wolfram: Option<WolframSession>,
    pub subagent: Option<SubagentFactory>,
}

impl ToolContext {
    #[must_use]
    pub fn new(
        pool: LemmaPool,
        current_lemma_id: Option<usize>,
        runtime: ToolRuntimeConfig,
        logger: Logger,
    ) -> Self {
        Self {
            pool,
            current_lemma_id,
            runtime,
            logger,
            python: None,
            wolfram: None,
            subagent: None,
        }
    }

    #[must_use]
    pub fn with_subagent(mut self, factory: SubagentFactory) -> Self {
        self.subagent = Some(factory);
        self
    }

    pub(crate) fn current_lemma_id(&self) -> Result<usize, ToolError> {
        self.current_lemma_id.ok_or(ToolError::NoCurrentLemma)
    }
}

/// Everything needed to mint fresh [`ToolContext`]s for new conversations.
///
/// Nodes hold a seed and stamp out one context per LLM conversation.
#[derive(Clone)]
pub struct ToolContextSeed {
    pub runtime: ToolRuntimeConfig,
    pub subagent: Option<SubagentFactory>,
}

impl ToolContextSeed {
    #[must_use]
    pub fn new(runtime: ToolRuntimeConfig) -> Self {
        Self {
            runtime,
            subagent: None,
        }
    }

    #[must_use]
    pub fn with_subagent(mut self, factory: SubagentFactory) -> Self {
        self.subagent = Some(factory);
        self
    }

    #[must_use]
    pub fn context(
        &self,
        pool: LemmaPool,
        current_lemma_id: Option<usize>,
        logger: Logger,
    ) -> ToolContext {
        let mut ctx = ToolContext::new(pool, current_lemma_id, self.runtime.clone(), logger);
        ctx.subagent = self.subagent.clone();
        ctx
    }
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(
        &self,
        args: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError>;
}

/// Named registry of tools.
pub struct ToolRegistry {
    tools: FxHashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tools: FxHashMap::default(),
        }
    }

    /// Registry with every built-in tool.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(RunPythonTool);
        registry.register(RunWolframTool);
        registry.register(SubagentTool);
        registry.register(ModifyStatementTool);
        registry.register(ModifyProofTool);
        registry.register(ReadLemmaTool);
        registry.register(ReadCurrentConjectureTool);
        registry.register(ReadReviewTool);
        registry.register(SolverFormatReminderTool);
        registry.register(RefinerFormatReminderTool);
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.definition().name, Arc::new(tool));
    }

    /// Definitions for the named tools; unknown names are skipped.
    #[must_use]
    pub fn definitions(&self, tool_names: &[String]) -> Vec<ToolDefinition> {
        tool_names
            .iter()
            .filter_map(|name| self.tools.get(name.as_str()))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Parse arguments, run the tool, and fold every failure into the
    /// returned text.
    pub async fn dispatch(&self, name: &str, raw_args: &str, ctx: &mut ToolContext) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!("error: unknown tool '{name}'");
        };
        let args = match parse_tool_arguments(raw_args) {
            Ok(args) => args,
            Err(err) => return err.as_tool_result(),
        };
        match tool.execute(args, ctx).await {
            Ok(result) => result,
            Err(err) => format!("error: {err}"),
        }
    }
}

/// Extract a required string argument.
pub(crate) fn required_str<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string field '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ToolContext {
        ToolContext::new(
            LemmaPool::new(),
            None,
            ToolRuntimeConfig::default(),
            Logger::disabled(),
        )
    }

    #[tokio::test]
    async fn unknown_tool_surfaces_error_text() {
        let registry = ToolRegistry::standard();
        let result = registry.dispatch("no_such_tool", "{}", &mut ctx()).await;
        assert_eq!(result, "error: unknown tool 'no_such_tool'");
    }

    #[tokio::test]
    async fn bad_arguments_surface_error_text() {
        let registry = ToolRegistry::standard();
        let result = registry
            .dispatch(names::MODIFY_STATEMENT, "{\"oops\": ", &mut ctx())
            .await;
        assert!(result.starts_with("error: "));
    }

    #[test]
    fn definitions_skip_unknown_names() {
        let registry = ToolRegistry::standard();
        let defs = registry.definitions(&[
            names::RUN_PYTHON.to_string(),
            "bogus".to_string(),
            names::READ_LEMMA.to_string(),
        ]);
        let got: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(got, vec![names::RUN_PYTHON, names::READ_LEMMA]);
    }

    #[test]
    fn openai_shape_wraps_function() {
        let def = ToolDefinition {
            name: "t".into(),
            description: "d".into(),
            parameters: serde_json::json!({"type": "object"}),
        };
        let wire = def.to_openai();
        assert_eq!(wire["type"], "function");
        assert_eq!(wire["function"]["name"], "t");
    }
}
