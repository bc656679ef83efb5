//! Node execution framework for the AlphaSolve workflow.
//!
//! A node runs three phases in order each time the flow reaches it:
//!
//! - `prep` reads the shared context and assembles everything the work needs;
//! - `exec` performs the work (usually LLM/tool calls) without touching
//!   shared state beyond what `prep` handed over;
//! - `post` writes results back and returns the transition [`Action`].
//!
//! Errors in `prep`/`exec` are contained: the runner logs them and routes
//! the flow through [`Action::ExitOnError`] so the wiring decides how to
//! recover (typically a retry edge back to the same node). An error in
//! `post` terminates the flow.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::event_bus::Logger;
use crate::lemma::LemmaError;
use crate::llm::LlmError;
use crate::state::SharedContext;
use crate::types::{Action, NodeKind};

/// Execution context handed to every phase.
#[derive(Clone)]
pub struct NodeContext {
    pub kind: NodeKind,
    pub logger: Logger,
}

impl NodeContext {
    #[must_use]
    pub fn new(kind: NodeKind, logger: Logger) -> Self {
        Self { kind, logger }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.logger.info(self.kind.as_str(), message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.logger.warning(self.kind.as_str(), message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.logger.error(self.kind.as_str(), message);
    }
}

/// Errors that can occur during node execution.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the shared context.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(alphasolve::node::missing_input),
        help("Check that the previous node produced the required data: {what}.")
    )]
    MissingInput { what: &'static str },

    /// The model response did not carry the required structure.
    #[error("malformed model response: {0}")]
    #[diagnostic(code(alphasolve::node::format))]
    Format(String),

    #[error(transparent)]
    #[diagnostic(code(alphasolve::node::llm))]
    Llm(#[from] LlmError),

    #[error(transparent)]
    #[diagnostic(code(alphasolve::node::lemma))]
    Lemma(#[from] LemmaError),

    #[error(transparent)]
    #[diagnostic(code(alphasolve::node::serde_json))]
    Serde(#[from] serde_json::Error),
}

/// A three-phase workflow node with typed intermediate payloads.
///
/// `exec` borrows the prep payload; `post` consumes both, so no cloning is
/// forced on implementations.
#[async_trait]
pub trait Node: Send + Sync {
    type Prep: Send + Sync;
    type Exec: Send;

    async fn prep(&self, shared: &SharedContext, ctx: &NodeContext)
    -> Result<Self::Prep, NodeError>;

    async fn exec(&self, prep: &Self::Prep, ctx: &NodeContext) -> Result<Self::Exec, NodeError>;

    async fn post(
        &self,
        shared: &mut SharedContext,
        prep: Self::Prep,
        exec: Self::Exec,
        ctx: &NodeContext,
    ) -> Result<Action, NodeError>;
}

/// Object-safe runner over any [`Node`], applying the phase error policy.
#[async_trait]
pub trait DynNode: Send + Sync {
    async fn run(&self, shared: &mut SharedContext, ctx: &NodeContext)
    -> Result<Action, NodeError>;
}

#[async_trait]
impl<T: Node> DynNode for T {
    async fn run(
        &self,
        shared: &mut SharedContext,
        ctx: &NodeContext,
    ) -> Result<Action, NodeError> {
        let prep = match self.prep(shared, ctx).await {
            Ok(prep) => prep,
            Err(err) => {
                ctx.error(format!("event=prep_exception error={err}"));
                return Ok(Action::ExitOnError);
            }
        };
        let exec = match self.exec(&prep, ctx).await {
            Ok(exec) => exec,
            Err(err) => {
                ctx.error(format!("event=exec_exception error={err}"));
                return Ok(Action::ExitOnError);
            }
        };
        // A post error is a logic error; it propagates and ends the flow.
        self.post(shared, prep, exec, ctx).await
    }
}
