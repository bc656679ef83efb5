//! Core identifiers for the AlphaSolve workflow.
//!
//! The workflow graph is small and statically defined: four node kinds wired
//! by typed transition actions. Actions carry the snake_case wire strings
//! used in logs and progress snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the four workflow roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Solver,
    Verifier,
    Refiner,
    Summarizer,
}

impl NodeKind {
    /// Stable lowercase name used in log lines and snapshots.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Solver => "solver",
            NodeKind::Verifier => "verifier",
            NodeKind::Refiner => "refiner",
            NodeKind::Summarizer => "summarizer",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition action returned by a node's `post` phase.
///
/// The flow maps `(source node, action)` to the next node; an action with no
/// outgoing edge terminates the flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    ConjectureGenerated,
    ConjectureVerified,
    ConjectureUnverified,
    Done,
    RefineSuccess,
    ExitOnError,
    ExitOnExausted,
    ExitOnFailure,
}

impl Action {
    /// Wire string for this action.
    ///
    /// The historical `exit_on_exausted` spelling is part of the persisted
    /// log format and is kept as-is.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ConjectureGenerated => "conjecture_generated",
            Action::ConjectureVerified => "conjecture_verified",
            Action::ConjectureUnverified => "conjecture_unverified",
            Action::Done => "done",
            Action::RefineSuccess => "refined_success",
            Action::ExitOnError => "exit_on_error",
            Action::ExitOnExausted => "exit_on_exausted",
            Action::ExitOnFailure => "exit_on_failure",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
