//! The lemma graph: the central data model of the engine.
//!
//! A lemma is addressed by its integer id, which is its position in the
//! lemma list. Dependencies point strictly backward, so the list is always a
//! topologically consistent DAG. Status moves `pending -> verified` or
//! `pending -> rejected` and never back.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;

/// Verification status of a lemma.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LemmaStatus {
    Pending,
    Verified,
    Rejected,
}

impl LemmaStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LemmaStatus::Pending => "pending",
            LemmaStatus::Verified => "verified",
            LemmaStatus::Rejected => "rejected",
        }
    }
}

/// Errors raised by lemma validation and mutation.
#[derive(Debug, Error, Diagnostic)]
pub enum LemmaError {
    #[error("lemma statement must be non-empty")]
    #[diagnostic(code(alphasolve::lemma::empty_statement))]
    EmptyStatement,

    #[error("illegal status transition: {from} -> {to}")]
    #[diagnostic(
        code(alphasolve::lemma::illegal_transition),
        help("verified and rejected are terminal; only pending may move.")
    )]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("dependency {dep} does not reference an earlier lemma (self id {id})")]
    #[diagnostic(code(alphasolve::lemma::forward_dependency))]
    ForwardDependency { dep: usize, id: usize },

    #[error("lemma id out of range: {id} (have {len})")]
    #[diagnostic(code(alphasolve::lemma::id_out_of_range))]
    IdOutOfRange { id: usize, len: usize },
}

/// A proposition with a proof and earlier-lemma dependencies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lemma {
    pub statement: String,
    pub proof: String,
    /// Ids of earlier lemmas this one builds on; every entry < own id.
    pub dependencies: Vec<usize>,
    pub status: LemmaStatus,
    /// Verifier feedback attached while the lemma stays pending or rejected.
    pub review: Option<String>,
    /// True iff the statement fully answers the original problem.
    pub is_theorem: bool,
    /// Conversation transcript that produced the current statement/proof.
    pub history_messages: Vec<Message>,
    /// Number of times the verifier has judged this lemma.
    pub verify_round: u32,
}

impl Lemma {
    /// A freshly proposed, still-unverified lemma.
    #[must_use]
    pub fn pending(
        statement: impl Into<String>,
        proof: impl Into<String>,
        dependencies: Vec<usize>,
    ) -> Self {
        Self {
            statement: statement.into(),
            proof: proof.into(),
            dependencies,
            status: LemmaStatus::Pending,
            review: None,
            is_theorem: false,
            history_messages: Vec::new(),
            verify_round: 0,
        }
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history_messages = history;
        self
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.status == LemmaStatus::Verified
    }

    /// Move this lemma to `next`, rejecting transitions out of a terminal
    /// status. Re-asserting the current terminal status is a no-op.
    pub fn set_status(&mut self, next: LemmaStatus) -> Result<(), LemmaError> {
        use LemmaStatus::*;
        match (self.status, next) {
            (Pending, _) => {
                self.status = next;
                Ok(())
            }
            (Verified, Verified) | (Rejected, Rejected) => Ok(()),
            (from, to) => Err(LemmaError::IllegalTransition {
                from: from.as_str(),
                to: to.as_str(),
            }),
        }
    }
}

/// Validate the shape of a lemma, optionally against its id.
///
/// With `lemma_id` provided, every dependency must reference an earlier
/// lemma; forward or self references are rejected.
pub fn validate_lemma(lemma: &Lemma, lemma_id: Option<usize>) -> Result<(), LemmaError> {
    if lemma.statement.trim().is_empty() {
        return Err(LemmaError::EmptyStatement);
    }
    if let Some(id) = lemma_id {
        for &dep in &lemma.dependencies {
            if dep >= id {
                return Err(LemmaError::ForwardDependency { dep, id });
            }
        }
    }
    Ok(())
}

/// Transitive dependencies of `lemma_id` in topological (post-)order.
///
/// The result excludes `lemma_id` itself and is deduplicated. Entries that
/// point forward (`dep >= self`) or out of range are ignored rather than
/// treated as errors; the caller may be scanning a pool that other workers
/// are still appending to. With `verified_only`, traversal neither enters
/// nor reports lemmas that are not verified.
pub fn build_reasoning_path(
    lemmas: &[Lemma],
    lemma_id: usize,
    verified_only: bool,
) -> Result<Vec<usize>, LemmaError> {
    if lemma_id >= lemmas.len() {
        return Err(LemmaError::IdOutOfRange {
            id: lemma_id,
            len: lemmas.len(),
        });
    }

    let mut seen = vec![false; lemmas.len()];
    let mut out = Vec::new();
    dfs(lemmas, lemma_id, verified_only, &mut seen, &mut out);
    Ok(out)
}

fn dfs(lemmas: &[Lemma], id: usize, verified_only: bool, seen: &mut [bool], out: &mut Vec<usize>) {
    for &dep in &lemmas[id].dependencies {
        if dep >= id || dep >= lemmas.len() {
            continue;
        }
        if verified_only && !lemmas[dep].is_verified() {
            continue;
        }
        if seen[dep] {
            continue;
        }
        seen[dep] = true;
        dfs(lemmas, dep, verified_only, seen, out);
        out.push(dep);
    }
}
