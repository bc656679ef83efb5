//! Shared workflow state passed through the flow.
//!
//! `SharedContext` is a fixed-schema record: nodes read it during `prep`,
//! never touch it during `exec`, and mutate it during `post`. The phase
//! discipline is enforced by the [`crate::node::Node`] signatures
//! (`&SharedContext` vs `&mut SharedContext`), not by runtime barriers.

use crate::pool::LemmaPool;

/// The single mutable context for one workflow invocation.
///
/// `lemmas` may reference a pool shared with other workers; everything else
/// is private working memory for this worker.
#[derive(Clone)]
pub struct SharedContext {
    pub problem: String,
    pub hint: Option<String>,
    pub lemmas: LemmaPool,
    pub current_lemma_id: Option<usize>,
    pub result_summary: Option<String>,
}

impl SharedContext {
    /// A context whose lemma list references an existing (shared) pool.
    #[must_use]
    pub fn with_pool(problem: impl Into<String>, hint: Option<String>, pool: LemmaPool) -> Self {
        Self {
            problem: problem.into(),
            hint,
            lemmas: pool,
            current_lemma_id: None,
            result_summary: None,
        }
    }

    /// A context with its own private, empty lemma pool.
    #[must_use]
    pub fn private(problem: impl Into<String>, hint: Option<String>) -> Self {
        Self::with_pool(problem, hint, LemmaPool::new())
    }
}
