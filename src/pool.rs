//! Append-only lemma pool shared across workflow workers.
//!
//! The pool is the only mutable state that crosses worker boundaries.
//! Appending is the sole cross-worker write; readers take snapshots bounded
//! to the length observed at call time and tolerate concurrent growth.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::lemma::{Lemma, LemmaError, build_reasoning_path, validate_lemma};

/// Cheap-clone handle to a shared, append-only list of lemmas.
///
/// Cloning the handle shares the underlying store; use
/// [`LemmaPool::deep_copy`] for a private pool seeded from the current
/// contents.
#[derive(Clone, Default)]
pub struct LemmaPool {
    inner: Arc<RwLock<Vec<Lemma>>>,
}

impl LemmaPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_lemmas(lemmas: Vec<Lemma>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(lemmas)),
        }
    }

    /// A private pool seeded with a copy of the current contents.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self::from_lemmas(self.snapshot())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Validate and append a lemma, returning its id (= index).
    pub fn append(&self, lemma: Lemma) -> Result<usize, LemmaError> {
        let mut guard = self.inner.write();
        let id = guard.len();
        validate_lemma(&lemma, Some(id))?;
        guard.push(lemma);
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<Lemma> {
        self.inner.read().get(id).cloned()
    }

    /// Point-in-time copy of the whole pool.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Lemma> {
        self.inner.read().clone()
    }

    /// Ids of verified lemmas, ascending.
    #[must_use]
    pub fn verified_ids(&self) -> Vec<usize> {
        self.inner
            .read()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_verified())
            .map(|(i, _)| i)
            .collect()
    }

    /// Mutate one lemma in place under the write lock.
    pub fn update<R>(
        &self,
        id: usize,
        f: impl FnOnce(&mut Lemma) -> R,
    ) -> Result<R, LemmaError> {
        let mut guard = self.inner.write();
        let len = guard.len();
        let lemma = guard
            .get_mut(id)
            .ok_or(LemmaError::IdOutOfRange { id, len })?;
        Ok(f(lemma))
    }

    /// Reasoning path for `id` over a snapshot bounded to the currently
    /// observed pool length.
    pub fn reasoning_path(
        &self,
        id: usize,
        verified_only: bool,
    ) -> Result<Vec<usize>, LemmaError> {
        let guard = self.inner.read();
        build_reasoning_path(&guard, id, verified_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lemma::LemmaStatus;

    #[test]
    fn append_assigns_sequential_ids() {
        let pool = LemmaPool::new();
        assert_eq!(pool.append(Lemma::pending("a", "p", vec![])).unwrap(), 0);
        assert_eq!(pool.append(Lemma::pending("b", "p", vec![0])).unwrap(), 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn append_rejects_forward_dependency() {
        let pool = LemmaPool::new();
        assert!(pool.append(Lemma::pending("a", "p", vec![0])).is_err());
        assert!(pool.is_empty());
    }

    #[test]
    fn handles_share_the_store_but_deep_copy_detaches() {
        let pool = LemmaPool::new();
        let alias = pool.clone();
        pool.append(Lemma::pending("a", "p", vec![])).unwrap();
        assert_eq!(alias.len(), 1);

        let private = pool.deep_copy();
        pool.append(Lemma::pending("b", "p", vec![])).unwrap();
        assert_eq!(private.len(), 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn update_mutates_in_place() {
        let pool = LemmaPool::new();
        let id = pool.append(Lemma::pending("a", "p", vec![])).unwrap();
        pool.update(id, |l| l.set_status(LemmaStatus::Verified))
            .unwrap()
            .unwrap();
        assert_eq!(pool.verified_ids(), vec![id]);
        assert!(pool.update(7, |_| ()).is_err());
    }
}
