//! Progress snapshots for offline inspection of a run.
//!
//! After each node the flow may append a JSON snapshot of the shared state
//! to a single file shaped `{"snapshots": [...], "last_updated": ...}`.
//! Snapshot failures are reported to the caller but must never abort the
//! workflow; the flow logs and continues.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lemma::LemmaStatus;
use crate::state::SharedContext;
use crate::types::NodeKind;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LemmaSnapshot {
    pub id: usize,
    pub statement: String,
    pub proof: String,
    pub dependencies: Vec<usize>,
    pub status: LemmaStatus,
    pub review: Option<String>,
    pub is_theorem: bool,
    pub verify_round: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub timestamp: DateTime<Utc>,
    pub node: String,
    pub status: String,
    pub problem: String,
    pub current_lemma_id: Option<usize>,
    pub lemmas: Vec<LemmaSnapshot>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub snapshots: Vec<ProgressSnapshot>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Appends progress snapshots to a JSON file.
#[derive(Clone, Debug)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        shared: &SharedContext,
        node: NodeKind,
        status: &str,
    ) -> io::Result<()> {
        let snapshot = ProgressSnapshot {
            timestamp: Utc::now(),
            node: node.as_str().to_string(),
            status: status.to_string(),
            problem: shared.problem.clone(),
            current_lemma_id: shared.current_lemma_id,
            lemmas: shared
                .lemmas
                .snapshot()
                .into_iter()
                .enumerate()
                .map(|(id, l)| LemmaSnapshot {
                    id,
                    statement: l.statement,
                    proof: l.proof,
                    dependencies: l.dependencies,
                    status: l.status,
                    review: l.review,
                    is_theorem: l.is_theorem,
                    verify_round: l.verify_round,
                })
                .collect(),
        };

        let mut file = self.load().unwrap_or_default();
        file.snapshots.push(snapshot);
        file.last_updated = Some(Utc::now());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rendered = serde_json::to_string_pretty(&file)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, rendered)
    }

    /// Read the snapshot file back, if present and well formed.
    pub fn load(&self) -> Option<SnapshotFile> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&raw).ok()
    }
}
