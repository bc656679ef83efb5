//! Engine configuration.
//!
//! Defaults mirror the quotas the engine was tuned with: up to 30 lemmas per
//! workflow, 5 verify-and-refine rounds per lemma, 15 verifier scaling
//! attempts, 300 s tool timeouts.

use std::path::PathBuf;
use std::time::Duration;

/// How workers see the lemma pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SharingMode {
    /// All workers append to and read from one shared pool.
    #[default]
    SharedByAll,
    /// Each worker starts from a private copy of the pool.
    PrivatePool,
}

/// Settings for the sandboxed tool processes.
#[derive(Clone, Debug)]
pub struct ToolRuntimeConfig {
    /// Interpreter used for `run_python`.
    pub python_bin: String,
    /// Kernel binary for `run_wolfram`; the `WOLFRAM_KERNEL` environment
    /// variable is tried once as a fallback when startup fails.
    pub wolfram_kernel: Option<String>,
    pub python_timeout: Duration,
    pub wolfram_timeout: Duration,
}

impl Default for ToolRuntimeConfig {
    fn default() -> Self {
        Self {
            python_bin: "python3".to_string(),
            wolfram_kernel: None,
            python_timeout: Duration::from_secs(300),
            wolfram_timeout: Duration::from_secs(300),
        }
    }
}

/// Quotas and orchestration settings for one engine instance.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Solver quota: a workflow proposes at most this many lemmas.
    pub max_lemma_num: usize,
    /// Verify-refine quota per lemma before it is rejected.
    pub max_verify_and_refine_round: u32,
    /// Number of verifier attempts per judgement; the first invalid wins.
    pub scaling_factor: u32,
    /// Run the secondary is-theorem query after each solver proposal.
    pub check_is_theorem: bool,
    /// Concurrent workflow replicas per iteration round.
    pub worker_num: usize,
    /// Iteration rounds before giving up.
    pub iteration_num: usize,
    pub sharing: SharingMode,
    /// Directory receiving one log file per worker.
    pub log_dir: PathBuf,
    /// When set, progress snapshots are appended here as JSON.
    pub progress_path: Option<PathBuf>,
    /// Echo one randomly chosen worker's log to stdout each round.
    pub echo_to_console: bool,
    pub tools: ToolRuntimeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_lemma_num: 30,
            max_verify_and_refine_round: 5,
            scaling_factor: 15,
            check_is_theorem: true,
            worker_num: 2,
            iteration_num: 1,
            sharing: SharingMode::SharedByAll,
            log_dir: PathBuf::from("logs"),
            progress_path: None,
            echo_to_console: true,
            tools: ToolRuntimeConfig::default(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_max_lemma_num(mut self, n: usize) -> Self {
        self.max_lemma_num = n;
        self
    }

    #[must_use]
    pub fn with_max_verify_and_refine_round(mut self, n: u32) -> Self {
        self.max_verify_and_refine_round = n;
        self
    }

    #[must_use]
    pub fn with_scaling_factor(mut self, n: u32) -> Self {
        self.scaling_factor = n;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, worker_num: usize, iteration_num: usize) -> Self {
        self.worker_num = worker_num;
        self.iteration_num = iteration_num;
        self
    }

    #[must_use]
    pub fn with_sharing(mut self, sharing: SharingMode) -> Self {
        self.sharing = sharing;
        self
    }

    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_progress_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.progress_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_check_is_theorem(mut self, enabled: bool) -> Self {
        self.check_is_theorem = enabled;
        self
    }

    #[must_use]
    pub fn with_echo_to_console(mut self, enabled: bool) -> Self {
        self.echo_to_console = enabled;
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: ToolRuntimeConfig) -> Self {
        self.tools = tools;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_quotas() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_lemma_num, 30);
        assert_eq!(cfg.max_verify_and_refine_round, 5);
        assert_eq!(cfg.scaling_factor, 15);
        assert_eq!(cfg.tools.python_timeout, Duration::from_secs(300));
        assert_eq!(cfg.sharing, SharingMode::SharedByAll);
    }
}
