//! Multi-worker orchestration.
//!
//! Runs N workflow replicas concurrently against a shared lemma pool across
//! several iteration rounds. Each worker owns its nodes, flow, and log file;
//! the pool is the only state crossing worker boundaries. The first worker
//! to produce a non-empty summary wins the round and peers are aborted
//! best-effort.

use std::path::PathBuf;
use std::sync::Arc;

use miette::Diagnostic;
use rand::RngExt;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::instrument;

use crate::config::{EngineConfig, SharingMode};
use crate::event_bus::{EventBus, EventSink, FileSink, Logger, StdOutSink};
use crate::flow::{Flow, FlowBuilder, FlowError};
use crate::llm::{ChatProvider, LlmClient, LlmConfig};
use crate::nodes::{RefinerNode, SolverNode, SummarizerNode, VerifierNode};
use crate::pool::LemmaPool;
use crate::prompts::PromptSet;
use crate::snapshot::SnapshotWriter;
use crate::state::SharedContext;
use crate::tools::{names, SubagentFactory, ToolContextSeed, ToolRegistry};
use crate::types::{Action, NodeKind};

#[derive(Debug, Error, Diagnostic)]
pub enum OrchestratorError {
    #[error(transparent)]
    #[diagnostic(code(alphasolve::orchestrator::flow))]
    Flow(#[from] FlowError),
}

/// LLM configuration per workflow role.
#[derive(Clone, Debug)]
pub struct RoleConfigs {
    pub solver: LlmConfig,
    pub verifier: LlmConfig,
    pub refiner: LlmConfig,
    pub subagent: LlmConfig,
}

impl RoleConfigs {
    /// One provider config for every role, with the standard tool lists:
    /// the solver explores and reads verified lemmas, the verifier
    /// re-reads the current conjecture, the refiner additionally gets the
    /// editing tools, and the sub-agent gets the computational pair.
    #[must_use]
    pub fn uniform(base: LlmConfig) -> Self {
        Self {
            solver: base.clone().with_tools([
                names::MATH_RESEARCH_SUBAGENT,
                names::READ_LEMMA,
                names::SOLVER_RESPONSE_FORMAT_REMINDER,
            ]),
            verifier: base.clone().with_tools([
                names::MATH_RESEARCH_SUBAGENT,
                names::READ_LEMMA,
                names::READ_CURRENT_CONJECTURE_AGAIN,
            ]),
            refiner: base.clone().with_tools([
                names::MATH_RESEARCH_SUBAGENT,
                names::READ_LEMMA,
                names::READ_CURRENT_CONJECTURE_AGAIN,
                names::READ_REVIEW_AGAIN,
                names::MODIFY_STATEMENT,
                names::MODIFY_PROOF,
                names::REFINER_RESPONSE_FORMAT_REMINDER,
            ]),
            subagent: base.with_tools([names::RUN_PYTHON, names::RUN_WOLFRAM]),
        }
    }
}

/// The engine: owns the shared lemma pool and drives worker rounds.
pub struct AlphaSolve {
    problem: String,
    hint: Option<String>,
    engine: EngineConfig,
    roles: RoleConfigs,
    prompts: PromptSet,
    registry: Arc<ToolRegistry>,
    pool: LemmaPool,
    provider_override: Option<Arc<dyn ChatProvider>>,
    run_suffix: String,
}

impl AlphaSolve {
    #[must_use]
    pub fn new(
        problem: impl Into<String>,
        hint: Option<String>,
        engine: EngineConfig,
        roles: RoleConfigs,
    ) -> Self {
        dotenvy::dotenv().ok();
        Self {
            problem: problem.into(),
            hint,
            engine,
            roles,
            prompts: PromptSet::default(),
            registry: Arc::new(ToolRegistry::standard()),
            pool: LemmaPool::new(),
            provider_override: None,
            run_suffix: chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string(),
        }
    }

    /// Route every role through one explicit provider (tests, proxies).
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.provider_override = Some(provider);
        self
    }

    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    #[must_use]
    pub fn pool(&self) -> &LemmaPool {
        &self.pool
    }

    /// Run up to the configured number of iteration rounds; the first
    /// non-empty summary wins. Returns `None` when every round exhausts its
    /// quotas without a verified theorem.
    #[instrument(skip(self))]
    pub async fn do_research(&self) -> Result<Option<String>, OrchestratorError> {
        for round in 0..self.engine.iteration_num {
            tracing::info!(round, "starting iteration round");
            self.prepare_lemma_pool();

            let echo_index = if self.engine.echo_to_console {
                Some(rand::rng().random_range(0..self.engine.worker_num.max(1)))
            } else {
                None
            };

            let mut workers: JoinSet<Option<String>> = JoinSet::new();
            for index in 0..self.engine.worker_num {
                let spec = self.worker_spec(round, index, echo_index == Some(index));
                workers.spawn(run_worker(spec));
            }

            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(Some(summary)) if !summary.is_empty() => {
                        workers.abort_all();
                        return Ok(Some(summary));
                    }
                    Ok(_) => {}
                    Err(err) if err.is_cancelled() => {}
                    Err(err) => tracing::error!(error = %err, "worker task failed"),
                }
            }
        }
        Ok(None)
    }

    fn worker_spec(&self, round: usize, index: usize, echo: bool) -> WorkerSpec {
        let (problem, hint) = self.generate_problem_and_hint();
        let pool = match self.engine.sharing {
            SharingMode::SharedByAll => self.pool.clone(),
            SharingMode::PrivatePool => self.pool.deep_copy(),
        };
        let log_path = self
            .engine
            .log_dir
            .join(format!("alpha_solve_iteration_{round}_{}", self.run_suffix))
            .join(format!("alpha_solve_{index}.log"));
        WorkerSpec {
            problem,
            hint,
            engine: self.engine.clone(),
            roles: self.roles.clone(),
            prompts: self.prompts.clone(),
            registry: self.registry.clone(),
            pool,
            provider_override: self.provider_override.clone(),
            log_path,
            echo,
        }
    }

    /// Extension seam: later versions may synthesize per-worker problem
    /// variants and hints. The base engine hands every worker the same pair.
    fn generate_problem_and_hint(&self) -> (String, Option<String>) {
        (self.problem.clone(), self.hint.clone())
    }

    /// Pool maintenance hook between rounds (dedup/merge/prune).
    /// Placeholder: the pool is carried over untouched.
    fn prepare_lemma_pool(&self) {}

    /// Dump the pool contents through the given logger.
    pub fn check_lemma_pool(&self, logger: &Logger) {
        log_pool(&self.pool, logger);
    }

    /// Spawn a background task dumping the pool on an interval.
    ///
    /// Abort the returned handle to stop monitoring; the task holds only a
    /// pool handle and never blocks the workers.
    pub fn spawn_pool_monitor(
        &self,
        interval: std::time::Duration,
        logger: Logger,
    ) -> tokio::task::JoinHandle<()> {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            loop {
                log_pool(&pool, &logger);
                tokio::time::sleep(interval).await;
            }
        })
    }
}

fn log_pool(pool: &LemmaPool, logger: &Logger) {
    let lemmas = pool.snapshot();
    if lemmas.is_empty() {
        logger.info("orchestrator", "lemma pool is empty");
        return;
    }
    logger.info(
        "orchestrator",
        format!("lemma pool with length {}", lemmas.len()),
    );
    for (i, lemma) in lemmas.iter().enumerate() {
        logger.info("orchestrator", format!("============ begin lemma {i}"));
        logger.info("orchestrator", format!("statement: {}", lemma.statement));
        logger.info("orchestrator", format!("status: {}", lemma.status.as_str()));
        logger.info(
            "orchestrator",
            format!("verify_round: {}", lemma.verify_round),
        );
        logger.info(
            "orchestrator",
            format!("is_theorem: {}", lemma.is_theorem),
        );
        logger.info("orchestrator", format!("============ end lemma {i}"));
    }
}

struct WorkerSpec {
    problem: String,
    hint: Option<String>,
    engine: EngineConfig,
    roles: RoleConfigs,
    prompts: PromptSet,
    registry: Arc<ToolRegistry>,
    pool: LemmaPool,
    provider_override: Option<Arc<dyn ChatProvider>>,
    log_path: PathBuf,
    echo: bool,
}

impl WorkerSpec {
    fn client(&self, config: &LlmConfig, logger: &Logger, module: &str) -> Arc<LlmClient> {
        Arc::new(match &self.provider_override {
            Some(provider) => LlmClient::with_provider(
                provider.clone(),
                config.clone(),
                self.registry.clone(),
                logger.clone(),
                module,
            ),
            None => LlmClient::new(
                config.clone(),
                self.registry.clone(),
                logger.clone(),
                module,
            ),
        })
    }

    fn subagent_factory(&self) -> SubagentFactory {
        match &self.provider_override {
            Some(provider) => SubagentFactory::with_provider(
                self.roles.subagent.clone(),
                provider.clone(),
                self.registry.clone(),
            ),
            None => SubagentFactory::from_config(self.roles.subagent.clone(), self.registry.clone()),
        }
    }

    fn build_flow(&self, logger: &Logger) -> Result<Flow, FlowError> {
        let seed = ToolContextSeed::new(self.engine.tools.clone())
            .with_subagent(self.subagent_factory());

        let solver = SolverNode::new(
            self.client(&self.roles.solver, logger, "solver"),
            self.prompts.solver.clone(),
            self.prompts.theorem_check.clone(),
            self.engine.max_lemma_num,
            self.engine.check_is_theorem,
            seed.clone(),
        );
        let verifier = VerifierNode::new(
            self.client(&self.roles.verifier, logger, "verifier"),
            self.prompts.verifier.clone(),
            self.engine.scaling_factor,
            seed.clone(),
        );
        let refiner = RefinerNode::new(
            self.client(&self.roles.refiner, logger, "refiner"),
            self.engine.max_verify_and_refine_round,
            seed,
        );

        FlowBuilder::new()
            .add_node(NodeKind::Solver, solver)
            .add_node(NodeKind::Verifier, verifier)
            .add_node(NodeKind::Refiner, refiner)
            .add_node(NodeKind::Summarizer, SummarizerNode)
            // Lemma proposed: judge it.
            .on(NodeKind::Solver, Action::ConjectureGenerated, NodeKind::Verifier)
            // Quota spent: summarize whatever was achieved and exit.
            .on(NodeKind::Solver, Action::ExitOnExausted, NodeKind::Summarizer)
            // Malformed response: retry the solver.
            .on(NodeKind::Solver, Action::ExitOnError, NodeKind::Solver)
            // Correct lemma: back to the solver for the next step.
            .on(NodeKind::Verifier, Action::ConjectureVerified, NodeKind::Solver)
            // Fault found: send to the refiner.
            .on(NodeKind::Verifier, Action::ConjectureUnverified, NodeKind::Refiner)
            // Theorem verified: summarize and exit.
            .on(NodeKind::Verifier, Action::Done, NodeKind::Summarizer)
            // Edited: judge again.
            .on(NodeKind::Refiner, Action::RefineSuccess, NodeKind::Verifier)
            // Refine quota spent: abandon the lemma, let the solver move on.
            .on(NodeKind::Refiner, Action::ExitOnExausted, NodeKind::Solver)
            // Malformed response: retry the refiner.
            .on(NodeKind::Refiner, Action::ExitOnError, NodeKind::Refiner)
            .start(NodeKind::Solver)
            .build()
    }
}

async fn run_worker(spec: WorkerSpec) -> Option<String> {
    let mut sinks: Vec<Box<dyn EventSink>> = Vec::new();
    match FileSink::create(&spec.log_path) {
        Ok(sink) => sinks.push(Box::new(sink)),
        Err(err) => tracing::warn!(
            path = %spec.log_path.display(),
            error = %err,
            "worker log file unavailable"
        ),
    }
    if spec.echo {
        sinks.push(Box::new(StdOutSink::default()));
    }
    let mut bus = EventBus::with_sinks(sinks);
    let logger = bus.logger();
    let listener = bus.listen_for_events();

    let flow = match spec.build_flow(&logger) {
        Ok(flow) => flow,
        Err(err) => {
            logger.error("orchestrator", format!("flow wiring failed: {err}"));
            drop(logger);
            drop(bus);
            let _ = listener.await;
            return None;
        }
    };

    let snapshots = spec.engine.progress_path.clone().map(SnapshotWriter::new);
    let mut shared =
        SharedContext::with_pool(spec.problem.clone(), spec.hint.clone(), spec.pool.clone());

    flow.run(&mut shared, &logger, snapshots.as_ref()).await;

    match &shared.result_summary {
        Some(summary) => logger.info(
            "orchestrator",
            format!("result_summary produced, len={}", summary.len()),
        ),
        None => logger.warning("orchestrator", "no summary produced by this worker"),
    }

    // The nodes hold logger clones; everything must drop before the
    // listener drains and the log file is complete.
    drop(flow);
    drop(logger);
    drop(bus);
    let _ = listener.await;
    shared.result_summary
}
