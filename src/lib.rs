//! # AlphaSolve: agentic mathematical problem solving
//!
//! AlphaSolve coordinates four LLM-backed roles (solver, verifier, refiner,
//! summarizer) through a directed workflow over a shared lemma graph, with
//! auxiliary computational tools (sandboxed Python, a Wolfram kernel,
//! autonomous sub-agents) dispatched mid-conversation via function calling.
//!
//! ## Core concepts
//!
//! - **Lemmas**: propositions with proofs and strictly-backward
//!   dependencies, stored in an append-only pool ([`pool::LemmaPool`])
//! - **Nodes**: three-phase units of work (`prep`/`exec`/`post`) routed by
//!   typed transition actions ([`node::Node`], [`flow::Flow`])
//! - **LLM client**: streaming multi-turn completions with tool dispatch,
//!   argument repair, and bounded retry ([`llm::LlmClient`])
//! - **Orchestrator**: N concurrent workflow replicas over the shared pool,
//!   first verified theorem wins ([`orchestrator::AlphaSolve`])
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use alphasolve::config::EngineConfig;
//! use alphasolve::llm::LlmConfig;
//! use alphasolve::orchestrator::{AlphaSolve, RoleConfigs};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base = LlmConfig::openai_compatible(
//!     "https://api.deepseek.com",
//!     "DEEPSEEK_API_KEY",
//!     "deepseek-reasoner",
//! );
//! let engine = AlphaSolve::new(
//!     "Prove that the sum of the first n odd numbers is n^2.",
//!     None,
//!     EngineConfig::default().with_workers(4, 2),
//!     RoleConfigs::uniform(base),
//! );
//! match engine.do_research().await? {
//!     Some(summary) => println!("{summary}"),
//!     None => println!("no verified theorem within quotas"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! "Verification" here means another LLM role judging correctness; the
//! engine does not formally verify mathematics, and its output is not
//! deterministic across runs.

pub mod config;
pub mod event_bus;
pub mod flow;
pub mod lemma;
pub mod llm;
pub mod message;
pub mod node;
pub mod nodes;
pub mod orchestrator;
pub mod pool;
pub mod prompts;
pub mod snapshot;
pub mod state;
pub mod telemetry;
pub mod tools;
pub mod types;
