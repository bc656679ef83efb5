//! End-to-end workflow scenarios driven by scripted providers.
//!
//! One worker, shared pool: within a worker the flow is single-threaded, so
//! the provider sees a deterministic sequence of conversations.

mod common;

use std::sync::Arc;

use alphasolve::config::EngineConfig;
use alphasolve::lemma::LemmaStatus;
use alphasolve::llm::LlmConfig;
use alphasolve::orchestrator::{AlphaSolve, RoleConfigs};
use alphasolve::tools::names;

use common::{text, tool_call, QueueProvider};

fn engine_config(dir: &std::path::Path) -> EngineConfig {
    EngineConfig::default()
        .with_workers(1, 1)
        .with_echo_to_console(false)
        .with_log_dir(dir.join("logs"))
}

fn build(
    problem: &str,
    config: EngineConfig,
    provider: Arc<QueueProvider>,
) -> AlphaSolve {
    let base = LlmConfig::openai_compatible("http://unused", "UNUSED_KEY", "scripted")
        .with_max_api_retry(1);
    AlphaSolve::new(problem, None, config, RoleConfigs::uniform(base)).with_provider(provider)
}

#[tokio::test]
async fn trivial_success_produces_single_lemma_summary() {
    let dir = tempfile::tempdir().unwrap();
    let provider = QueueProvider::new([
        // Solver proposes the final conjecture directly.
        text("<final_conjecture>1+1=2</final_conjecture><proof>definition.</proof><dependency>[]</dependency>"),
        // Secondary is-theorem check.
        text("boxed{yes}"),
        // Verifier scaling loop: three valid verdicts; the bare token is
        // sufficient.
        text("boxed{valid}"),
        text("boxed{valid}"),
        text("boxed{valid}"),
    ]);
    let engine = build(
        "Prove 1+1=2.",
        engine_config(dir.path()).with_scaling_factor(3),
        provider.clone(),
    );

    let summary = engine.do_research().await.unwrap().expect("summary");
    assert!(summary.contains("### Lemma 0"));
    assert_eq!(summary.matches("### Lemma").count(), 1);
    assert!(summary.contains("**Statement**\n1+1=2"));
    assert!(summary.contains("**Proof**\ndefinition."));
    assert_eq!(provider.remaining(), 0);

    let lemma = engine.pool().get(0).unwrap();
    assert_eq!(lemma.status, LemmaStatus::Verified);
    assert!(lemma.is_theorem);
    assert_eq!(lemma.verify_round, 1);
}

#[tokio::test]
async fn chained_lemmas_are_enumerated_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let provider = QueueProvider::new([
        // Lemma 0: an intermediate step.
        text("<conjecture>step one</conjecture><proof>base case.</proof><dependency>[]</dependency>"),
        text("boxed{no}"),
        text("looks right. boxed{valid}"),
        // Lemma 1: the theorem, depending on lemma 0.
        text("<final_conjecture>the answer</final_conjecture><proof>follows from step one.</proof><dependency>[0]</dependency>"),
        text("boxed{yes}"),
        text("boxed{valid}"),
    ]);
    let engine = build(
        "Chain problem.",
        engine_config(dir.path()).with_scaling_factor(1),
        provider.clone(),
    );

    let summary = engine.do_research().await.unwrap().expect("summary");
    let first = summary.find("### Lemma 0").expect("lemma 0 block");
    let second = summary.find("### Lemma 1").expect("lemma 1 block");
    assert!(first < second);
    assert_eq!(summary.matches("### Lemma").count(), 2);

    assert_eq!(engine.pool().get(1).unwrap().dependencies, vec![0]);
    assert!(!engine.pool().get(0).unwrap().is_theorem);
}

#[tokio::test]
async fn refine_cycle_repairs_the_proof() {
    let dir = tempfile::tempdir().unwrap();
    let provider = QueueProvider::new([
        text("<final_conjecture>claim</final_conjecture><proof>Step 1 ok. Step 3 wrong. QED.</proof><dependency>[]</dependency>"),
        text("boxed{yes}"),
        // First verification finds the fault.
        text("step 3 wrong"),
        // Refiner edits through the tool, then summarizes.
        tool_call(
            "call_0",
            names::MODIFY_PROOF,
            r#"{"begin_marker": "Step 3", "end_marker": "wrong.", "proof_replacement": "Step 3 right."}"#,
        ),
        text("replaced the faulty step"),
        // Second verification passes.
        text("boxed{valid}"),
    ]);
    let engine = build(
        "Refine problem.",
        engine_config(dir.path()).with_scaling_factor(1),
        provider.clone(),
    );

    let summary = engine.do_research().await.unwrap();
    assert!(summary.is_some());

    let lemma = engine.pool().get(0).unwrap();
    assert_eq!(lemma.status, LemmaStatus::Verified);
    assert_eq!(lemma.verify_round, 2);
    assert_eq!(lemma.proof, "Step 1 ok. Step 3 right. QED.");
    assert!(lemma.review.is_none());
}

#[tokio::test]
async fn exhausted_refine_quota_rejects_lemma_and_returns_null() {
    let dir = tempfile::tempdir().unwrap();
    let provider = QueueProvider::new([
        text("<conjecture>doomed</conjecture><proof>wrong proof.</proof><dependency>[]</dependency>"),
        text("boxed{no}"),
        text("this is wrong"),
        tool_call(
            "call_0",
            names::MODIFY_STATEMENT,
            r#"{"new_statement": "still doomed"}"#,
        ),
        text("tried an edit"),
        text("still wrong"),
        // Refiner quota (2) now spent: lemma rejected, solver quota (1)
        // spent too, summarizer finds no theorem.
    ]);
    let engine = build(
        "Hopeless problem.",
        engine_config(dir.path())
            .with_scaling_factor(1)
            .with_max_lemma_num(1)
            .with_max_verify_and_refine_round(2),
        provider.clone(),
    );

    let summary = engine.do_research().await.unwrap();
    assert!(summary.is_none());
    assert_eq!(provider.remaining(), 0);

    let lemma = engine.pool().get(0).unwrap();
    assert_eq!(lemma.status, LemmaStatus::Rejected);
    assert_eq!(lemma.verify_round, 2);
    assert_eq!(lemma.statement, "still doomed");
}

#[tokio::test]
async fn zero_lemma_quota_terminates_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let provider = QueueProvider::new([]);
    let engine = build(
        "Any problem.",
        engine_config(dir.path()).with_max_lemma_num(0),
        provider.clone(),
    );

    let summary = engine.do_research().await.unwrap();
    assert!(summary.is_none());
    assert!(engine.pool().is_empty());
    // No LLM traffic at all.
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn malformed_solver_output_is_retried_via_error_edge() {
    let dir = tempfile::tempdir().unwrap();
    let provider = QueueProvider::new([
        // Missing tags: routed Solver -> Solver through exit_on_error.
        text("I think the answer is 42 but I forgot the format."),
        text("<final_conjecture>42</final_conjecture><proof>by thought.</proof><dependency>[]</dependency>"),
        text("boxed{yes}"),
        text("boxed{valid}"),
    ]);
    let engine = build(
        "Format problem.",
        engine_config(dir.path()).with_scaling_factor(1),
        provider.clone(),
    );

    let summary = engine.do_research().await.unwrap();
    assert!(summary.is_some());
    assert_eq!(engine.pool().len(), 1);
}

#[tokio::test]
async fn rejected_lemmas_never_reenter_solver_context() {
    let dir = tempfile::tempdir().unwrap();
    let provider = QueueProvider::new([
        // Lemma 0 fails verification and is rejected (quota 1).
        text("<conjecture>bad idea</conjecture><proof>nope.</proof><dependency>[]</dependency>"),
        text("boxed{no}"),
        text("wrong"),
        // Lemma 1 succeeds.
        text("<final_conjecture>good idea</final_conjecture><proof>yes.</proof><dependency>[]</dependency>"),
        text("boxed{yes}"),
        text("boxed{valid}"),
    ]);
    let engine = build(
        "Rejection problem.",
        engine_config(dir.path())
            .with_scaling_factor(1)
            .with_max_lemma_num(2)
            .with_max_verify_and_refine_round(1),
        provider.clone(),
    );

    let summary = engine.do_research().await.unwrap().expect("summary");
    assert!(!summary.contains("bad idea"));
    assert_eq!(engine.pool().get(0).unwrap().status, LemmaStatus::Rejected);

    // The second solver prompt must not list the rejected lemma as context.
    let requests = provider.requests();
    let second_solver_prompt = &requests[3].messages[1].content;
    assert!(!second_solver_prompt.contains("bad idea"));
}
