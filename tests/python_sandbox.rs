//! Exercises the real sandbox subprocess. These tests need a `python3` on
//! PATH, so they are ignored by default; run with `cargo test -- --ignored`
//! on a machine with an interpreter.

use std::time::Duration;

use alphasolve::tools::PythonSession;

async fn session() -> PythonSession {
    PythonSession::spawn("python3").await.expect("python3 on PATH")
}

#[tokio::test]
#[ignore = "requires a python3 interpreter on PATH"]
async fn environment_persists_across_calls() {
    let mut session = session().await;
    let timeout = Duration::from_secs(30);

    let out = session.execute("x = 1", timeout).await.unwrap();
    assert!(out.error.is_none());

    let out = session.execute("x + 1", timeout).await.unwrap();
    assert!(out.error.is_none());
    // Final expression repr, notebook style.
    assert_eq!(out.stdout.trim(), "2");
}

#[tokio::test]
#[ignore = "requires a python3 interpreter on PATH"]
async fn timeout_rolls_back_new_keys_and_keeps_old_ones() {
    let mut session = session().await;
    let timeout = Duration::from_secs(30);

    session.execute("x = 1", timeout).await.unwrap();

    // Busy loop: the in-driver watchdog interrupts it and rolls back `y`.
    let out = session
        .execute("y = 2\nwhile True: pass", Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(out.error.as_deref(), Some("timeout"));

    let out = session.execute("'y' in dir()", timeout).await.unwrap();
    assert_eq!(out.stdout.trim(), "False");

    let out = session.execute("x", timeout).await.unwrap();
    assert_eq!(out.stdout.trim(), "1");
}

#[tokio::test]
#[ignore = "requires a python3 interpreter on PATH"]
async fn matplotlib_imports_are_rejected_statically() {
    let mut session = session().await;
    let out = session
        .execute("import matplotlib.pyplot as plt", Duration::from_secs(30))
        .await
        .unwrap();
    assert!(out.error.unwrap().contains("disabled in this runtime"));
}

#[tokio::test]
#[ignore = "requires a python3 interpreter on PATH"]
async fn dynamic_banned_imports_are_intercepted() {
    let mut session = session().await;
    let out = session
        .execute(
            "import importlib\ntry:\n    importlib.import_module('pylab')\n    print('imported')\nexcept ImportError as e:\n    print('blocked')",
            Duration::from_secs(30),
        )
        .await
        .unwrap();
    assert_eq!(out.stdout.trim(), "blocked");
}

#[tokio::test]
#[ignore = "requires a python3 interpreter on PATH"]
async fn exceptions_come_back_as_tracebacks() {
    let mut session = session().await;
    let out = session
        .execute("1 / 0", Duration::from_secs(30))
        .await
        .unwrap();
    assert!(out.error.unwrap().contains("ZeroDivisionError"));
}
