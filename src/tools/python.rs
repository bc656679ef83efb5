//! Sandboxed Python execution with a persistent per-conversation session.
//!
//! Snippets run inside a long-lived CPython subprocess executing an embedded
//! driver. The driver keeps a single environment dict across calls
//! (notebook-style persistence), prints the repr of a trailing expression,
//! enforces the matplotlib/pylab import ban in three layers (static AST
//! scan, `sys.modules` purge, import interception), and enforces the
//! wall-clock timeout cooperatively with a watchdog thread. On timeout the
//! driver rolls back key-level environment changes and reports
//! `error="timeout"`; in-place mutations of pre-existing objects are not
//! rolled back, which is documented contract.
//!
//! The Rust side holds an outer grace timeout. If the interpreter is stuck
//! in native code and cannot be interrupted, the child is killed and a fresh
//! session (with a fresh environment) is spawned on the next call.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::{required_str, names, Tool, ToolContext, ToolDefinition, ToolError};

/// Driver source executed inside the child interpreter.
const DRIVER: &str = include_str!("python_driver.py");

/// Extra wall-clock slack granted to the in-driver watchdog before the
/// child is killed from outside.
const GRACE: Duration = Duration::from_secs(15);

/// Result of one snippet execution.
#[derive(Clone, Debug, Deserialize)]
pub struct PythonOutput {
    pub stdout: String,
    pub error: Option<String>,
}

/// A persistent Python interpreter bound to one conversation.
pub struct PythonSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    dead: bool,
}

impl PythonSession {
    pub async fn spawn(python_bin: &str) -> Result<Self, ToolError> {
        let mut child = Command::new(python_bin)
            .arg("-u")
            .arg("-c")
            .arg(DRIVER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ToolError::Session(format!("failed to start {python_bin}: {err}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Session("python stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| ToolError::Session("python stdout unavailable".into()))?;
        Ok(Self {
            child,
            stdin,
            stdout,
            dead: false,
        })
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Execute one snippet in the persistent environment.
    pub async fn execute(
        &mut self,
        code: &str,
        timeout: Duration,
    ) -> Result<PythonOutput, ToolError> {
        let request = serde_json::json!({
            "code": code,
            "timeout": timeout.as_secs(),
        });
        let mut line =
            serde_json::to_string(&request).map_err(|err| ToolError::Session(err.to_string()))?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let mut response = String::new();
        match tokio::time::timeout(timeout + GRACE, self.stdout.read_line(&mut response)).await {
            Ok(Ok(0)) => {
                self.dead = true;
                Err(ToolError::Session("python driver exited".into()))
            }
            Ok(Ok(_)) => serde_json::from_str(response.trim())
                .map_err(|err| ToolError::Session(format!("bad driver response: {err}"))),
            Ok(Err(err)) => {
                self.dead = true;
                Err(err.into())
            }
            Err(_) => {
                // Interpreter stuck in native code; the cooperative watchdog
                // could not fire. Kill and let the next call respawn.
                self.dead = true;
                let _ = self.child.start_kill();
                Ok(PythonOutput {
                    stdout: String::new(),
                    error: Some("timeout".into()),
                })
            }
        }
    }
}

/// `run_python`: execute a snippet in the conversation's sandbox.
pub struct RunPythonTool;

#[async_trait]
impl Tool for RunPythonTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::RUN_PYTHON.to_string(),
            description: "Execute a Python snippet in a persistent sandboxed environment. \
                          Variables and imports survive across calls within this conversation. \
                          Captured stdout is returned; if the final statement is an expression \
                          its repr is printed. matplotlib/pylab are disabled."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Python source to execute"
                    }
                },
                "required": ["code"]
            }),
        }
    }

    async fn execute(
        &self,
        args: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let code = required_str(&args, "code")?.to_string();

        let needs_spawn = ctx.python.as_ref().map_or(true, PythonSession::is_dead);
        if needs_spawn {
            ctx.python = Some(PythonSession::spawn(&ctx.runtime.python_bin).await?);
        }
        let session = ctx
            .python
            .as_mut()
            .ok_or_else(|| ToolError::Session("python session unavailable".into()))?;

        let output = session.execute(&code, ctx.runtime.python_timeout).await?;
        Ok(render_output(output))
    }
}

fn render_output(output: PythonOutput) -> String {
    match output.error {
        Some(err) if output.stdout.is_empty() => format!("error: {err}"),
        Some(err) => format!("{}\nerror: {err}", output.stdout.trim_end()),
        None if output.stdout.is_empty() => "(no output)".to_string(),
        None => output.stdout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_combines_stdout_and_error() {
        let out = PythonOutput {
            stdout: "partial\n".into(),
            error: Some("timeout".into()),
        };
        assert_eq!(render_output(out), "partial\nerror: timeout");

        let quiet = PythonOutput {
            stdout: String::new(),
            error: None,
        };
        assert_eq!(render_output(quiet), "(no output)");
    }

    #[test]
    fn driver_source_is_embedded() {
        assert!(DRIVER.contains("BANNED_IMPORT_ROOTS"));
        assert!(DRIVER.contains("interrupt_main"));
    }
}
