//! Wolfram Language evaluation through a persistent kernel session.
//!
//! One kernel per conversation, lazily started. Evaluation is framed with
//! unique sentinels so multi-line kernel output can be captured reliably.
//! A timeout terminates the kernel outright (there is no safe way to
//! interrupt an arbitrary evaluation); the next call starts a fresh session.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::{required_str, names, Tool, ToolContext, ToolDefinition, ToolError};

/// Environment variable tried once as a fallback kernel path.
pub const WOLFRAM_KERNEL_ENV: &str = "WOLFRAM_KERNEL";

const DEFAULT_KERNEL: &str = "WolframKernel";

/// A persistent Wolfram kernel bound to one conversation.
pub struct WolframSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    dead: bool,
}

impl WolframSession {
    pub async fn spawn(kernel: &str) -> Result<Self, ToolError> {
        let mut child = Command::new(kernel)
            .arg("-noprompt")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ToolError::Session(format!("failed to start {kernel}: {err}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Session("wolfram stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| ToolError::Session("wolfram stdout unavailable".into()))?;
        Ok(Self {
            child,
            stdin,
            stdout,
            dead: false,
        })
    }

    /// Start a session from the configured path, falling back to the
    /// `WOLFRAM_KERNEL` environment variable once on startup failure.
    pub async fn spawn_with_fallback(configured: Option<&str>) -> Result<Self, ToolError> {
        let primary = configured.unwrap_or(DEFAULT_KERNEL);
        match Self::spawn(primary).await {
            Ok(session) => Ok(session),
            Err(primary_err) => match std::env::var(WOLFRAM_KERNEL_ENV) {
                Ok(fallback) if fallback != primary => Self::spawn(&fallback).await,
                _ => Err(primary_err),
            },
        }
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Evaluate one expression, returning its `InputForm` rendering.
    pub async fn evaluate(&mut self, code: &str, timeout: Duration) -> Result<String, ToolError> {
        let marker = uuid::Uuid::new_v4().simple().to_string();
        let begin = format!("<<begin:{marker}>>");
        let end = format!("<<end:{marker}>>");
        // The kernel reads one input expression per line.
        let expression = code.replace(['\n', '\r'], " ");
        let line = format!(
            "Print[\"{begin}\"]; Print[ToString[({expression}), InputForm]]; Print[\"{end}\"]\n"
        );
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let deadline = tokio::time::Instant::now() + timeout;
        let mut capturing = false;
        let mut output = Vec::new();
        loop {
            let mut buf = String::new();
            let read = tokio::time::timeout_at(deadline, self.stdout.read_line(&mut buf)).await;
            match read {
                Ok(Ok(0)) => {
                    self.dead = true;
                    return Err(ToolError::Session("wolfram kernel exited".into()));
                }
                Ok(Ok(_)) => {
                    let trimmed = buf.trim_end();
                    if trimmed == begin {
                        capturing = true;
                    } else if trimmed == end {
                        return Ok(output.join("\n"));
                    } else if capturing {
                        output.push(trimmed.to_string());
                    }
                }
                Ok(Err(err)) => {
                    self.dead = true;
                    return Err(err.into());
                }
                Err(_) => {
                    // Hard kernel termination; the caller restarts a fresh
                    // session on the next call.
                    self.dead = true;
                    let _ = self.child.start_kill();
                    return Err(ToolError::Timeout);
                }
            }
        }
    }
}

/// `run_wolfram`: evaluate one Wolfram Language expression.
pub struct RunWolframTool;

#[async_trait]
impl Tool for RunWolframTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::RUN_WOLFRAM.to_string(),
            description: "Evaluate one Wolfram Language expression in a persistent kernel \
                          session for this conversation. Returns the stringified result."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Wolfram Language expression to evaluate"
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

        let needs_spawn = ctx.wolfram.as_ref().map_or(true, WolframSession::is_dead);
        if needs_spawn {
            ctx.wolfram =
                Some(WolframSession::spawn_with_fallback(ctx.runtime.wolfram_kernel.as_deref()).await?);
        }
        let session = ctx
            .wolfram
            .as_mut()
            .ok_or_else(|| ToolError::Session("wolfram session unavailable".into()))?;

        session.evaluate(&code, ctx.runtime.wolfram_timeout).await
    }
}
