//! Streaming, tool-augmented chat-completion client.
//!
//! The client speaks to any OpenAI-compatible endpoint through the
//! [`ChatProvider`] seam, assembles streamed delta fragments (including
//! sparse-indexed tool calls), dispatches tool invocations through the tool
//! runtime, and retries the whole conversation from its baseline when the
//! provider misbehaves.

mod client;
mod config;
mod provider;
pub mod repair;
mod stream;

pub use client::{LlmClient, LlmResult};
pub use config::LlmConfig;
pub use provider::{ChatProvider, ChatRequest, ChatStream, HttpProvider};
pub use stream::{
    FinishReason, FunctionDelta, StreamAccumulator, StreamChoice, StreamChunk, StreamDelta,
    StreamOutcome, ToolCallDelta,
};

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by the LLM client and providers.
///
/// Everything except [`LlmError::MissingApiKey`] is considered retryable by
/// the client: a retry restarts from the baseline messages, never from a
/// partial stream.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("API key environment variable {env} is not set")]
    #[diagnostic(
        code(alphasolve::llm::missing_api_key),
        help("Export {env} or point the role config at a different variable.")
    )]
    MissingApiKey { env: String },

    #[error("provider request failed: {0}")]
    #[diagnostic(code(alphasolve::llm::transport))]
    Transport(String),

    #[error("provider returned status {status}: {body}")]
    #[diagnostic(code(alphasolve::llm::status))]
    Status { status: u16, body: String },

    #[error("stream decode failed: {0}")]
    #[diagnostic(code(alphasolve::llm::stream))]
    Stream(String),

    #[error("stream ended without a terminal finish_reason")]
    #[diagnostic(code(alphasolve::llm::missing_finish))]
    MissingFinish,

    #[error("unexpected finish_reason: {0}")]
    #[diagnostic(
        code(alphasolve::llm::bad_finish),
        help("Only `stop` and `tool_calls` are terminal; `length` means the response was truncated.")
    )]
    BadFinish(String),

    #[error("model invoked tools but no tool context was supplied")]
    #[diagnostic(code(alphasolve::llm::no_tool_context))]
    NoToolContext,

    #[error("llm call failed after {attempts} attempts: {last}")]
    #[diagnostic(code(alphasolve::llm::retries_exhausted))]
    RetriesExhausted { attempts: u32, last: String },
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}
