//! Streamed chat-completion fragments and their accumulator.
//!
//! Tool-call fragments are merged by the explicit delta `index` field, never
//! by arrival order: providers may interleave fragments of several calls and
//! omit repeated ids on continuation fragments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::LlmError;
use crate::message::ToolCall;

/// One SSE data payload from an OpenAI-compatible stream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub delta: Option<StreamDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// DeepSeek-style reasoning stream.
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Terminal state of a completed stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
}

/// Everything a finished stream assembled.
#[derive(Clone, Debug)]
pub struct StreamOutcome {
    pub content: String,
    pub reasoning: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish: FinishReason,
}

#[derive(Clone, Debug, Default)]
struct ToolCallBuffer {
    id: String,
    name: String,
    arguments: String,
}

/// Assembles delta fragments into a [`StreamOutcome`].
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    content: String,
    reasoning: String,
    tool_calls: BTreeMap<u32, ToolCallBuffer>,
    finish_reason: Option<String>,
}

impl StreamAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, chunk: &StreamChunk) {
        for choice in &chunk.choices {
            if let Some(delta) = &choice.delta {
                if let Some(content) = &delta.content {
                    self.content.push_str(content);
                }
                if let Some(reasoning) = &delta.reasoning_content {
                    self.reasoning.push_str(reasoning);
                }
                for call in delta.tool_calls.iter().flatten() {
                    let index = call.index.unwrap_or(0);
                    let buffer = self.tool_calls.entry(index).or_default();
                    if let Some(id) = &call.id {
                        buffer.id.push_str(id);
                    }
                    if let Some(function) = &call.function {
                        if let Some(name) = &function.name {
                            buffer.name.push_str(name);
                        }
                        if let Some(arguments) = &function.arguments {
                            buffer.arguments.push_str(arguments);
                        }
                    }
                }
            }
            if let Some(reason) = &choice.finish_reason {
                self.finish_reason = Some(reason.clone());
            }
        }
    }

    /// Require a terminal finish reason and hand back the assembled result.
    pub fn finish(self) -> Result<StreamOutcome, LlmError> {
        let finish = match self.finish_reason.as_deref() {
            None => return Err(LlmError::MissingFinish),
            Some("stop") => FinishReason::Stop,
            Some("tool_calls") => FinishReason::ToolCalls,
            Some(other) => return Err(LlmError::BadFinish(other.to_string())),
        };
        let tool_calls = self
            .tool_calls
            .into_values()
            .map(|buf| ToolCall::new(buf.id, buf.name, buf.arguments))
            .collect();
        Ok(StreamOutcome {
            content: self.content,
            reasoning: self.reasoning,
            tool_calls,
            finish,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_chunk(text: &str) -> StreamChunk {
        StreamChunk {
            choices: vec![StreamChoice {
                delta: Some(StreamDelta {
                    content: Some(text.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }],
        }
    }

    fn tool_chunk(index: u32, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> StreamChunk {
        StreamChunk {
            choices: vec![StreamChoice {
                delta: Some(StreamDelta {
                    tool_calls: Some(vec![ToolCallDelta {
                        index: Some(index),
                        id: id.map(String::from),
                        function: Some(FunctionDelta {
                            name: name.map(String::from),
                            arguments: args.map(String::from),
                        }),
                    }]),
                    ..Default::default()
                }),
                ..Default::default()
            }],
        }
    }

    fn finish_chunk(reason: &str) -> StreamChunk {
        StreamChunk {
            choices: vec![StreamChoice {
                finish_reason: Some(reason.to_string()),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn content_concatenates() {
        let mut acc = StreamAccumulator::new();
        acc.absorb(&content_chunk("Hel"));
        acc.absorb(&content_chunk("lo"));
        acc.absorb(&finish_chunk("stop"));
        let out = acc.finish().unwrap();
        assert_eq!(out.content, "Hello");
        assert_eq!(out.finish, FinishReason::Stop);
        assert!(out.tool_calls.is_empty());
    }

    #[test]
    fn tool_call_fragments_merge_by_index_not_order() {
        let mut acc = StreamAccumulator::new();
        // Fragments of call 1 and call 0 arrive interleaved.
        acc.absorb(&tool_chunk(1, Some("call_b"), Some("run_wolfram"), Some("{\"code\"")));
        acc.absorb(&tool_chunk(0, Some("call_a"), Some("run_python"), Some("{\"co")));
        acc.absorb(&tool_chunk(1, None, None, Some(":\"2+2\"}")));
        acc.absorb(&tool_chunk(0, None, None, Some("de\":\"1+1\"}")));
        acc.absorb(&finish_chunk("tool_calls"));

        let out = acc.finish().unwrap();
        assert_eq!(out.finish, FinishReason::ToolCalls);
        assert_eq!(out.tool_calls.len(), 2);
        assert_eq!(out.tool_calls[0].id, "call_a");
        assert_eq!(out.tool_calls[0].function.name, "run_python");
        assert_eq!(out.tool_calls[0].function.arguments, "{\"code\":\"1+1\"}");
        assert_eq!(out.tool_calls[1].id, "call_b");
        assert_eq!(out.tool_calls[1].function.arguments, "{\"code\":\"2+2\"}");
    }

    #[test]
    fn missing_finish_reason_is_an_error() {
        let mut acc = StreamAccumulator::new();
        acc.absorb(&content_chunk("partial"));
        assert!(matches!(acc.finish(), Err(LlmError::MissingFinish)));
    }

    #[test]
    fn truncation_is_an_error() {
        let mut acc = StreamAccumulator::new();
        acc.absorb(&content_chunk("partial"));
        acc.absorb(&finish_chunk("length"));
        assert!(matches!(acc.finish(), Err(LlmError::BadFinish(r)) if r == "length"));
    }

    #[test]
    fn chunk_deserializes_from_provider_json() {
        let raw = r#"{"choices":[{"index":0,"delta":{"content":"hi","reasoning_content":"think"},"finish_reason":null}]}"#;
        let chunk: StreamChunk = serde_json::from_str(raw).unwrap();
        let delta = chunk.choices[0].delta.as_ref().unwrap();
        assert_eq!(delta.content.as_deref(), Some("hi"));
        assert_eq!(delta.reasoning_content.as_deref(), Some("think"));
    }
}
