//! Shared test support: scripted chat providers that drive the real
//! streaming accumulator, tool-dispatch loop, and retry logic without a
//! network.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use parking_lot::Mutex;

use alphasolve::llm::{
    ChatProvider, ChatRequest, ChatStream, FunctionDelta, LlmError, StreamChoice, StreamChunk,
    StreamDelta, ToolCallDelta,
};

/// One scripted provider turn.
#[derive(Clone, Debug)]
pub enum Scripted {
    /// Stream the text in two fragments, then `finish_reason: stop`.
    Text(String),
    /// Stream tool calls (id, name, arguments) fragment-wise, then
    /// `finish_reason: tool_calls`.
    ToolCalls(Vec<(String, String, String)>),
    /// Stream the text, then a non-terminal `finish_reason: length`.
    Truncated(String),
    /// Stream the text and end without any finish_reason.
    NoFinish(String),
}

pub fn text(s: &str) -> Scripted {
    Scripted::Text(s.to_string())
}

pub fn tool_call(id: &str, name: &str, args: &str) -> Scripted {
    Scripted::ToolCalls(vec![(id.to_string(), name.to_string(), args.to_string())])
}

fn content_chunk(text: &str) -> StreamChunk {
    StreamChunk {
        choices: vec![StreamChoice {
            index: Some(0),
            delta: Some(StreamDelta {
                content: Some(text.to_string()),
                ..Default::default()
            }),
            finish_reason: None,
        }],
    }
}

fn finish_chunk(reason: &str) -> StreamChunk {
    StreamChunk {
        choices: vec![StreamChoice {
            index: Some(0),
            delta: None,
            finish_reason: Some(reason.to_string()),
        }],
    }
}

fn tool_chunks(calls: &[(String, String, String)]) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();
    for (index, (id, name, args)) in calls.iter().enumerate() {
        // Split arguments across two fragments to exercise index-keyed
        // accumulation.
        let midpoint = args.len() / 2;
        let (head, tail) = args.split_at(midpoint);
        chunks.push(StreamChunk {
            choices: vec![StreamChoice {
                index: Some(0),
                delta: Some(StreamDelta {
                    tool_calls: Some(vec![ToolCallDelta {
                        index: Some(index as u32),
                        id: Some(id.clone()),
                        function: Some(FunctionDelta {
                            name: Some(name.clone()),
                            arguments: Some(head.to_string()),
                        }),
                    }]),
                    ..Default::default()
                }),
                finish_reason: None,
            }],
        });
        chunks.push(StreamChunk {
            choices: vec![StreamChoice {
                index: Some(0),
                delta: Some(StreamDelta {
                    tool_calls: Some(vec![ToolCallDelta {
                        index: Some(index as u32),
                        id: None,
                        function: Some(FunctionDelta {
                            name: None,
                            arguments: Some(tail.to_string()),
                        }),
                    }]),
                    ..Default::default()
                }),
                finish_reason: None,
            }],
        });
    }
    chunks
}

impl Scripted {
    fn chunks(&self) -> Vec<StreamChunk> {
        match self {
            Scripted::Text(text) => {
                let midpoint = text.len() / 2;
                let (head, tail) = text.split_at(midpoint);
                vec![
                    content_chunk(head),
                    content_chunk(tail),
                    finish_chunk("stop"),
                ]
            }
            Scripted::ToolCalls(calls) => {
                let mut chunks = tool_chunks(calls);
                chunks.push(finish_chunk("tool_calls"));
                chunks
            }
            Scripted::Truncated(text) => vec![content_chunk(text), finish_chunk("length")],
            Scripted::NoFinish(text) => vec![content_chunk(text)],
        }
    }
}

/// Pops scripted turns in order and records every request it saw.
pub struct QueueProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl QueueProvider {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl ChatProvider for QueueProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LlmError> {
        self.requests.lock().push(request);
        let turn = self
            .script
            .lock()
            .pop_front()
            .ok_or_else(|| LlmError::Transport("scripted provider exhausted".to_string()))?;
        let chunks: Vec<Result<StreamChunk, LlmError>> =
            turn.chunks().into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}
