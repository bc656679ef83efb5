//! Conversation messages exchanged with chat-completion providers.
//!
//! Messages follow the OpenAI chat shape on the wire: a role string, text
//! content, optional provider reasoning, and (for assistant turns that
//! invoke tools) a list of tool calls paired with later tool-role results.

use serde::{Deserialize, Serialize};

/// A single function invocation emitted by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw argument payload as streamed; parsed (and repaired) at dispatch.
    pub arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

impl ToolCall {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A message in a conversation.
///
/// # Examples
///
/// ```
/// use alphasolve::message::Message;
///
/// let user = Message::user("Prove 1+1=2.");
/// assert!(user.has_role(Message::USER));
///
/// let tool = Message::tool("call_0", "4");
/// assert_eq!(tool.tool_call_id.as_deref(), Some("call_0"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// Model reasoning trace, when the provider streams one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Set on tool-role messages to pair the result with its call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// AI assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";
    /// Tool execution result message role.
    pub const TOOL: &'static str = "tool";

    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// An assistant turn carrying the streamed content, reasoning, and any
    /// accumulated tool calls.
    #[must_use]
    pub fn assistant_turn(
        content: String,
        reasoning: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            role: Self::ASSISTANT.to_string(),
            content,
            reasoning_content: reasoning.filter(|r| !r.is_empty()),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
        }
    }

    /// A tool-role message carrying a call id and the textual tool result.
    #[must_use]
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Self::TOOL.to_string(),
            content: content.into(),
            reasoning_content: None,
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Names of the tools invoked by this message, if any.
    pub fn tool_call_names(&self) -> impl Iterator<Item = &str> {
        self.tool_calls
            .iter()
            .flatten()
            .map(|call| call.function.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_roles() {
        assert_eq!(Message::user("hi").role, Message::USER);
        assert_eq!(Message::assistant("hi").role, Message::ASSISTANT);
        assert_eq!(Message::system("hi").role, Message::SYSTEM);
        assert_eq!(Message::tool("id", "out").role, Message::TOOL);
    }

    #[test]
    fn assistant_turn_drops_empty_extras() {
        let msg = Message::assistant_turn("answer".into(), Some(String::new()), vec![]);
        assert!(msg.reasoning_content.is_none());
        assert!(msg.tool_calls.is_none());
    }

    #[test]
    fn serialization_round_trip_keeps_tool_calls() {
        let msg = Message::assistant_turn(
            String::new(),
            None,
            vec![ToolCall::new("call_1", "run_python", "{\"code\":\"1+1\"}")],
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"function\""));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn tool_call_names_iterates() {
        let msg = Message::assistant_turn(
            String::new(),
            None,
            vec![
                ToolCall::new("a", "modify_statement", "{}"),
                ToolCall::new("b", "modify_proof", "{}"),
            ],
        );
        let names: Vec<_> = msg.tool_call_names().collect();
        assert_eq!(names, vec!["modify_statement", "modify_proof"]);
    }
}
