//! Format-reminder tools: pure functions returning the canonical response
//! shape for the solver and refiner roles. They never touch state.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{names, Tool, ToolContext, ToolDefinition, ToolError};

const SOLVER_FORMAT: &str = "\
Your final response must contain exactly one of the two shapes below, with nothing before or after:

1. An intermediate conjecture:
<conjecture>
...statement...
</conjecture>
<proof>
...proof...
</proof>
<dependency>
[ids of earlier verified lemmas this builds on, e.g. [0, 2]]
</dependency>

2. A final conjecture that fully answers the problem:
<final_conjecture>
...statement...
</final_conjecture>
<proof>
...proof...
</proof>
<dependency>
[...]
</dependency>

The <dependency> body must be a JSON array of integers ([] when there are none).";

const REFINER_FORMAT: &str = "\
Edits only take effect through tool calls: use modify_statement (new_statement) to replace the \
statement and/or modify_proof (begin_marker, end_marker, proof_replacement) to replace a span of \
the proof. Free-form text never changes the conjecture. After editing, briefly summarize what \
changed.";

/// `solver_response_format_reminder`.
pub struct SolverFormatReminderTool;

#[async_trait]
impl Tool for SolverFormatReminderTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::SOLVER_RESPONSE_FORMAT_REMINDER.to_string(),
            description: "Return the required output format for solver responses.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn execute(
        &self,
        _args: Map<String, Value>,
        _ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        Ok(SOLVER_FORMAT.to_string())
    }
}

/// `refiner_response_format_reminder`.
pub struct RefinerFormatReminderTool;

#[async_trait]
impl Tool for RefinerFormatReminderTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::REFINER_RESPONSE_FORMAT_REMINDER.to_string(),
            description: "Return the required editing workflow for refiner responses.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn execute(
        &self,
        _args: Map<String, Value>,
        _ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        Ok(REFINER_FORMAT.to_string())
    }
}
