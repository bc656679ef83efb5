//! Read-only helper tools.
//!
//! These return plain text rather than JSON so LaTeX backslashes reach the
//! model unmangled.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{names, Tool, ToolContext, ToolDefinition, ToolError};
use crate::lemma::LemmaStatus;

/// `read_lemma`: full statement and proof of a verified lemma.
pub struct ReadLemmaTool;

#[async_trait]
impl Tool for ReadLemmaTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::READ_LEMMA.to_string(),
            description: "Read the full statement and proof of a verified lemma by id. \
                          Only verified lemmas are readable."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "lemma_id": {
                        "type": "integer",
                        "description": "Id of the lemma to read"
                    }
                },
                "required": ["lemma_id"]
            }),
        }
    }

    async fn execute(
        &self,
        args: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let lemma_id = args
            .get("lemma_id")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ToolError::InvalidArguments("missing integer field 'lemma_id'".into())
            })? as usize;

        let verified = ctx.pool.verified_ids();
        let Some(lemma) = ctx.pool.get(lemma_id) else {
            return Ok(format!(
                "error: lemma {lemma_id} does not exist; valid ids are 0..{} and verified ids are {verified:?}",
                ctx.pool.len()
            ));
        };

        Ok(match lemma.status {
            LemmaStatus::Verified => format!(
                "Lemma {lemma_id}\nStatement:\n{}\nProof:\n{}",
                lemma.statement, lemma.proof
            ),
            LemmaStatus::Rejected => format!(
                "warning: lemma {lemma_id} was rejected and cannot be relied on; \
                 verified lemma ids are {verified:?}"
            ),
            LemmaStatus::Pending => format!(
                "lemma {lemma_id} is not yet verified and cannot be read; \
                 verified lemma ids are {verified:?}"
            ),
        })
    }
}

/// `read_current_conjecture_again`: the current lemma, LaTeX-wrapped.
pub struct ReadCurrentConjectureTool;

#[async_trait]
impl Tool for ReadCurrentConjectureTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::READ_CURRENT_CONJECTURE_AGAIN.to_string(),
            description: "Re-read the current conjecture statement and proof exactly as stored."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn execute(
        &self,
        _args: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let id = ctx.current_lemma_id()?;
        let lemma = ctx.pool.get(id).ok_or(ToolError::NoCurrentLemma)?;
        Ok(format!(
            "\\begin{{conjecture}}\n{}\n\\end{{conjecture}}\n\\begin{{proof}}\n{}\n\\end{{proof}}",
            lemma.statement, lemma.proof
        ))
    }
}

/// `read_review_again`: the current verifier review.
pub struct ReadReviewTool;

#[async_trait]
impl Tool for ReadReviewTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::READ_REVIEW_AGAIN.to_string(),
            description: "Re-read the verifier review of the current conjecture.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn execute(
        &self,
        _args: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let id = ctx.current_lemma_id()?;
        let lemma = ctx.pool.get(id).ok_or(ToolError::NoCurrentLemma)?;
        Ok(lemma
            .review
            .unwrap_or_else(|| "no review available for the current conjecture".to_string()))
    }
}
