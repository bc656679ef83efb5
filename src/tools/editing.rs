//! Lemma editing tools used by the refiner.
//!
//! Edits go through the lemma pool handle, so a successful tool call has
//! already mutated the current lemma by the time the conversation continues.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{required_str, names, Tool, ToolContext, ToolDefinition, ToolError};

const MAX_MARKER_LEN: usize = 100;

/// `modify_statement`: replace the current lemma's statement atomically.
pub struct ModifyStatementTool;

#[async_trait]
impl Tool for ModifyStatementTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::MODIFY_STATEMENT.to_string(),
            description: "Replace the entire statement of the current conjecture with \
                          new_statement."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "new_statement": {
                        "type": "string",
                        "description": "Full replacement statement (non-empty)"
                    }
                },
                "required": ["new_statement"]
            }),
        }
    }

    async fn execute(
        &self,
        args: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let new_statement = required_str(&args, "new_statement")?.to_string();
        if new_statement.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "new_statement must be non-empty".into(),
            ));
        }
        let id = ctx.current_lemma_id()?;
        ctx.pool.update(id, |lemma| {
            lemma.statement = new_statement;
        })?;
        Ok("statement updated".to_string())
    }
}

/// `modify_proof`: replace the span between two markers in the current
/// proof, markers inclusive.
pub struct ModifyProofTool;

#[async_trait]
impl Tool for ModifyProofTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: names::MODIFY_PROOF.to_string(),
            description: "Replace the span of the current proof between begin_marker and \
                          end_marker (both inclusive, both removed unless reintroduced) with \
                          proof_replacement. Markers must appear verbatim in the proof and be \
                          at most 100 characters each."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "begin_marker": {
                        "type": "string",
                        "description": "Start of the span, matched on first occurrence"
                    },
                    "end_marker": {
                        "type": "string",
                        "description": "End of the span, matched on first occurrence after begin_marker"
                    },
                    "proof_replacement": {
                        "type": "string",
                        "description": "Replacement text for the inclusive span"
                    }
                },
                "required": ["begin_marker", "end_marker", "proof_replacement"]
            }),
        }
    }

    async fn execute(
        &self,
        args: Map<String, Value>,
        ctx: &mut ToolContext,
    ) -> Result<String, ToolError> {
        let begin_marker = required_str(&args, "begin_marker")?.to_string();
        let end_marker = required_str(&args, "end_marker")?.to_string();
        let replacement = required_str(&args, "proof_replacement")?.to_string();

        for (field, marker) in [("begin_marker", &begin_marker), ("end_marker", &end_marker)] {
            if marker.is_empty() {
                return Err(ToolError::InvalidArguments(format!(
                    "{field} must be non-empty"
                )));
            }
            if marker.chars().count() > MAX_MARKER_LEN {
                return Err(ToolError::InvalidArguments(format!(
                    "{field} exceeds {MAX_MARKER_LEN} characters"
                )));
            }
        }

        let id = ctx.current_lemma_id()?;
        let proof = ctx
            .pool
            .get(id)
            .ok_or(ToolError::NoCurrentLemma)?
            .proof;

        let (begin_start, begin_text) = locate_marker(&proof, &begin_marker, 0)?;
        let after_begin = begin_start + begin_text.len();
        let (end_start, end_text) = locate_marker(&proof, &end_marker, after_begin)?;
        let span_end = end_start + end_text.len();

        let updated = format!("{}{}{}", &proof[..begin_start], replacement, &proof[span_end..]);
        ctx.pool.update(id, |lemma| {
            lemma.proof = updated;
        })?;
        Ok("proof updated".to_string())
    }
}

/// Find `marker` in `proof` at or after `from`, tolerating over-escaped
/// backslashes: `\\\\` collapses to `\\` and then to `\` until a candidate
/// matches. The replacement body is never rewritten this way.
fn locate_marker(proof: &str, marker: &str, from: usize) -> Result<(usize, String), ToolError> {
    let mut candidate = marker.to_string();
    for _ in 0..3 {
        if let Some(pos) = proof[from..].find(&candidate) {
            return Ok((from + pos, candidate));
        }
        let collapsed = candidate.replace("\\\\", "\\");
        if collapsed == candidate {
            break;
        }
        candidate = collapsed;
    }
    Err(ToolError::MarkerNotFound {
        marker: marker.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolRuntimeConfig;
    use crate::event_bus::Logger;
    use crate::lemma::Lemma;
    use crate::pool::LemmaPool;

    fn ctx_with_proof(proof: &str) -> ToolContext {
        let pool = LemmaPool::new();
        let id = pool
            .append(Lemma::pending("statement", proof, vec![]))
            .unwrap();
        ToolContext::new(
            pool,
            Some(id),
            ToolRuntimeConfig::default(),
            Logger::disabled(),
        )
    }

    fn args(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn modify_statement_replaces_atomically() {
        let mut ctx = ctx_with_proof("proof");
        ModifyStatementTool
            .execute(args(&[("new_statement", "better statement")]), &mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.pool.get(0).unwrap().statement, "better statement");
    }

    #[tokio::test]
    async fn modify_statement_is_idempotent() {
        let mut ctx = ctx_with_proof("proof");
        for _ in 0..2 {
            ModifyStatementTool
                .execute(args(&[("new_statement", "same")]), &mut ctx)
                .await
                .unwrap();
        }
        assert_eq!(ctx.pool.get(0).unwrap().statement, "same");
    }

    #[tokio::test]
    async fn modify_statement_rejects_empty() {
        let mut ctx = ctx_with_proof("proof");
        let err = ModifyStatementTool
            .execute(args(&[("new_statement", "  ")]), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn modify_proof_replaces_inclusive_span() {
        let mut ctx = ctx_with_proof("Step 1. Step 2 is wrong. Step 3.");
        ModifyProofTool
            .execute(
                args(&[
                    ("begin_marker", "Step 2"),
                    ("end_marker", "wrong."),
                    ("proof_replacement", "Step 2 is fixed."),
                ]),
                &mut ctx,
            )
            .await
            .unwrap();
        assert_eq!(
            ctx.pool.get(0).unwrap().proof,
            "Step 1. Step 2 is fixed. Step 3."
        );
    }

    #[tokio::test]
    async fn modify_proof_collapses_over_escaped_markers() {
        // The proof holds `\eta`; the model sent a doubled `\\eta` marker.
        let mut ctx = ctx_with_proof("We set \\eta = 1 and conclude.");
        ModifyProofTool
            .execute(
                args(&[
                    ("begin_marker", "\\\\eta = 1"),
                    ("end_marker", "conclude."),
                    ("proof_replacement", "\\eta = 2 and conclude."),
                ]),
                &mut ctx,
            )
            .await
            .unwrap();
        assert_eq!(ctx.pool.get(0).unwrap().proof, "We set \\eta = 2 and conclude.");
    }

    #[tokio::test]
    async fn modify_proof_missing_marker_is_reported() {
        let mut ctx = ctx_with_proof("short proof");
        let err = ModifyProofTool
            .execute(
                args(&[
                    ("begin_marker", "absent"),
                    ("end_marker", "proof"),
                    ("proof_replacement", "x"),
                ]),
                &mut ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MarkerNotFound { .. }));
    }

    #[tokio::test]
    async fn modify_proof_end_marker_must_follow_begin() {
        let mut ctx = ctx_with_proof("alpha beta gamma");
        let err = ModifyProofTool
            .execute(
                args(&[
                    ("begin_marker", "gamma"),
                    ("end_marker", "alpha"),
                    ("proof_replacement", "x"),
                ]),
                &mut ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MarkerNotFound { .. }));
    }

    #[tokio::test]
    async fn modify_proof_rejects_oversized_marker() {
        let mut ctx = ctx_with_proof("p");
        let long = "x".repeat(101);
        let err = ModifyProofTool
            .execute(
                args(&[
                    ("begin_marker", long.as_str()),
                    ("end_marker", "p"),
                    ("proof_replacement", "x"),
                ]),
                &mut ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
