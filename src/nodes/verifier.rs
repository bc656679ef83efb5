//! Verifier: judges the current lemma and gates advancement.

use std::sync::Arc;

use async_trait::async_trait;

use super::render_context;
use crate::lemma::LemmaStatus;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::pool::LemmaPool;
use crate::prompts;
use crate::state::SharedContext;
use crate::tools::ToolContextSeed;
use crate::types::Action;

/// Sole acceptance token; anything else means invalid.
const VALID_TOKEN: &str = "boxed{valid}";

pub struct VerifierNode {
    llm: Arc<LlmClient>,
    prompt_template: String,
    scaling_factor: u32,
    seed: ToolContextSeed,
}

impl VerifierNode {
    #[must_use]
    pub fn new(
        llm: Arc<LlmClient>,
        prompt_template: String,
        scaling_factor: u32,
        seed: ToolContextSeed,
    ) -> Self {
        Self {
            llm,
            prompt_template,
            scaling_factor,
            seed,
        }
    }

    fn build_prompt(&self, statement: &str, proof: &str, context: Option<&str>) -> String {
        let mut prompt = prompts::render(
            &self.prompt_template,
            &[("conjecture_content", statement), ("proof_content", proof)],
        );
        if let Some(context) = context {
            prompt.push('\n');
            prompt.push_str(context);
        }
        prompt
    }
}

pub struct VerifierPrep {
    lemma_id: usize,
    statement: String,
    proof: String,
    is_theorem: bool,
    context: Option<String>,
    pool: LemmaPool,
}

pub struct VerifierExec {
    valid: bool,
    answer: String,
}

#[async_trait]
impl Node for VerifierNode {
    type Prep = VerifierPrep;
    type Exec = VerifierExec;

    async fn prep(
        &self,
        shared: &SharedContext,
        ctx: &NodeContext,
    ) -> Result<VerifierPrep, NodeError> {
        let lemma_id = shared
            .current_lemma_id
            .ok_or(NodeError::MissingInput { what: "current_lemma_id" })?;
        let lemma = shared
            .lemmas
            .get(lemma_id)
            .ok_or(NodeError::MissingInput { what: "current lemma" })?;

        let path = shared.lemmas.reasoning_path(lemma_id, true)?;
        let context = render_context(&path, &shared.lemmas.snapshot());
        ctx.info(format!(
            "event=context_built step=prep lemma_id={lemma_id} ctx_size={}",
            path.len()
        ));

        Ok(VerifierPrep {
            lemma_id,
            statement: lemma.statement,
            proof: lemma.proof,
            is_theorem: lemma.is_theorem,
            context,
            pool: shared.lemmas.clone(),
        })
    }

    async fn exec(&self, prep: &VerifierPrep, ctx: &NodeContext) -> Result<VerifierExec, NodeError> {
        let prompt = self.build_prompt(&prep.statement, &prep.proof, prep.context.as_deref());

        // Scaling loop. The first invalid outcome wins and remaining
        // attempts are skipped; if every attempt is valid, the last result
        // wins. The bias toward finding faults is intentional.
        let mut last_valid: Option<String> = None;
        for attempt in 1..=self.scaling_factor.max(1) {
            let messages = vec![Message::user(&prompt)];
            let mut tool_ctx =
                self.seed
                    .context(prep.pool.clone(), Some(prep.lemma_id), ctx.logger.clone());
            let result = self
                .llm
                .get_result(&messages, None, Some(&mut tool_ctx))
                .await?;

            let valid = result.answer.contains(VALID_TOKEN);
            ctx.info(format!(
                "event=verify_attempt step=exec attempt={attempt}/{} valid={valid}",
                self.scaling_factor
            ));
            if !valid {
                return Ok(VerifierExec {
                    valid: false,
                    answer: result.answer,
                });
            }
            last_valid = Some(result.answer);
        }

        Ok(VerifierExec {
            valid: true,
            answer: last_valid.unwrap_or_default(),
        })
    }

    async fn post(
        &self,
        shared: &mut SharedContext,
        prep: VerifierPrep,
        exec: VerifierExec,
        ctx: &NodeContext,
    ) -> Result<Action, NodeError> {
        if exec.valid {
            shared
                .lemmas
                .update(prep.lemma_id, |lemma| {
                    lemma.verify_round += 1;
                    lemma.review = None;
                    lemma.set_status(LemmaStatus::Verified)
                })??;
            ctx.info(format!(
                "event=lemma_verified step=post lemma_id={} is_theorem={}",
                prep.lemma_id, prep.is_theorem
            ));
            if prep.is_theorem {
                Ok(Action::Done)
            } else {
                Ok(Action::ConjectureVerified)
            }
        } else {
            shared.lemmas.update(prep.lemma_id, |lemma| {
                lemma.verify_round += 1;
                lemma.review = Some(exec.answer);
            })?;
            ctx.info(format!(
                "event=lemma_unverified step=post lemma_id={}",
                prep.lemma_id
            ));
            Ok(Action::ConjectureUnverified)
        }
    }
}
