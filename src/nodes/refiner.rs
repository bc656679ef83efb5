//! Refiner: edits the current lemma in response to a verifier review.
//!
//! The refiner continues the lemma's own conversation history. All edits
//! must go through the `modify_statement` / `modify_proof` tools; when the
//! model edited nothing, the new transcript is discarded so a useless turn
//! does not pollute the history.

use std::sync::Arc;

use async_trait::async_trait;

use crate::lemma::LemmaStatus;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::pool::LemmaPool;
use crate::state::SharedContext;
use crate::tools::{names, ToolContextSeed};
use crate::types::Action;

const REFINE_INSTRUCTIONS: &str = "\
Repair the current conjecture statement and/or proof so they satisfy the review. Focus on the \
mathematics first; editing tools are just the delivery mechanism.

Workflow:
1. Read the review carefully and decide the precise edits needed in the statement and/or proof.
2. You MUST call one (or both) of the editing tools to make changes:
   - `modify_statement` (provide `new_statement`) to replace the entire conjecture statement.
   - `modify_proof` (provide `begin_marker`, `end_marker`, `proof_replacement`) to replace a span \
of the proof.
   Direct text replies never modify the conjecture - only tool calls do.

Proof-anchor reminder:
- `begin_marker` and `end_marker` are inclusive: both are removed along with the replaced span \
unless reintroduced in `proof_replacement`.
- Each marker must be at most 100 characters and must appear verbatim in the current proof.
- Make incremental edits; you can call `modify_proof` multiple times.

After successfully refining the conjecture/proof, briefly summarize what changed (no follow-up \
questions).";

pub struct RefinerNode {
    llm: Arc<LlmClient>,
    max_verify_and_refine_round: u32,
    seed: ToolContextSeed,
}

impl RefinerNode {
    #[must_use]
    pub fn new(
        llm: Arc<LlmClient>,
        max_verify_and_refine_round: u32,
        seed: ToolContextSeed,
    ) -> Self {
        Self {
            llm,
            max_verify_and_refine_round,
            seed,
        }
    }
}

pub enum RefinerPrep {
    Exausted {
        lemma_id: usize,
    },
    Normal {
        lemma_id: usize,
        history: Vec<Message>,
        review: String,
        pool: LemmaPool,
    },
}

pub enum RefinerExec {
    Exausted,
    Refined {
        lemma_id: usize,
        history: Vec<Message>,
    },
}

#[async_trait]
impl Node for RefinerNode {
    type Prep = RefinerPrep;
    type Exec = RefinerExec;

    async fn prep(
        &self,
        shared: &SharedContext,
        ctx: &NodeContext,
    ) -> Result<RefinerPrep, NodeError> {
        let lemma_id = shared
            .current_lemma_id
            .ok_or(NodeError::MissingInput { what: "current_lemma_id" })?;
        let lemma = shared
            .lemmas
            .get(lemma_id)
            .ok_or(NodeError::MissingInput { what: "current lemma" })?;

        if lemma.verify_round >= self.max_verify_and_refine_round {
            ctx.warning(format!(
                "event=quota_exhausted step=prep lemma_id={lemma_id} verify_round={}",
                lemma.verify_round
            ));
            return Ok(RefinerPrep::Exausted { lemma_id });
        }

        Ok(RefinerPrep::Normal {
            lemma_id,
            history: lemma.history_messages,
            review: lemma.review.unwrap_or_default(),
            pool: shared.lemmas.clone(),
        })
    }

    async fn exec(&self, prep: &RefinerPrep, ctx: &NodeContext) -> Result<RefinerExec, NodeError> {
        let RefinerPrep::Normal {
            lemma_id,
            history,
            review,
            pool,
        } = prep
        else {
            return Ok(RefinerExec::Exausted);
        };

        let mut messages = history.clone();
        messages.push(Message::user(&format!(
            "{REFINE_INSTRUCTIONS}\n\n<review>\n{review}\n</review>\n"
        )));
        let baseline_len = messages.len();

        let mut tool_ctx = self
            .seed
            .context(pool.clone(), Some(*lemma_id), ctx.logger.clone());
        let result = self
            .llm
            .get_result(&messages, None, Some(&mut tool_ctx))
            .await?;

        let edited = result.messages[baseline_len.min(result.messages.len())..]
            .iter()
            .filter(|m| m.has_role(Message::ASSISTANT))
            .any(|m| {
                m.tool_call_names()
                    .any(|name| name == names::MODIFY_STATEMENT || name == names::MODIFY_PROOF)
            });

        let history = if edited {
            result.messages
        } else {
            // No useful edit: drop the whole turn and keep the original
            // transcript for the next round.
            ctx.warning(format!(
                "event=no_editing_tool_used step=exec lemma_id={lemma_id}; reverting transcript"
            ));
            history.clone()
        };

        Ok(RefinerExec::Refined {
            lemma_id: *lemma_id,
            history,
        })
    }

    async fn post(
        &self,
        shared: &mut SharedContext,
        prep: RefinerPrep,
        exec: RefinerExec,
        ctx: &NodeContext,
    ) -> Result<Action, NodeError> {
        match exec {
            RefinerExec::Exausted => {
                let RefinerPrep::Exausted { lemma_id } = prep else {
                    return Ok(Action::ExitOnError);
                };
                // Rejected lemmas never come back: they are excluded from
                // verified context and from read_lemma.
                shared
                    .lemmas
                    .update(lemma_id, |lemma| lemma.set_status(LemmaStatus::Rejected))??;
                ctx.warning(format!(
                    "event=lemma_rejected step=post lemma_id={lemma_id}"
                ));
                Ok(Action::ExitOnExausted)
            }
            RefinerExec::Refined { lemma_id, history } => {
                shared.lemmas.update(lemma_id, |lemma| {
                    lemma.history_messages = history;
                    lemma.set_status(LemmaStatus::Pending)
                })??;
                ctx.info(format!(
                    "event=refine_done step=post lemma_id={lemma_id}"
                ));
                Ok(Action::RefineSuccess)
            }
        }
    }
}
