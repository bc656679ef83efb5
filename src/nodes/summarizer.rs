//! Summarizer: renders the final reasoning path once a theorem is verified.
//!
//! Pure formatting; no LLM involved. Running it twice over the same shared
//! state produces the identical summary.

use async_trait::async_trait;

use crate::node::{Node, NodeContext, NodeError};
use crate::pool::LemmaPool;
use crate::state::SharedContext;
use crate::types::Action;

pub struct SummarizerNode;

pub enum SummarizerPrep {
    Failure,
    Ready { theorem_id: usize, pool: LemmaPool },
}

pub enum SummarizerExec {
    Failure,
    Summary(String),
}

#[async_trait]
impl Node for SummarizerNode {
    type Prep = SummarizerPrep;
    type Exec = SummarizerExec;

    async fn prep(
        &self,
        shared: &SharedContext,
        ctx: &NodeContext,
    ) -> Result<SummarizerPrep, NodeError> {
        let Some(theorem_id) = shared.current_lemma_id else {
            ctx.warning("event=no_theorem step=prep; nothing to summarize");
            return Ok(SummarizerPrep::Failure);
        };
        let Some(lemma) = shared.lemmas.get(theorem_id) else {
            ctx.warning("event=no_theorem step=prep; current lemma missing");
            return Ok(SummarizerPrep::Failure);
        };
        if !lemma.is_verified() || !lemma.is_theorem {
            ctx.warning(format!(
                "event=no_theorem step=prep lemma_id={theorem_id} status={} is_theorem={}",
                lemma.status.as_str(),
                lemma.is_theorem
            ));
            return Ok(SummarizerPrep::Failure);
        }
        Ok(SummarizerPrep::Ready {
            theorem_id,
            pool: shared.lemmas.clone(),
        })
    }

    async fn exec(
        &self,
        prep: &SummarizerPrep,
        _ctx: &NodeContext,
    ) -> Result<SummarizerExec, NodeError> {
        let SummarizerPrep::Ready { theorem_id, pool } = prep else {
            return Ok(SummarizerExec::Failure);
        };

        let mut ids = pool.reasoning_path(*theorem_id, false)?;
        ids.push(*theorem_id);
        ids.sort_unstable();
        ids.dedup();

        let lemmas = pool.snapshot();
        let blocks: Vec<String> = ids
            .iter()
            .filter_map(|&id| lemmas.get(id).map(|l| (id, l)))
            .map(|(id, lemma)| {
                format!(
                    "### Lemma {id}\n**Statement**\n{}\n**Proof**\n{}",
                    lemma.statement, lemma.proof
                )
            })
            .collect();

        Ok(SummarizerExec::Summary(blocks.join("\n\n")))
    }

    async fn post(
        &self,
        shared: &mut SharedContext,
        _prep: SummarizerPrep,
        exec: SummarizerExec,
        ctx: &NodeContext,
    ) -> Result<Action, NodeError> {
        match exec {
            SummarizerExec::Failure => Ok(Action::ExitOnFailure),
            SummarizerExec::Summary(summary) => {
                ctx.info(format!(
                    "event=summary_written step=post summary_len={}",
                    summary.len()
                ));
                shared.result_summary = Some(summary);
                Ok(Action::Done)
            }
        }
    }
}
