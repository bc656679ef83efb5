//! Solver: proposes the next conjecture.

use std::sync::Arc;

use async_trait::async_trait;

use super::{extract_tag, render_context};
use crate::lemma::Lemma;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::pool::LemmaPool;
use crate::prompts;
use crate::state::SharedContext;
use crate::tools::ToolContextSeed;
use crate::types::Action;

/// Acceptance token of the secondary is-theorem judgement.
const THEOREM_TOKEN: &str = "boxed{yes}";

pub struct SolverNode {
    llm: Arc<LlmClient>,
    prompt_template: String,
    theorem_template: String,
    max_lemma_num: usize,
    check_is_theorem: bool,
    seed: ToolContextSeed,
}

impl SolverNode {
    #[must_use]
    pub fn new(
        llm: Arc<LlmClient>,
        prompt_template: String,
        theorem_template: String,
        max_lemma_num: usize,
        check_is_theorem: bool,
        seed: ToolContextSeed,
    ) -> Self {
        Self {
            llm,
            prompt_template,
            theorem_template,
            max_lemma_num,
            check_is_theorem,
            seed,
        }
    }

    fn build_prompt(&self, shared: &SharedContext) -> String {
        let remaining = self.max_lemma_num.saturating_sub(shared.lemmas.len());
        let mut prompt = prompts::render(
            &self.prompt_template,
            &[
                ("problem_content", shared.problem.as_str()),
                ("remaining_lemma_quota", &remaining.to_string()),
            ],
        );

        let lemmas = shared.lemmas.snapshot();
        let verified: Vec<usize> = lemmas
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_verified())
            .map(|(i, _)| i)
            .collect();
        if let Some(context) = render_context(&verified, &lemmas) {
            prompt.push('\n');
            prompt.push_str(&context);
        }
        if let Some(hint) = &shared.hint {
            prompt.push_str("\n\n## Hint\n");
            prompt.push_str(hint);
        }
        prompt
    }

    /// Secondary yes/no judgement: does the statement fully address the
    /// problem? A judge failure falls back to the tag shape the solver chose.
    async fn judge_is_theorem(
        &self,
        problem: &str,
        statement: &str,
        final_flag: bool,
        ctx: &NodeContext,
    ) -> bool {
        if !self.check_is_theorem {
            return final_flag;
        }
        let prompt = prompts::render(
            &self.theorem_template,
            &[
                ("problem_content", problem),
                ("conjecture_content", statement),
            ],
        );
        let messages = vec![Message::user(&prompt)];
        match self.llm.get_result(&messages, Some(&[]), None).await {
            Ok(result) => result.answer.contains(THEOREM_TOKEN),
            Err(err) => {
                ctx.warning(format!(
                    "event=is_theorem_check_failed error={err}; falling back to tag shape"
                ));
                final_flag
            }
        }
    }
}

pub enum SolverPrep {
    Exausted,
    Normal {
        messages: Vec<Message>,
        pool: LemmaPool,
    },
}

pub enum SolverExec {
    Exausted,
    Proposed {
        lemma: Lemma,
        /// The solver used `<final_conjecture>` tags.
        final_flag: bool,
    },
}

#[async_trait]
impl Node for SolverNode {
    type Prep = SolverPrep;
    type Exec = SolverExec;

    async fn prep(
        &self,
        shared: &SharedContext,
        ctx: &NodeContext,
    ) -> Result<SolverPrep, NodeError> {
        if shared.lemmas.len() >= self.max_lemma_num {
            ctx.warning(format!(
                "event=quota_exhausted step=prep lemma_count={} max={}",
                shared.lemmas.len(),
                self.max_lemma_num
            ));
            return Ok(SolverPrep::Exausted);
        }

        let prompt = self.build_prompt(shared);
        let messages = vec![
            Message::system(prompts::SOLVER_SYSTEM),
            Message::user(&prompt),
        ];
        ctx.info(format!(
            "event=prompt_built step=prep prompt_len={}",
            prompt.len()
        ));
        Ok(SolverPrep::Normal {
            messages,
            pool: shared.lemmas.clone(),
        })
    }

    async fn exec(&self, prep: &SolverPrep, ctx: &NodeContext) -> Result<SolverExec, NodeError> {
        let SolverPrep::Normal { messages, pool } = prep else {
            return Ok(SolverExec::Exausted);
        };

        let mut tool_ctx = self.seed.context(pool.clone(), None, ctx.logger.clone());
        let result = self
            .llm
            .get_result(messages, None, Some(&mut tool_ctx))
            .await?;

        let (statement, final_flag) = match extract_tag(&result.answer, "final_conjecture") {
            Some(statement) => (statement, true),
            None => (
                extract_tag(&result.answer, "conjecture").ok_or_else(|| {
                    NodeError::Format("missing <conjecture> tags in solver response".into())
                })?,
                false,
            ),
        };
        if statement.is_empty() {
            return Err(NodeError::Format("empty conjecture statement".into()));
        }
        let proof = extract_tag(&result.answer, "proof")
            .ok_or_else(|| NodeError::Format("missing <proof> tags in solver response".into()))?;
        let deps_raw = extract_tag(&result.answer, "dependency").ok_or_else(|| {
            NodeError::Format("missing <dependency> tags in solver response".into())
        })?;
        let raw_deps: Vec<i64> = serde_json::from_str(deps_raw.trim())
            .map_err(|err| NodeError::Format(format!("invalid dependency array: {err}")))?;

        // Out-of-range entries are dropped, not a hard error: other workers
        // may grow the pool underneath us, and models occasionally cite ids
        // that never existed.
        let observed_len = pool.len() as i64;
        let dependencies: Vec<usize> = raw_deps
            .into_iter()
            .filter(|&d| d >= 0 && d < observed_len)
            .map(|d| d as usize)
            .collect();

        ctx.info(format!(
            "event=conjecture_extracted step=exec final={final_flag} deps={dependencies:?}"
        ));
        let lemma =
            Lemma::pending(statement, proof, dependencies).with_history(result.messages);
        Ok(SolverExec::Proposed { lemma, final_flag })
    }

    async fn post(
        &self,
        shared: &mut SharedContext,
        _prep: SolverPrep,
        exec: SolverExec,
        ctx: &NodeContext,
    ) -> Result<Action, NodeError> {
        let SolverExec::Proposed {
            mut lemma,
            final_flag,
        } = exec
        else {
            return Ok(Action::ExitOnExausted);
        };

        lemma.is_theorem = self
            .judge_is_theorem(&shared.problem, &lemma.statement, final_flag, ctx)
            .await;

        let id = shared.lemmas.append(lemma)?;
        shared.current_lemma_id = Some(id);
        ctx.info(format!(
            "event=lemma_appended step=post lemma_id={id} is_theorem={}",
            shared
                .lemmas
                .get(id)
                .map(|l| l.is_theorem)
                .unwrap_or_default()
        ));
        Ok(Action::ConjectureGenerated)
    }
}
