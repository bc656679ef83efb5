//! The four workflow roles: solver, verifier, refiner, summarizer.

mod refiner;
mod solver;
mod summarizer;
mod verifier;

pub use refiner::RefinerNode;
pub use solver::SolverNode;
pub use summarizer::SummarizerNode;
pub use verifier::VerifierNode;

use crate::lemma::Lemma;

/// Extract the inner text of the first `<tag>…</tag>` region.
///
/// Returns `None` when either tag is missing or they are out of order.
pub(crate) fn extract_tag(text: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let begin = text.find(&open)?;
    let after_open = begin + open.len();
    let end = text[after_open..].find(&close)? + after_open;
    Some(text[after_open..end].trim().to_string())
}

/// Render verified context lemmas the way every role shares them: header,
/// preamble, then one statement per entry (proofs are withheld).
pub(crate) fn render_context(ctx_ids: &[usize], lemmas: &[Lemma]) -> Option<String> {
    if ctx_ids.is_empty() {
        return None;
    }
    let mut lines = vec![
        "## Context and History Explorations".to_string(),
        String::new(),
        "Here is a list of context that we have collected for this problem or our history \
         findings during exploration. They serve as the background of the conjecture and proof \
         and can be accepted without controversy as correct."
            .to_string(),
        String::new(),
    ];
    for (i, &lemma_id) in ctx_ids.iter().enumerate() {
        if let Some(lemma) = lemmas.get(lemma_id) {
            lines.push(format!(" ** Conjecture-{i} **"));
            lines.push(format!(" {}", lemma.statement));
        }
    }
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lemma::Lemma;

    #[test]
    fn extract_tag_takes_first_region() {
        let text = "noise <proof>first</proof> <proof>second</proof>";
        assert_eq!(extract_tag(text, "proof").as_deref(), Some("first"));
    }

    #[test]
    fn extract_tag_rejects_missing_or_reversed() {
        assert!(extract_tag("<proof>open only", "proof").is_none());
        assert!(extract_tag("</proof>closed<proof>", "proof").is_none());
        assert!(extract_tag("nothing here", "proof").is_none());
    }

    #[test]
    fn render_context_lists_statements_only() {
        let lemmas = vec![
            Lemma::pending("first statement", "secret proof", vec![]),
            Lemma::pending("second statement", "secret proof", vec![0]),
        ];
        let text = render_context(&[0, 1], &lemmas).unwrap();
        assert!(text.contains("** Conjecture-0 **"));
        assert!(text.contains("first statement"));
        assert!(text.contains("second statement"));
        assert!(!text.contains("secret proof"));
        assert!(render_context(&[], &lemmas).is_none());
    }
}
