//! Role prompt templates.
//!
//! Templates are UTF-8 text with named `{placeholder}` fields substituted by
//! literal replacement. Defaults are embedded; each role may be overridden
//! with an on-disk file.

use std::io;
use std::path::Path;

pub const SOLVER_PROMPT: &str = include_str!("solver.md");
pub const VERIFIER_PROMPT: &str = include_str!("verifier.md");
pub const THEOREM_CHECK_PROMPT: &str = include_str!("theorem_check.md");

/// System message opening every solver conversation.
pub const SOLVER_SYSTEM: &str = "\
You are the solver role of a mathematical research engine. You propose conjectures with complete \
proofs, building on previously verified results. Use your tools when computation or exploration \
would strengthen the proof, and follow the required output format exactly.";

/// Substitute `{name}` placeholders by literal replacement.
///
/// Unknown placeholders are left untouched; substitution values are inserted
/// verbatim (no escaping), which keeps LaTeX intact.
#[must_use]
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in substitutions {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// The embedded default, or the file at `path` when provided.
pub fn load_or_default(path: Option<&Path>, default: &str) -> io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => Ok(default.to_string()),
    }
}

/// Per-role prompt templates for one engine instance.
#[derive(Clone, Debug)]
pub struct PromptSet {
    pub solver: String,
    pub verifier: String,
    pub theorem_check: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            solver: SOLVER_PROMPT.to_string(),
            verifier: VERIFIER_PROMPT.to_string(),
            theorem_check: THEOREM_CHECK_PROMPT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_all_occurrences_literally() {
        let out = render(
            "p={problem_content} q={remaining_lemma_quota} again {problem_content}",
            &[("problem_content", "x\\in\\mathbb{R}"), ("remaining_lemma_quota", "3")],
        );
        assert_eq!(out, "p=x\\in\\mathbb{R} q=3 again x\\in\\mathbb{R}");
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        assert_eq!(render("{unknown}", &[]), "{unknown}");
    }

    #[test]
    fn default_templates_carry_their_placeholders() {
        assert!(SOLVER_PROMPT.contains("{problem_content}"));
        assert!(SOLVER_PROMPT.contains("{remaining_lemma_quota}"));
        assert!(VERIFIER_PROMPT.contains("{conjecture_content}"));
        assert!(VERIFIER_PROMPT.contains("{proof_content}"));
        assert!(THEOREM_CHECK_PROMPT.contains("{conjecture_content}"));
    }
}
