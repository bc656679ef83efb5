//! Bug-tolerant parsing of streamed tool-call arguments.
//!
//! Models regularly emit argument payloads that are almost JSON: LaTeX
//! backslashes left unescaped, raw control characters inside strings,
//! trailing sentinel markers, or garbage after the closing brace. The parser
//! first normalizes the raw text, then walks a table of candidate
//! transformations until one decodes. A payload that survives none of them
//! becomes a structured error that is surfaced to the model as the tool
//! result so the conversation can self-correct.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("tool arguments are not valid JSON after repair: {snippet}")]
    Undecodable { snippet: String },

    #[error("tool arguments must be a JSON object, got {got}")]
    NotAnObject { got: &'static str },
}

impl ArgumentError {
    /// Error text handed back to the model.
    #[must_use]
    pub fn as_tool_result(&self) -> String {
        format!("error: {self}")
    }
}

/// Parse a raw streamed argument payload into a JSON object.
pub fn parse_tool_arguments(raw: &str) -> Result<Map<String, Value>, ArgumentError> {
    let trimmed = strip_sentinels(raw).trim();
    if trimmed.is_empty() {
        return Ok(Map::new());
    }
    let candidate = truncate_to_first_value(trimmed);

    // Candidate transformations, cheapest first.
    let transforms: [fn(&str) -> String; 4] = [
        |s| s.to_string(),
        escape_invalid_backslashes,
        reescape_control_chars,
        |s| escape_invalid_backslashes(&reescape_control_chars(s)),
    ];

    for transform in transforms {
        if let Ok(value) = serde_json::from_str::<Value>(&transform(candidate)) {
            return match value {
                Value::Object(map) => Ok(map),
                other => Err(ArgumentError::NotAnObject {
                    got: json_type_name(&other),
                }),
            };
        }
    }

    Err(ArgumentError::Undecodable {
        snippet: snippet(candidate),
    })
}

/// Drop trailing `<|...|>` sentinel markers some providers append after the
/// argument payload.
fn strip_sentinels(raw: &str) -> &str {
    let mut out = raw.trim_end();
    while out.ends_with("|>") {
        match out.rfind("<|") {
            Some(start) => out = out[..start].trim_end(),
            None => break,
        }
    }
    out
}

/// Keep only the first complete top-level JSON value, using a string-aware
/// balance scan; anything after it (chatter, duplicated payloads) is
/// discarded. An unbalanced payload is returned unchanged so the candidate
/// transforms still get a chance.
fn truncate_to_first_value(raw: &str) -> &str {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut started = false;

    for (pos, ch) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => {
                depth += 1;
                started = true;
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if started && depth == 0 {
                    return &raw[..pos + ch.len_utf8()];
                }
            }
            _ => {}
        }
    }
    raw
}

/// Escape backslashes that do not begin a valid JSON escape sequence.
///
/// This is the LaTeX tolerance rule: `\eta` becomes `\\eta` while `\n`,
/// `\"` and friends are left alone, so `{"m":"\eta"}` decodes to the string
/// `\eta`.
fn escape_invalid_backslashes(raw: &str) -> String {
    const VALID: &str = "\"\\/bfnrtu";
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' {
            match chars.get(i + 1) {
                Some(&next) if VALID.contains(next) => {
                    out.push('\\');
                    out.push(next);
                    i += 2;
                }
                _ => {
                    out.push_str("\\\\");
                    i += 1;
                }
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Re-escape literal CR/LF/TAB characters, which are illegal inside JSON
/// strings but show up when models stream multi-line code arguments.
fn reescape_control_chars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    for ch in raw.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(ch),
            }
        } else {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
        }
    }
    out
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn snippet(raw: &str) -> String {
    const LIMIT: usize = 120;
    if raw.chars().count() <= LIMIT {
        raw.to_string()
    } else {
        let head: String = raw.chars().take(LIMIT).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_passes_through() {
        let args = parse_tool_arguments(r#"{"code": "print(1)"}"#).unwrap();
        assert_eq!(args["code"], "print(1)");
    }

    #[test]
    fn empty_arguments_are_an_empty_object() {
        assert!(parse_tool_arguments("").unwrap().is_empty());
        assert!(parse_tool_arguments("  ").unwrap().is_empty());
    }

    #[test]
    fn latex_backslashes_are_tolerated() {
        let args = parse_tool_arguments(r#"{"begin_marker": "\eta = 1"}"#).unwrap();
        assert_eq!(args["begin_marker"], "\\eta = 1");
    }

    #[test]
    fn valid_escapes_survive_the_latex_rule() {
        let args = parse_tool_arguments("{\"code\": \"a\\nb \\\\frac\"}").unwrap();
        assert_eq!(args["code"], "a\nb \\frac");
    }

    #[test]
    fn literal_newlines_inside_strings_are_reescaped() {
        let args = parse_tool_arguments("{\"code\": \"x = 1\nprint(x)\"}").unwrap();
        assert_eq!(args["code"], "x = 1\nprint(x)");
    }

    #[test]
    fn trailing_garbage_after_value_is_dropped() {
        let args = parse_tool_arguments(r#"{"a": 1} and then some chatter"#).unwrap();
        assert_eq!(args["a"], 1);
    }

    #[test]
    fn sentinel_markers_are_stripped() {
        let args = parse_tool_arguments("{\"a\": 1}<|tool_calls_end|>").unwrap();
        assert_eq!(args["a"], 1);
        let args = parse_tool_arguments("{\"a\": 2}<|a|><|b|>").unwrap();
        assert_eq!(args["a"], 2);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_truncation() {
        let args = parse_tool_arguments(r#"{"code": "d = {1: 2}"} extra"#).unwrap();
        assert_eq!(args["code"], "d = {1: 2}");
    }

    #[test]
    fn non_object_values_are_rejected() {
        assert!(matches!(
            parse_tool_arguments("[1, 2]"),
            Err(ArgumentError::NotAnObject { got: "array" })
        ));
    }

    #[test]
    fn hopeless_payloads_become_structured_errors() {
        let err = parse_tool_arguments("{\"a\": ").unwrap_err();
        assert!(err.as_tool_result().starts_with("error: "));
    }
}
