//! Parsing of the Selecting-phase reply into a tool decision.
//!
//! Accepted shapes, tried in order:
//! - a JSON object `{"tool": ..., "args": ..., "answer": ...}`, bare, fenced or
//!   embedded in prose
//! - a JSON array `["tool", args]`
//! - `Tool: <name>` / `Tool input: <args>` lines
//!
//! Anything else is a malformed directive. No tool is ever guessed.

use serde_json::{Map, Value};

use crate::{FreethinkerError, Result};

const ARG_KEYS: [&str; 4] = ["args", "tool_input", "input", "arguments"];
const NO_TOOL: [&str; 4] = ["none", "null", "no_tool", "answer"];

/// What the provider decided for this turn
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Answer directly, no tool
    Answer(String),
    /// Invoke `tool` once with `args` (object, positional array or null)
    Invoke { tool: String, args: Value },
}

pub fn parse_directive(text: &str) -> Result<Directive> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(malformed("empty reply", text));
    }

    for candidate in json_candidates(trimmed) {
        match candidate {
            Value::Object(obj) if obj.contains_key("tool") => return from_object(&obj, text),
            Value::Array(items) => {
                if let Some(directive) = from_array(&items) {
                    return Ok(directive);
                }
            }
            _ => {}
        }
    }

    if let Some(directive) = from_lines(trimmed)? {
        return Ok(directive);
    }

    Err(malformed("no tool decision found", text))
}

fn malformed(reason: &str, text: &str) -> FreethinkerError {
    let preview: String = text.trim().chars().take(120).collect();
    FreethinkerError::MalformedDirective(format!("{}: {:?}", reason, preview))
}

fn is_no_tool(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    name.is_empty() || NO_TOOL.contains(&name.as_str())
}

/// Positional arguments stay arrays; a bare scalar is one positional value;
/// a string holding JSON is decoded first.
fn normalize_args(raw: Option<&Value>) -> Value {
    match raw {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Value::Null;
            }
            match serde_json::from_str::<Value>(s) {
                Ok(v @ Value::Object(_)) | Ok(v @ Value::Array(_)) => v,
                _ => Value::Array(vec![Value::String(unquote(s).to_string())]),
            }
        }
        Some(v @ (Value::Object(_) | Value::Array(_))) => v.clone(),
        Some(scalar) => Value::Array(vec![scalar.clone()]),
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'')
}

fn from_object(obj: &Map<String, Value>, text: &str) -> Result<Directive> {
    let tool = match obj.get("tool") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) if is_no_tool(name) => None,
        Some(Value::String(name)) => Some(name.trim().to_string()),
        Some(_) => return Err(malformed("'tool' must be a string or null", text)),
    };

    match tool {
        Some(tool) => {
            let args = normalize_args(ARG_KEYS.iter().find_map(|k| obj.get(*k)));
            Ok(Directive::Invoke { tool, args })
        }
        None => obj
            .get("answer")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| Directive::Answer(a.to_string()))
            .ok_or_else(|| malformed("no tool chosen and no answer given", text)),
    }
}

fn from_array(items: &[Value]) -> Option<Directive> {
    let name = items.first()?.as_str()?;
    if is_no_tool(name) {
        let answer = items.get(1)?.as_str()?.trim();
        return (!answer.is_empty()).then(|| Directive::Answer(answer.to_string()));
    }
    Some(Directive::Invoke {
        tool: name.trim().to_string(),
        args: normalize_args(items.get(1)),
    })
}

/// JSON values found in the reply: fenced blocks first, then every top-level
/// value starting at a `{` or `[`.
fn json_candidates(text: &str) -> Vec<Value> {
    let mut out = Vec::new();

    let mut rest = text;
    while let Some(start) = rest.find("```") {
        let after = &rest[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let Some(end) = after[body_start..].find("```") else {
            break;
        };
        let body = after[body_start..body_start + end].trim();
        if let Ok(v) = serde_json::from_str::<Value>(body) {
            out.push(v);
        }
        rest = &after[body_start + end + 3..];
    }

    // top-level values only: a parsed value's nested objects are skipped
    let mut pos = 0;
    while let Some(offset) = text[pos..].find(|c: char| c == '{' || c == '[') {
        let start = pos + offset;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(v)) => {
                out.push(v);
                pos = start + stream.byte_offset();
            }
            _ => pos = start + 1,
        }
    }
    out
}

fn line_value<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    labels.iter().find_map(|label| {
        let head = line.get(..label.len())?;
        head.eq_ignore_ascii_case(label)
            .then(|| line[label.len()..].trim())
    })
}

fn from_lines(text: &str) -> Result<Option<Directive>> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    let Some((idx, name)) = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| line_value(l, &["tool:", "my tool is:"]).map(|v| (i, v)))
    else {
        return Ok(None);
    };
    let name = unquote(name);

    let input_at = lines
        .iter()
        .enumerate()
        .skip(idx + 1)
        .find_map(|(i, l)| {
            line_value(l, &["tool input:", "my tool input is:", "input:"]).map(|v| (i, v))
        });

    if is_no_tool(name) {
        let answer = lines
            .iter()
            .find_map(|l| line_value(l, &["answer:"]))
            .map(str::to_string)
            .unwrap_or_else(|| {
                lines
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, l)| *l)
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(malformed("no tool chosen and no answer given", text));
        }
        return Ok(Some(Directive::Answer(answer.to_string())));
    }

    // input may continue over several lines (pretty-printed JSON)
    let args = match input_at {
        Some((i, first)) => {
            let mut raw = first.to_string();
            for l in &lines[i + 1..] {
                raw.push('\n');
                raw.push_str(l);
            }
            let raw = raw.trim();
            let value = serde_json::Deserializer::from_str(raw)
                .into_iter::<Value>()
                .next()
                .and_then(|r| r.ok())
                .unwrap_or_else(|| Value::String(first.to_string()));
            normalize_args(Some(&value))
        }
        None => Value::Null,
    };

    Ok(Some(Directive::Invoke {
        tool: name.to_string(),
        args,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoke(tool: &str, args: Value) -> Directive {
        Directive::Invoke {
            tool: tool.to_string(),
            args,
        }
    }

    #[test]
    fn bare_json_object() {
        let d = parse_directive(r#"{"tool": "weather", "args": {"location": "Tokyo"}}"#).unwrap();
        assert_eq!(d, invoke("weather", json!({"location": "Tokyo"})));
    }

    #[test]
    fn fenced_json_with_prose_and_alias_key() {
        let text = "Sure, let me check.\n```json\n{\"tool\": \"forum\", \"tool_input\": {\"subreddit\": \"r/Python\", \"limit\": 5}}\n```\nDone.";
        assert_eq!(
            parse_directive(text).unwrap(),
            invoke("forum", json!({"subreddit": "r/Python", "limit": 5}))
        );
    }

    #[test]
    fn object_embedded_in_prose() {
        let text = r#"I will use {"tool":"search","input":"rust async"} for this."#;
        assert_eq!(parse_directive(text).unwrap(), invoke("search", json!(["rust async"])));
    }

    #[test]
    fn no_tool_answers_directly() {
        let d = parse_directive(r#"{"tool": "none", "answer": "4. Two plus two is four."}"#).unwrap();
        assert_eq!(d, Directive::Answer("4. Two plus two is four.".into()));
        let d = parse_directive(r#"{"tool": null, "answer": "hi"}"#).unwrap();
        assert_eq!(d, Directive::Answer("hi".into()));
    }

    #[test]
    fn no_tool_without_answer_is_malformed() {
        assert!(matches!(
            parse_directive(r#"{"tool": "none"}"#),
            Err(FreethinkerError::MalformedDirective(_))
        ));
    }

    #[test]
    fn list_form() {
        assert_eq!(
            parse_directive(r#"["weather", ["London"]]"#).unwrap(),
            invoke("weather", json!(["London"]))
        );
        assert_eq!(
            parse_directive(r#"["calculator", {"num1": 2, "num2": 2, "operation": "add"}]"#).unwrap(),
            invoke("calculator", json!({"num1": 2, "num2": 2, "operation": "add"}))
        );
    }

    #[test]
    fn line_form_with_json_input() {
        let text = "Thought: I need the weather.\nTool: weather\nTool input: {\"location\": \"Paris\"}";
        assert_eq!(parse_directive(text).unwrap(), invoke("weather", json!({"location": "Paris"})));
    }

    #[test]
    fn line_form_with_plain_input() {
        let text = "My tool is: scrape\nMy tool input is: example.com";
        assert_eq!(parse_directive(text).unwrap(), invoke("scrape", json!(["example.com"])));
    }

    #[test]
    fn line_form_no_tool() {
        let text = "Tool: none\nAnswer: Paris is the capital of France.";
        assert_eq!(
            parse_directive(text).unwrap(),
            Directive::Answer("Paris is the capital of France.".into())
        );
    }

    #[test]
    fn nested_tool_object_is_not_a_directive() {
        let text = r#"{"meta": {"tool": "weather", "args": {"location": "Oslo"}}}"#;
        assert!(matches!(
            parse_directive(text),
            Err(FreethinkerError::MalformedDirective(_))
        ));
    }

    #[test]
    fn later_top_level_object_still_found_after_an_unrelated_one() {
        let text = r#"Context: {"note": {"tool": "scrape"}} Decision: {"tool": "search", "args": {"query": "tokio"}}"#;
        assert_eq!(
            parse_directive(text).unwrap(),
            invoke("search", json!({"query": "tokio"}))
        );
    }

    #[test]
    fn garbage_is_malformed() {
        for text in ["", "   ", "lorem ipsum dolor sit amet", "{not json", "[1, 2, 3]", "{\"answer\": 3}"] {
            assert!(
                matches!(parse_directive(text), Err(FreethinkerError::MalformedDirective(_))),
                "expected malformed for {:?}",
                text
            );
        }
    }
}
