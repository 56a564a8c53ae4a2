use serde_json::{json, Value};

use crate::llm::ProviderError;
use crate::tools::{schema, RawResult, ToolDescription, ToolError, ToolInvocation};
use crate::verify::VerificationResult;

const SNIPPET_LIMIT: usize = 280;
const PAYLOAD_LIMIT: usize = 6_000;

/// Selecting-phase system prompt: the tool catalogue (registration order) plus
/// the reply contract the directive parser understands
pub fn selection_system_prompt(tools: &[ToolDescription]) -> String {
    let catalogue: Vec<Value> = tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "parameters": schema::to_json_schema(&t.input_schema),
            })
        })
        .collect();
    let catalogue = serde_json::to_string_pretty(&catalogue).unwrap_or_else(|_| "[]".into());

    format!(
        "You are FreeThinker, an assistant that answers questions and may use at most one tool.\n\
         \n\
         Available tools:\n{catalogue}\n\
         \n\
         Reply with exactly one JSON object and nothing else.\n\
         To use a tool:\n\
         {{\"tool\": \"<tool name>\", \"args\": {{<arguments matching the tool's parameters>}}}}\n\
         To answer without a tool:\n\
         {{\"tool\": \"none\", \"answer\": \"<your full answer>\"}}\n\
         \n\
         Use a tool only when it gives information you do not reliably have \
         (current weather, live posts, web results, page contents, exact arithmetic)."
    )
}

/// Second completion: explain the tool result to the user
pub fn interpretation_prompts(
    user_prompt: &str,
    invocation: &ToolInvocation,
    verification: &VerificationResult,
) -> (String, String) {
    let system = "You are FreeThinker. A tool was run to help answer the user's question. \
                  Answer the question from the tool result only. If the tool failed, say so \
                  plainly and explain what the user can try instead. Mention any listed \
                  consistency concerns. Be concise."
        .to_string();

    let result_block = match &invocation.raw_result {
        RawResult::Success { payload } => format!("status: success\npayload: {}", clip(payload, PAYLOAD_LIMIT)),
        RawResult::Failure { reason, partial } => {
            let mut s = format!("status: failure\nreason: {}", reason);
            if let Some(p) = partial {
                s.push_str(&format!("\npartial payload: {}", clip(p, PAYLOAD_LIMIT)));
            }
            s
        }
    };

    let flags = if verification.consistency_flags.is_empty() {
        "none".to_string()
    } else {
        verification
            .consistency_flags
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    let user = format!(
        "Question: {}\n\nTool: {}\nArguments: {}\n{}\n\nConfidence: {:.2}\nConsistency concerns: {}",
        user_prompt,
        invocation.tool_name,
        invocation.resolved_args,
        result_block,
        verification.confidence,
        flags
    );
    (system, user)
}

/// Deterministic answer used when no interpretation is available
pub fn fallback_answer(invocation: &ToolInvocation) -> String {
    match &invocation.raw_result {
        RawResult::Success { payload } => format!(
            "{} → {}",
            invocation.tool_name,
            safe_snippet(&payload_text(payload))
        ),
        RawResult::Failure { reason, .. } => format!(
            "The {} tool failed: {}. No reliable answer could be produced from it.",
            invocation.tool_name, reason
        ),
    }
}

pub fn input_error_answer(tool: &str, err: &ToolError) -> String {
    format!(
        "I picked the {} tool but could not use it because the arguments were not valid ({}). \
         Try rephrasing the request with the missing details.",
        tool, err
    )
}

pub fn provider_error_answer(provider: &str, err: &ProviderError) -> String {
    let advice = match err {
        ProviderError::Auth(_) => "check that a valid API key is set for it",
        ProviderError::RateLimit(_) => "wait a moment before retrying",
        _ => "try again or switch to another provider",
    };
    format!(
        "The {} provider could not be reached ({}). Please {}.",
        provider, err, advice
    )
}

fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn clip(payload: &Value, limit: usize) -> String {
    truncate(&payload.to_string(), limit)
}

fn safe_snippet(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        return "<empty>".into();
    }
    truncate(s, SNIPPET_LIMIT)
}

fn truncate(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    // Find safe UTF-8 boundary at or before limit
    let mut end = limit;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
