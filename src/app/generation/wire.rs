// Request and response shapes for the two supported generation wire formats.

use crate::config::toml_config::WireFormat;
use crate::domain::model::{GenerationRequest, MAX_BACK_CHARS, MAX_FRONT_CHARS};
use crate::utils::error::{CardError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn system_instruction(max_items: u32) -> String {
    format!(
        "You create study flashcards from the text the user provides. \
         Respond with a JSON array and nothing else: no prose, no markdown. \
         Each element is an object with string fields \"front\" (at most {} characters) \
         and \"back\" (at most {} characters), and string-array fields \"tags\" and \"categories\". \
         Return at most {} elements.",
        MAX_FRONT_CHARS, MAX_BACK_CHARS, max_items
    )
}

/// The source text is quoted in the prompt; it has already been escaped for that.
pub fn user_prompt(request: &GenerationRequest) -> String {
    format!(
        "Create up to {} flashcards from the following source text.\nSource text: \"{}\"",
        request.requested_count, request.source_text
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectRequest<'a> {
    model: &'a str,
    instruction: String,
    user_text: &'a str,
    max_items: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub fn build_body(format: WireFormat, model: &str, request: &GenerationRequest) -> Result<Value> {
    let body = match format {
        WireFormat::Direct => serde_json::to_value(DirectRequest {
            model,
            instruction: system_instruction(request.requested_count),
            user_text: &request.source_text,
            max_items: request.requested_count,
        })?,
        WireFormat::ChatCompletions => serde_json::to_value(ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(system_instruction(request.requested_count)),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(user_prompt(request)),
                },
            ],
            temperature: 0.3,
        })?,
    };
    Ok(body)
}

/// Pulls the candidate array out of a response body.
pub fn extract_items(format: WireFormat, raw: &str) -> Result<Vec<Value>> {
    match format {
        WireFormat::Direct => {
            let value: Value = serde_json::from_str(raw).map_err(|e| {
                CardError::validation(format!("response body is not valid JSON: {}", e))
            })?;
            into_array(value)
        }
        WireFormat::ChatCompletions => {
            let response: ChatResponse = serde_json::from_str(raw).map_err(|e| {
                CardError::validation(format!("unexpected chat completion shape: {}", e))
            })?;
            let content = response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| CardError::validation("chat completion has no message content"))?;
            let value: Value = serde_json::from_str(strip_code_fence(&content)).map_err(|e| {
                CardError::validation(format!("model output is not valid JSON: {}", e))
            })?;
            into_array(value)
        }
    }
}

/// Accepts a bare array, or an object wrapping it under `flashcards` or `cards`.
fn into_array(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("flashcards").or_else(|| map.remove("cards")) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(CardError::validation(
                "expected a JSON array of flashcards",
            )),
        },
        _ => Err(CardError::validation("expected a JSON array of flashcards")),
    }
}

// models sometimes wrap JSON in ```json fences despite the instruction
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}
