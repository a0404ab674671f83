use crate::core::sanitizer::normalize_field;
use crate::domain::model::{GeneratedCandidate, GenerationBatch, MAX_BACK_CHARS, MAX_FRONT_CHARS};
use crate::utils::error::{CardError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Turns the raw response array into candidates. Malformed elements are
/// dropped and counted; an empty result or an oversized array fails the call.
pub fn validate_items(items: Vec<Value>, max_items: u32) -> Result<GenerationBatch> {
    if items.len() > max_items as usize {
        return Err(CardError::validation(format!(
            "service returned {} items but at most {} were requested",
            items.len(),
            max_items
        )));
    }

    let total = items.len();
    let candidates: Vec<GeneratedCandidate> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match parse_candidate(item) {
            Ok(candidate) => Some(candidate),
            Err(reason) => {
                tracing::debug!(index, %reason, "dropping malformed candidate");
                None
            }
        })
        .collect();
    let dropped_count = total - candidates.len();

    if candidates.is_empty() {
        return Err(CardError::validation(format!(
            "response contained no valid flashcards ({} dropped)",
            dropped_count
        )));
    }

    if dropped_count > 0 {
        tracing::warn!(
            "Dropped {} of {} generated items that failed validation",
            dropped_count,
            total
        );
    }

    Ok(GenerationBatch {
        candidates,
        dropped_count,
    })
}

fn parse_candidate(item: &Value) -> std::result::Result<GeneratedCandidate, String> {
    let object = item.as_object().ok_or("element is not an object")?;
    let front = text_field(object, "front", MAX_FRONT_CHARS)?;
    let back = text_field(object, "back", MAX_BACK_CHARS)?;
    let tags = label_field(object, "tags")?;
    let categories = label_field(object, "categories")?;
    Ok(GeneratedCandidate::new(front, back, tags, categories))
}

fn text_field(
    object: &Map<String, Value>,
    name: &str,
    max_chars: usize,
) -> std::result::Result<String, String> {
    let raw = object
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing or non-string '{}'", name))?;
    let value = normalize_field(raw);
    let length = value.chars().count();
    if length == 0 || length > max_chars {
        return Err(format!(
            "'{}' must be 1..={} characters (got {})",
            name, max_chars, length
        ));
    }
    Ok(value)
}

// absent or null means no labels; anything but an array of strings is malformed
fn label_field(
    object: &Map<String, Value>,
    name: &str,
) -> std::result::Result<BTreeSet<String>, String> {
    match object.get(name) {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| {
                value
                    .as_str()
                    .map(normalize_field)
                    .ok_or_else(|| format!("'{}' must contain only strings", name))
            })
            .filter(|label| label.as_ref().map_or(true, |l| !l.is_empty()))
            .collect(),
        Some(_) => Err(format!("'{}' must be an array", name)),
    }
}
