//! Reducing free-form model output to an intent id.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::{Classification, UNKNOWN_INTENT};

static JSON_BLOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").expect("valid regex"));
static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\w*(.*?)```").expect("valid regex"));
static INLINE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""id"\s*:\s*"([^"]+)""#).expect("valid regex"));

fn pick(id: &str, valid_ids: &[&str]) -> Option<Classification> {
    let id = id.trim();
    if valid_ids.contains(&id) {
        Some(Classification::Matched(id.to_string()))
    } else if id == UNKNOWN_INTENT {
        Some(Classification::Unknown)
    } else {
        None
    }
}

/// Extract an intent id from raw model output.
///
/// Tries, in order: a JSON object with an `id` field, an inline `"id": "..."`
/// pair, the first line with quotes removed, any valid id as a whole word,
/// any valid id as a substring. Only ids in `valid_ids` or `unknown` come out.
pub fn parse_classifier_output(raw: &str, valid_ids: &[&str]) -> Classification {
    let text = raw.trim();

    if let Some(blob) = JSON_BLOB_RE.find(text)
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(blob.as_str())
        && let Some(id) = value.get("id").and_then(|v| v.as_str())
        && let Some(found) = pick(id, valid_ids)
    {
        return found;
    }

    // Fenced blocks holding JSON were handled above; keep only plain ones.
    let text = CODE_FENCE_RE.replace_all(text, |caps: &regex_lite::Captures<'_>| {
        let inner = caps.get(1).map_or("", |m| m.as_str()).trim();
        if inner.contains('{') {
            String::new()
        } else {
            inner.to_string()
        }
    });

    if let Some(caps) = INLINE_ID_RE.captures(&text)
        && let Some(found) = caps.get(1).and_then(|m| pick(m.as_str(), valid_ids))
    {
        return found;
    }

    let first_line = text.lines().next().unwrap_or_default();
    let cleaned: String = first_line
        .chars()
        .filter(|c| !matches!(c, '`' | '\'' | '"'))
        .collect();
    if let Some(found) = pick(&cleaned, valid_ids) {
        return found;
    }

    for id in valid_ids {
        let pattern = format!(r"\b{}\b", regex_lite::escape(id));
        if Regex::new(&pattern).is_ok_and(|re| re.is_match(&text)) {
            return Classification::Matched((*id).to_string());
        }
    }

    valid_ids
        .iter()
        .find(|id| text.contains(**id))
        .map_or(Classification::Unknown, |id| {
            Classification::Matched((*id).to_string())
        })
}
