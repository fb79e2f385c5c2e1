//! Recovering JSON from model text.

use crate::LlmError;
use serde_json::Value;

/// Parse model output as JSON.
///
/// Tries, in order: the whole text, the body of a fenced code block, and the
/// first balanced `{...}` or `[...]` value (quotes and escapes respected).
/// Models often wrap JSON in prose or markdown; anything else is a
/// [`LlmError::Format`].
pub fn parse_llm_json(text: &str) -> Result<Value, LlmError> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Ok(v);
    }

    if let Some(fenced) = fenced_body(trimmed) {
        if let Ok(v) = serde_json::from_str(fenced) {
            return Ok(v);
        }
    }

    let Some(candidate) = balanced_value(trimmed) else {
        return Err(LlmError::Format(format!(
            "no JSON value found in: {}",
            preview(trimmed, 200)
        )));
    };
    serde_json::from_str(candidate).map_err(|e| LlmError::Format(e.to_string()))
}

fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // skip the info string (```json)
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn balanced_value(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let (open, close) = if text[start..].starts_with('{') {
        ('{', '}')
    } else {
        ('[', ']')
    };

    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escape = false;

    for (idx, ch) in text.char_indices().skip_while(|(i, _)| *i < start) {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
