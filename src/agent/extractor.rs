//! Tolerant JSON extraction for noisy LLM output.
//!
//! Ported from `original_source/agent/planner/base_planner.py`'s
//! `_parse_response`: strip markdown fences, locate the first balanced
//! bracketed region with a string-aware state machine, then apply repair
//! steps in order (escape bare newlines, close an unterminated `"script"`
//! string, truncate-and-close as a last resort) retrying the parse after
//! each. All functions here are pure and side-effect-free; they only log
//! diagnostics.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Step;

/// Strip a single enclosing ```` ``` ```` or ```` ```json ```` fence, if
/// present. Mirrors the original's "remove first/last line when the content
/// starts with backticks" behavior.
pub fn strip_markdown_fences(content: &str) -> String {
    let trimmed = content.trim();
    if !trimmed.starts_with("```") {
        return content.to_string();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() > 2 {
        lines[1..lines.len() - 1].join("\n")
    } else {
        String::new()
    }
}

/// Locate the first balanced `[...]` (preferred) or `{...}` region in
/// `text`, treating characters inside string literals (respecting `\`
/// escapes) as opaque. Returns `None` if no balanced region is found.
pub fn extract_json_fragment(text: &str) -> Option<String> {
    if let Some(frag) = scan_balanced(text, '[', ']') {
        return Some(frag);
    }
    scan_balanced(text, '{', '}')
}

fn scan_balanced(text: &str, open_ch: char, close_ch: char) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut in_string = false;
    let mut escape = false;
    let mut depth: i64 = 0;
    let mut start: Option<usize> = None;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            c if c == open_ch => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            c if c == close_ch => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start {
                            let fragment: String = chars[s..=i].iter().collect();
                            return Some(fragment);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Escape bare (unescaped) newlines that occur inside JSON string literals.
/// The most common cause of `Unterminated string` errors from LLM output
/// that embeds literal newlines in a `"script"`/`"content"` field.
pub fn escape_newlines_in_strings(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escape = false;

    for &c in &chars {
        if in_string {
            if escape {
                out.push(c);
                escape = false;
                continue;
            }
            match c {
                '\\' => {
                    out.push(c);
                    escape = true;
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                _ => out.push(c),
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        }
        out.push(c);
    }

    out
}

/// For an unterminated `"script": "..."` (or any other named string field),
/// find the nearest structurally valid close point after the field's
/// opening quote (a `,`, `}`, or `]`) and insert a closing quote before it,
/// if one is not already present.
pub fn close_unterminated_field(text: &str, field_name: &str) -> Option<String> {
    let needle_owned;
    let needle: &str = {
        needle_owned = format!("\"{}\"", field_name);
        &needle_owned
    };
    let key_pos = text.rfind(needle)?;
    let after_key = &text[key_pos + needle.len()..];
    let colon_rel = after_key.find(':')?;
    let after_colon = &after_key[colon_rel + 1..];
    let quote_rel = after_colon.find('"')?;
    let value_start = key_pos + needle.len() + colon_rel + 1 + quote_rel + 1;

    let after_value = &text[value_start..];
    if after_value.contains('"') {
        // Already has a closing quote somewhere; nothing to repair here.
        return None;
    }

    let mut end_pos: Option<usize> = None;
    for (i, c) in after_value.char_indices() {
        if c == ',' || c == '}' || c == ']' {
            end_pos = Some(value_start + i);
            break;
        }
    }

    let insert_at = end_pos.unwrap_or(text.len());
    let mut repaired = String::with_capacity(text.len() + 1);
    repaired.push_str(&text[..insert_at]);
    repaired.push('"');
    repaired.push_str(&text[insert_at..]);
    Some(repaired)
}

/// Last-resort repair: truncate at the last `]` and append required
/// closers so the JSON at least parses as something, even if incomplete.
pub fn truncate_and_close(text: &str) -> Option<String> {
    let last_bracket = text.rfind(']')?;
    Some(text[..=last_bracket].to_string())
}

/// Parsed shape accepted from a planner/reflector response: a bare array,
/// `{"steps": [...]}`, or `{"new_plan": [...]}`.
fn unwrap_steps_shape(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => map
            .remove("steps")
            .or_else(|| map.remove("new_plan"))
            .and_then(|v| v.as_array().cloned()),
        _ => None,
    }
}

/// Full tolerant extraction pipeline: fence-strip, extract, try direct
/// parse, then repairs in order, retrying the parse after each.
pub fn extract_plan(raw: &str) -> Result<Vec<Step>> {
    let mut content = strip_markdown_fences(raw);
    if let Some(fragment) = extract_json_fragment(&content) {
        content = fragment;
    }

    if let Some(steps) = try_parse_steps(&content) {
        return Ok(steps);
    }

    if let Some(repaired) = {
        let escaped = escape_newlines_in_strings(&content);
        if escaped != content { Some(escaped) } else { None }
    } {
        if let Some(steps) = try_parse_steps(&repaired) {
            debug!("extractor: repaired via newline-escaping");
            return Ok(steps);
        }
        content = repaired;
    }

    if let Some(refragged) = extract_json_fragment(&content) {
        if refragged != content {
            if let Some(steps) = try_parse_steps(&refragged) {
                debug!("extractor: repaired via re-extraction");
                return Ok(steps);
            }
        }
    }

    if let Some(closed) = close_unterminated_field(&content, "script") {
        if let Some(steps) = try_parse_steps(&closed) {
            debug!("extractor: repaired via closing unterminated script field");
            return Ok(steps);
        }
    }

    if let Some(closed) = close_unterminated_field(&content, "content") {
        if let Some(steps) = try_parse_steps(&closed) {
            debug!("extractor: repaired via closing unterminated content field");
            return Ok(steps);
        }
    }

    if let Some(truncated) = truncate_and_close(&content) {
        if let Some(steps) = try_parse_steps(&truncated) {
            debug!("extractor: repaired via truncate-and-close");
            return Ok(steps);
        }
    }

    Err(Error::Planner(format!(
        "could not extract a valid plan from model output ({} chars)",
        raw.len()
    )))
}

/// Same pipeline but expecting a single JSON object (used by the reflector).
pub fn extract_object(raw: &str) -> Result<Value> {
    let mut content = strip_markdown_fences(raw);
    if let Some(frag) = extract_json_fragment(&content) {
        content = frag;
    }

    if let Ok(value) = serde_json::from_str::<Value>(&content) {
        return Ok(value);
    }

    let escaped = escape_newlines_in_strings(&content);
    if let Ok(value) = serde_json::from_str::<Value>(&escaped) {
        return Ok(value);
    }

    Err(Error::Planner(format!(
        "could not extract a valid JSON object from model output ({} chars)",
        raw.len()
    )))
}

fn try_parse_steps(content: &str) -> Option<Vec<Step>> {
    let value: Value = serde_json::from_str(content).ok()?;
    let items = unwrap_steps_shape(value)?;
    let mut steps = Vec::with_capacity(items.len());
    for item in items {
        let step: Step = serde_json::from_value(item).ok()?;
        steps.push(step);
    }
    Some(steps)
}

/// True if any string reachable from `value` contains a placeholder token:
/// `[A-Z_]+` bracketed stand-ins, bare `TODO`/`FIXME`, or the literal
/// `extract_from_context_or_ask_user` sentinel the original models use.
pub fn contains_placeholder(value: &Value) -> bool {
    match value {
        Value::String(s) => string_has_placeholder(s),
        Value::Array(items) => items.iter().any(contains_placeholder),
        Value::Object(map) => map.values().any(contains_placeholder),
        _ => false,
    }
}

fn string_has_placeholder(s: &str) -> bool {
    if s.contains("extract_from_context_or_ask_user") || s.contains("TODO") || s.contains("FIXME") {
        return true;
    }
    // Bracketed stand-in: `[` then only uppercase/underscore chars then `]`.
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            let mut j = i + 1;
            let mut all_upper = j < bytes.len();
            while j < bytes.len() && bytes[j] != b']' {
                let c = bytes[j];
                if !(c.is_ascii_uppercase() || c == b'_') {
                    all_upper = false;
                }
                j += 1;
            }
            if all_upper && j < bytes.len() && bytes[j] == b']' && j > i + 1 {
                return true;
            }
        }
        i += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_and_extracts_array() {
        let raw = "Sure! Here is the plan:\n```json\n[{\"type\":\"file_read\",\"action\":\"read\",\"params\":{}}]\n```\n suffix";
        let steps = extract_plan(raw).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].step_type, "file_read");
    }

    #[test]
    fn repairs_unescaped_newline_in_string() {
        let raw = "[{\"type\":\"file_write\",\"action\":\"write\",\"params\":{\"a\":\"line1\nline2\"}}]";
        let steps = extract_plan(raw).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(
            steps[0].params.get("a").unwrap().as_str().unwrap(),
            "line1\nline2"
        );
    }

    #[test]
    fn accepts_steps_wrapper_object() {
        let raw = "{\"steps\":[{\"type\":\"open_app\",\"action\":\"open\",\"params\":{}}]}";
        let steps = extract_plan(raw).unwrap();
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn preserves_brackets_inside_strings() {
        let raw = "[{\"type\":\"file_write\",\"action\":\"write\",\"params\":{\"a\":\"[not a placeholder list]\"}}]";
        let steps = extract_plan(raw).unwrap();
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn detects_bracketed_placeholder() {
        let value = serde_json::json!({"app_name": "[REPLACE_WITH_ACTUAL_APP_NAME]"});
        assert!(contains_placeholder(&value));
    }

    #[test]
    fn does_not_flag_ordinary_brackets() {
        let value = serde_json::json!({"note": "[not a placeholder list]"});
        assert!(!contains_placeholder(&value));
    }

    #[test]
    fn detects_todo_sentinel() {
        let value = serde_json::json!({"path": "TODO: fill in"});
        assert!(contains_placeholder(&value));
    }
}
