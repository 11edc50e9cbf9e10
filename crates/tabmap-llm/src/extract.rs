//! Layered JSON extraction from raw model output.
//!
//! Models are asked for strict JSON but do not always comply. Extraction is
//! an explicitly ordered chain of strategies returning a tagged result, not
//! exception-driven control flow:
//!
//! 1. direct parse of the whole response
//! 2. the contents of a fenced code block
//! 3. the slice from the first `{`/`[` to the last matching `}`/`]`
//!
//! The lenient variant additionally runs repair passes (observed cheap-tier
//! failure modes: raw newlines inside strings, bare object keys, control
//! characters, trailing commas) over each candidate before giving up.

use serde_json::Value;

/// Result of extraction: parsed JSON, or the raw text when every strategy
/// failed and the caller tolerates a degraded result.
#[derive(Debug, Clone)]
pub enum Extracted {
    Parsed(Value),
    Raw(String),
}

impl Extracted {
    pub fn as_parsed(&self) -> Option<&Value> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    pub fn into_parsed(self) -> Result<Value, String> {
        match self {
            Self::Parsed(value) => Ok(value),
            Self::Raw(text) => Err(text),
        }
    }
}

/// Strict extraction: the ordered strategy chain without repair passes.
pub fn extract_json(text: &str) -> Option<Value> {
    for candidate in candidates(text) {
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            return Some(value);
        }
    }
    None
}

/// Lenient extraction: the strategy chain, then repair passes per candidate.
pub fn extract_json_lenient(text: &str) -> Extracted {
    if let Some(value) = extract_json(text) {
        return Extracted::Parsed(value);
    }
    for candidate in candidates(text) {
        for repaired in repair_passes(&candidate) {
            if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
                return Extracted::Parsed(value);
            }
        }
    }
    Extracted::Raw(text.to_string())
}

/// Candidate substrings in strategy order. The whole text comes first so a
/// compliant response parses without slicing.
fn candidates(text: &str) -> Vec<String> {
    let mut out = vec![text.trim().to_string()];
    if let Some(block) = fenced_block(text) {
        out.push(block);
    }
    if let Some(slice) = bracket_slice(text) {
        out.push(slice);
    }
    out
}

/// Contents of the first fenced code block, language tag stripped.
fn fenced_block(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    let block = body[..close].trim();
    if block.is_empty() {
        None
    } else {
        Some(block.to_string())
    }
}

/// Slice from the first opening brace/bracket to the last matching closer.
fn bracket_slice(text: &str) -> Option<String> {
    let open_idx = text.find(['{', '['])?;
    let opener = text[open_idx..].chars().next()?;
    let closer = if opener == '{' { '}' } else { ']' };
    let close_idx = text.rfind(closer)?;
    if close_idx <= open_idx {
        return None;
    }
    Some(text[open_idx..=close_idx].to_string())
}

/// Repair passes, applied cumulatively: each pass builds on the previous
/// result so combined defects (bare keys *and* trailing commas) still parse.
fn repair_passes(candidate: &str) -> Vec<String> {
    let mut passes = Vec::new();
    let stripped = strip_control_chars(candidate);
    passes.push(stripped.clone());
    let escaped = escape_newlines_in_strings(&stripped);
    passes.push(escaped.clone());
    let quoted = quote_bare_keys(&escaped);
    passes.push(quoted.clone());
    passes.push(remove_trailing_commas(&quoted));
    passes
}

fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Escapes raw newlines and tabs that appear inside JSON string literals.
fn escape_newlines_in_strings(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in input.chars() {
        if in_string {
            match c {
                '\n' if !escaped => {
                    out.push_str("\\n");
                    continue;
                }
                '\t' if !escaped => {
                    out.push_str("\\t");
                    continue;
                }
                '"' if !escaped => in_string = false,
                '\\' if !escaped => {
                    escaped = true;
                    out.push(c);
                    continue;
                }
                _ => {}
            }
            escaped = false;
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    out
}

/// Quotes bare object keys: `{key: 1}` becomes `{"key": 1}`.
fn quote_bare_keys(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut expecting_key = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                expecting_key = false;
                out.push(c);
                i += 1;
            }
            '{' | ',' => {
                expecting_key = true;
                out.push(c);
                i += 1;
            }
            c if c.is_whitespace() => {
                out.push(c);
                i += 1;
            }
            c if expecting_key && (c.is_ascii_alphabetic() || c == '_') => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let identifier: String = chars[start..i].iter().collect();
                if j < chars.len() && chars[j] == ':' {
                    out.push('"');
                    out.push_str(&identifier);
                    out.push('"');
                } else {
                    out.push_str(&identifier);
                }
                expecting_key = false;
            }
            _ => {
                expecting_key = false;
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Removes commas that directly precede a closing brace or bracket.
fn remove_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
            continue;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_parse_wins() {
        let value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn fenced_block_is_extracted() {
        let text = "Here is the result:\n```json\n{\"a\": 2}\n```\nDone.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 2);
    }

    #[test]
    fn brace_slice_survives_prose() {
        let text = "Sure! The mapping is {\"a\": 3} as requested.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 3);
    }

    #[test]
    fn array_slice_is_supported() {
        let text = "Result: [1, 2, 3] end";
        let value = extract_json(text).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
    }

    #[test]
    fn lenient_repairs_bare_keys_and_trailing_commas() {
        let text = "{mappings: [{source: \"sku\", confidence: 98,},],}";
        let value = extract_json_lenient(text).into_parsed().unwrap();
        assert_eq!(value["mappings"][0]["source"], "sku");
    }

    #[test]
    fn lenient_repairs_raw_newlines_in_strings() {
        let text = "{\"reasoning\": \"line one\nline two\"}";
        assert!(extract_json(text).is_none());
        let value = extract_json_lenient(text).into_parsed().unwrap();
        assert_eq!(value["reasoning"], "line one\nline two");
    }

    #[test]
    fn hopeless_text_degrades_to_raw() {
        let text = "I could not produce a mapping for this file.";
        match extract_json_lenient(text) {
            Extracted::Raw(raw) => assert_eq!(raw, text),
            Extracted::Parsed(_) => panic!("should not parse"),
        }
    }

    #[test]
    fn bare_values_inside_strings_are_untouched() {
        let text = r#"{"note": "use {braces: carefully}"}"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["note"], "use {braces: carefully}");
    }
}
