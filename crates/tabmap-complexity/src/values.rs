//! Sample value classification.
//!
//! Pure character-level heuristics over the (at most ~20) sample values the
//! parser captured per column. No parsing of the full file happens here.

/// Coarse shape of a single sample value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueKind {
    Empty,
    Numeric,
    Date,
    Boolean,
    JsonObject,
    Composite,
    Encoded,
    Text,
}

/// Classifies one sample value into its most specific kind.
pub fn classify(value: &str) -> ValueKind {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return ValueKind::Empty;
    }
    if is_json_object(trimmed) {
        return ValueKind::JsonObject;
    }
    if is_numeric(trimmed) {
        return ValueKind::Numeric;
    }
    if is_date_like(trimmed) {
        return ValueKind::Date;
    }
    if is_boolean_like(trimmed) {
        return ValueKind::Boolean;
    }
    if is_encoded(trimmed) {
        return ValueKind::Encoded;
    }
    if is_composite(trimmed) {
        return ValueKind::Composite;
    }
    ValueKind::Text
}

pub fn is_json_object(value: &str) -> bool {
    let starts_object = value.starts_with('{') && value.ends_with('}');
    if !starts_object {
        return false;
    }
    serde_json::from_str::<serde_json::Value>(value)
        .map(|v| v.is_object())
        .unwrap_or(false)
}

pub fn is_numeric(value: &str) -> bool {
    value.parse::<f64>().is_ok()
}

/// Matches common date layouts: `2024-01-31`, `01/31/2024`, `31-01-2024`.
pub fn is_date_like(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() < 8 || bytes.len() > 10 {
        return false;
    }
    let separators: Vec<usize> = value
        .char_indices()
        .filter(|(_, c)| *c == '-' || *c == '/')
        .map(|(i, _)| i)
        .collect();
    if separators.len() != 2 {
        return false;
    }
    value.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '/')
}

pub fn is_boolean_like(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no"
    )
}

/// A value split into parts by a delimiter the mapper would have to unpack.
pub fn is_composite(value: &str) -> bool {
    if value.contains(';') || value.contains('|') || value.contains(" - ") || value.contains(" / ")
    {
        return true;
    }
    // Comma counts only when it is not a thousands separator.
    value.contains(',') && !is_numeric(&value.replace(',', ""))
}

/// Base64- or hex-looking opaque blob.
pub fn is_encoded(value: &str) -> bool {
    if value.len() >= 16 && value.len() % 2 == 0 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        return true;
    }
    if value.len() >= 16
        && value.len() % 4 == 0
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        // Require mixed character classes so plain words do not trip this.
        let has_digit = value.chars().any(|c| c.is_ascii_digit());
        let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
        return has_digit && has_upper && has_lower;
    }
    false
}

pub fn has_non_ascii_or_control(value: &str) -> bool {
    value.chars().any(|c| !c.is_ascii() || c.is_control())
}

/// Value that would need cleanup before typed storage: currency symbols,
/// percent signs, or shouting/whispering case.
pub fn needs_normalization(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with(['$', '€', '£', '¥']) || trimmed.ends_with('%') {
        return true;
    }
    let letters: Vec<char> = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() > 3 && letters.iter().all(|c| c.is_uppercase())
}
