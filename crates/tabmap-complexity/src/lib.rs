//! Complexity analysis for incoming tabular files.
//!
//! `analyze` is a pure function from column statistics to a
//! [`ComplexityScore`]: deterministic, no I/O, and no failure modes - missing
//! statistics simply contribute nothing. Six independent factors are each
//! scored on a 0..5 scale, then combined with fixed weights into the
//! aggregate score the router thresholds against.

pub mod values;

use std::collections::BTreeSet;

use tabmap_model::{AmbiguityLevel, ColumnProfile, ComplexityScore, ModelTier, Thresholds};

use crate::values::{
    ValueKind, classify, has_non_ascii_or_control, is_composite, is_encoded, is_json_object,
    needs_normalization,
};

const WEIGHT_COLUMN: f64 = 0.2;
const WEIGHT_DATA_QUALITY: f64 = 0.2;
const WEIGHT_STRUCTURAL: f64 = 0.2;
const WEIGHT_AMBIGUITY: f64 = 0.2;
const WEIGHT_BUSINESS_LOGIC: f64 = 0.1;
const WEIGHT_NESTED: f64 = 0.1;

/// Boolean factors enter the weighted sum at full scale.
const BOOL_FACTOR_SCALE: f64 = 5.0;

const AMBIGUITY_MEDIUM: f64 = 1.5;
const AMBIGUITY_HIGH: f64 = 3.0;

/// Column names too generic to map without model help.
const GENERIC_NAMES: [&str; 12] = [
    "value", "data", "field", "item", "col", "column", "info", "misc", "other", "temp", "test",
    "untitled",
];

/// Single words that could map onto several standard fields.
const AMBIGUOUS_SINGLE_WORDS: [&str; 7] = ["name", "date", "id", "code", "number", "type", "value"];

/// Industry jargon abbreviations that rarely match a field name verbatim.
const JARGON_TERMS: [&str; 12] = [
    "pos", "sku", "upc", "ean", "cogs", "fifo", "lifo", "bom", "moq", "rfq", "grn", "uom",
];

const CALCULATED_TOKENS: [&str; 10] = [
    "total",
    "subtotal",
    "margin",
    "markup",
    "discount",
    "tax",
    "commission",
    "profit",
    "net",
    "gross",
];

const WORKFLOW_TOKENS: [&str; 6] = ["status", "stage", "phase", "state", "approval", "workflow"];

const DATE_RANGE_TOKENS: [&str; 6] = ["from", "to", "start", "end", "begin", "until"];

const FK_SUFFIXES: [&str; 5] = ["_id", "_key", "_ref", "_code", "_fk"];

const HIERARCHY_TOKENS: [&str; 4] = ["parent", "child", "level", "category"];

const JUNCTION_TOKENS: [&str; 5] = ["mapping", "junction", "association", "link", "xref"];

/// Field names we expect to see in well-kept business files.
const EXPECTED_FIELD_TOKENS: [&str; 6] = ["id", "name", "date", "quantity", "price", "sku"];

/// Analyzes column statistics and produces a complexity report.
pub fn analyze(columns: &[ColumnProfile], thresholds: &Thresholds) -> ComplexityScore {
    let mut reasons = Vec::new();

    let column_complexity = column_complexity(columns, &mut reasons);
    let data_quality = data_quality(columns, &mut reasons);
    let structural = structural_complexity(columns, &mut reasons);
    let ambiguity = ambiguity(columns, &mut reasons);
    let business_logic = business_logic_detected(columns, &mut reasons);
    let nested = nested_relationships(columns, &mut reasons);

    let score = column_complexity * WEIGHT_COLUMN
        + (1.0 - data_quality) * BOOL_FACTOR_SCALE * WEIGHT_DATA_QUALITY
        + structural * WEIGHT_STRUCTURAL
        + ambiguity * WEIGHT_AMBIGUITY
        + if business_logic { BOOL_FACTOR_SCALE } else { 0.0 } * WEIGHT_BUSINESS_LOGIC
        + if nested { BOOL_FACTOR_SCALE } else { 0.0 } * WEIGHT_NESTED;
    let score = score.clamp(0.0, 5.0);

    if reasons.is_empty() {
        reasons.push("standard complexity".to_string());
    }

    let ambiguity_level = if ambiguity < AMBIGUITY_MEDIUM {
        AmbiguityLevel::Low
    } else if ambiguity < AMBIGUITY_HIGH {
        AmbiguityLevel::Medium
    } else {
        AmbiguityLevel::High
    };

    let recommended_tier = if score >= thresholds.complexity_routing {
        ModelTier::Deep
    } else {
        ModelTier::Cheap
    };

    ComplexityScore {
        score,
        has_nested_relationships: nested,
        ambiguity_level,
        business_logic_detected: business_logic,
        data_quality_score: data_quality,
        recommended_tier,
        reasons,
    }
}

fn column_complexity(columns: &[ColumnProfile], reasons: &mut Vec<String>) -> f64 {
    let mut score = 0.0;

    let count = columns.len();
    let count_penalty = if count > 50 {
        3.0
    } else if count > 30 {
        2.0
    } else if count > 15 {
        1.0
    } else {
        0.0
    };
    if count_penalty > 0.0 {
        score += count_penalty;
        reasons.push(format!("wide file: {count} columns"));
    }

    let mut mixed = 0usize;
    let mut exotic_chars = false;
    for column in columns {
        let kinds: BTreeSet<ValueKind> = column
            .sample_values
            .iter()
            .map(|v| classify(v))
            .filter(|k| *k != ValueKind::Empty)
            .collect();
        if kinds.len() > 1 {
            mixed += 1;
        }
        if column
            .sample_values
            .iter()
            .any(|v| has_non_ascii_or_control(v))
        {
            exotic_chars = true;
        }
    }
    if mixed > 0 {
        score += (mixed as f64 * 0.5).min(1.5);
        reasons.push(format!("{mixed} column(s) mix value types"));
    }
    if exotic_chars {
        score += 0.5;
        reasons.push("non-ASCII or control characters in values".to_string());
    }

    let awkward_names = columns
        .iter()
        .filter(|c| c.name.len() > 30 || c.name.chars().any(|ch| !ch.is_alphanumeric() && !matches!(ch, '_' | '-' | ' ' | '.')))
        .count();
    if awkward_names > 0 {
        score += 0.5;
        reasons.push(format!("{awkward_names} awkward column name(s)"));
    }

    score.min(5.0)
}

fn data_quality(columns: &[ColumnProfile], reasons: &mut Vec<String>) -> f64 {
    if columns.is_empty() {
        return 1.0;
    }
    let mut quality: f64 = 1.0;

    let avg_null: f64 =
        columns.iter().map(|c| c.null_fraction).sum::<f64>() / columns.len() as f64;
    if avg_null > 0.0 {
        quality -= avg_null;
        if avg_null > 0.1 {
            reasons.push(format!("average null fraction {avg_null:.2}"));
        }
    }

    let inconsistent = columns
        .iter()
        .filter(|c| {
            let kinds: BTreeSet<ValueKind> = c
                .sample_values
                .iter()
                .map(|v| classify(v))
                .filter(|k| *k != ValueKind::Empty)
                .collect();
            kinds.len() > 2
        })
        .count();
    if inconsistent > 0 {
        quality -= (inconsistent as f64 * 0.1).min(0.3);
        reasons.push(format!("{inconsistent} column(s) with inconsistent formatting"));
    }

    let has_expected = columns.iter().any(|c| {
        let tokens = name_tokens(&c.name);
        EXPECTED_FIELD_TOKENS
            .iter()
            .any(|t| tokens.contains(*t))
    });
    if !has_expected {
        quality -= 0.2;
        reasons.push("no commonly expected field names present".to_string());
    }

    let needs_cleanup = columns
        .iter()
        .any(|c| c.sample_values.iter().any(|v| needs_normalization(v)));
    if needs_cleanup {
        quality -= 0.1;
        reasons.push("values need normalization (currency/percent/casing)".to_string());
    }

    quality.clamp(0.0, 1.0)
}

fn structural_complexity(columns: &[ColumnProfile], reasons: &mut Vec<String>) -> f64 {
    let mut score = 0.0;
    let samples = || columns.iter().flat_map(|c| c.sample_values.iter());

    if samples().any(|v| is_json_object(v.trim())) {
        score += 2.0;
        reasons.push("embedded JSON objects in values".to_string());
    }
    if samples().any(|v| is_composite(v.trim())) {
        score += 1.5;
        reasons.push("delimiter-separated composite values".to_string());
    }
    if samples().any(|v| is_encoded(v.trim())) {
        score += 1.0;
        reasons.push("base64/hex encoded values".to_string());
    }
    score
}

fn ambiguity(columns: &[ColumnProfile], reasons: &mut Vec<String>) -> f64 {
    let mut score = 0.0;

    let generic = columns
        .iter()
        .filter(|c| is_generic_name(&c.name))
        .count();
    if generic > 0 {
        score += (generic as f64 * 0.5).min(2.0);
        reasons.push(format!("{generic} generic column name(s)"));
    }

    let ambiguous_words = columns
        .iter()
        .filter(|c| {
            let lower = c.name.trim().to_lowercase();
            AMBIGUOUS_SINGLE_WORDS.contains(&lower.as_str())
        })
        .count();
    if ambiguous_words > 0 {
        score += (ambiguous_words as f64 * 0.5).min(1.5);
        reasons.push(format!(
            "{ambiguous_words} single-word name(s) with multiple candidate fields"
        ));
    }

    let jargon = columns
        .iter()
        .filter(|c| {
            let tokens = name_tokens(&c.name);
            JARGON_TERMS.iter().any(|t| tokens.contains(*t))
        })
        .count();
    if jargon > 0 {
        score += (jargon as f64 * 0.25).min(1.0);
        reasons.push(format!("{jargon} industry-jargon abbreviation(s)"));
    }

    score
}

fn business_logic_detected(columns: &[ColumnProfile], reasons: &mut Vec<String>) -> bool {
    let mut detected = false;

    let calculated = columns.iter().any(|c| {
        let tokens = name_tokens(&c.name);
        CALCULATED_TOKENS.iter().any(|t| tokens.contains(*t))
    });
    if calculated {
        detected = true;
        reasons.push("calculated-field column names".to_string());
    }

    let workflow = columns.iter().any(|c| {
        let tokens = name_tokens(&c.name);
        WORKFLOW_TOKENS.iter().any(|t| tokens.contains(*t))
    });
    if workflow {
        detected = true;
        reasons.push("workflow-state column names".to_string());
    }

    let date_range = columns
        .iter()
        .filter(|c| {
            let tokens = name_tokens(&c.name);
            DATE_RANGE_TOKENS.iter().any(|t| tokens.contains(*t))
        })
        .count();
    if date_range >= 2 {
        detected = true;
        reasons.push("date-range column pair".to_string());
    }

    detected
}

fn nested_relationships(columns: &[ColumnProfile], reasons: &mut Vec<String>) -> bool {
    let mut detected = false;

    let fk_like = columns
        .iter()
        .filter(|c| {
            let lower = c.name.trim().to_lowercase();
            FK_SUFFIXES.iter().any(|s| lower.ends_with(s))
        })
        .count();
    if fk_like >= 2 {
        detected = true;
        reasons.push(format!("{fk_like} foreign-key style column(s)"));
    }

    let hierarchy = columns.iter().any(|c| {
        let tokens = name_tokens(&c.name);
        HIERARCHY_TOKENS.iter().any(|t| tokens.contains(*t))
    });
    if hierarchy {
        detected = true;
        reasons.push("hierarchy column names".to_string());
    }

    let junction = columns.iter().any(|c| {
        let tokens = name_tokens(&c.name);
        JUNCTION_TOKENS.iter().any(|t| tokens.contains(*t))
    });
    if junction {
        detected = true;
        reasons.push("many-to-many linkage column names".to_string());
    }

    detected
}

fn is_generic_name(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    if GENERIC_NAMES.contains(&lower.as_str()) {
        return true;
    }
    // ^[a-z]$
    if lower.len() == 1 && lower.chars().all(|c| c.is_ascii_alphabetic()) {
        return true;
    }
    // ^col\d+$ | ^field\d+$
    for prefix in ["col", "field"] {
        if let Some(rest) = lower.strip_prefix(prefix)
            && !rest.is_empty()
            && rest.chars().all(|c| c.is_ascii_digit())
        {
            return true;
        }
    }
    false
}

/// Splits a column name into lowercase tokens on separators and case breaks.
fn name_tokens(name: &str) -> BTreeSet<&'static str> {
    // Tokens are matched against static vocabularies, so intern into the
    // vocabulary slices rather than allocating.
    let lower = name.trim().to_lowercase();
    let mut tokens = BTreeSet::new();
    for raw in lower.split(|c: char| !c.is_ascii_alphanumeric()) {
        if raw.is_empty() {
            continue;
        }
        for vocab in [
            &CALCULATED_TOKENS[..],
            &WORKFLOW_TOKENS[..],
            &DATE_RANGE_TOKENS[..],
            &HIERARCHY_TOKENS[..],
            &JUNCTION_TOKENS[..],
            &JARGON_TERMS[..],
            &EXPECTED_FIELD_TOKENS[..],
        ] {
            for term in vocab {
                if raw == *term {
                    tokens.insert(*term);
                }
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabmap_model::ColumnProfile;

    fn profile(name: &str, samples: &[&str]) -> ColumnProfile {
        ColumnProfile::named(name).with_samples(samples)
    }

    #[test]
    fn clean_inventory_file_routes_cheap() {
        let columns = vec![
            profile("sku_code", &["A1", "B2", "C3"]),
            profile("item_name", &["Flour", "Sugar", "Salt"]),
            profile("quantity_on_hand", &["10", "25", "3"]),
            profile("unit_cost", &["1.50", "2.25", "0.75"]),
        ];
        let report = analyze(&columns, &Thresholds::default());
        assert!(report.score < 3.0, "score was {}", report.score);
        assert_eq!(report.recommended_tier, ModelTier::Cheap);
        assert_eq!(report.ambiguity_level, AmbiguityLevel::Low);
    }

    #[test]
    fn messy_wide_file_routes_deep() {
        let mut columns = vec![
            profile("col1", &[r#"{"nested": true}"#, "12", "2024-01-01"]),
            profile("col2", &["a;b;c", "5", "true"]),
            profile("field3", &["deadbeefdeadbeef"]),
            profile("data", &["x"]),
            profile("value", &["y"]),
            profile("parent_id", &["1"]),
            profile("child_id", &["2"]),
            profile("total", &["$5.00"]),
            profile("price ($)", &["$1", "café"]),
        ];
        for n in 0..8 {
            let mut filler = profile(&format!("col{}", n + 10), &["z"]);
            filler.null_fraction = 0.9;
            columns.push(filler);
        }
        let report = analyze(&columns, &Thresholds::default());
        assert!(report.score >= 3.0, "score was {}", report.score);
        assert_eq!(report.recommended_tier, ModelTier::Deep);
        assert!(report.has_nested_relationships);
        assert!(report.business_logic_detected);
        assert!(report.reasons.len() > 3);
    }

    #[test]
    fn analyzer_is_deterministic() {
        let columns = vec![
            profile("status", &["open", "closed"]),
            profile("start_date", &["2024-01-01"]),
            profile("end_date", &["2024-02-01"]),
        ];
        let a = analyze(&columns, &Thresholds::default());
        let b = analyze(&columns, &Thresholds::default());
        assert_eq!(a.score, b.score);
        assert_eq!(a.reasons, b.reasons);
    }

    #[test]
    fn date_range_pair_is_business_logic() {
        let columns = vec![
            profile("valid_from", &["2024-01-01"]),
            profile("valid_to", &["2024-06-01"]),
        ];
        let report = analyze(&columns, &Thresholds::default());
        assert!(report.business_logic_detected);
    }

    #[test]
    fn empty_input_reports_standard_complexity() {
        let report = analyze(&[], &Thresholds::default());
        assert!(report.score < 1.0);
        assert_eq!(report.reasons, vec!["standard complexity".to_string()]);
        assert_eq!(report.data_quality_score, 1.0);
    }

    #[test]
    fn null_heavy_columns_degrade_quality() {
        let mut sparse = profile("notes", &["", "", "x"]);
        sparse.null_fraction = 0.8;
        let report = analyze(&[sparse], &Thresholds::default());
        assert!(report.data_quality_score < 0.5);
    }
}
