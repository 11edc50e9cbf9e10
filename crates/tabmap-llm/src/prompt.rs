//! Prompt templates.
//!
//! Every template states an explicit JSON output contract; the parsers in the
//! mapping crate depend on those shapes, so the contract strings here are the
//! authoritative definition. The cheap-tier mapping contract asks for 0-100
//! confidence integers, the deep tier for 0.0-1.0 fractions; the scale is
//! carried alongside the tier configuration rather than guessed from values.

use std::fmt::Write as _;

use tabmap_model::{ColumnProfile, EntityType, FieldCatalog, MappingSuggestion};

const MAPPING_CONTRACT: &str = r#"Respond with strict JSON only, no prose, in this shape:
{
  "mappings": [
    {
      "source_column": "<input column name>",
      "target_field": "<standard field name or null>",
      "target_domain": "<domain of the target field>",
      "confidence": <integer 0-100>,
      "reasoning": "<one short sentence>",
      "alternatives": [{"field": "<name>", "confidence": <integer 0-100>}]
    }
  ]
}"#;

const DEEP_MAPPING_CONTRACT: &str = r#"Respond with strict JSON only, no prose, in this shape:
{
  "mappings": [
    {
      "source_column": "<input column name>",
      "target_field": "<standard field name or null>",
      "target_domain": "<domain of the target field>",
      "confidence": <fraction 0.0-1.0>,
      "reasoning": "<one short sentence>",
      "alternatives": [{"field": "<name>", "confidence": <fraction 0.0-1.0>}]
    }
  ]
}"#;

const VALIDATION_CONTRACT: &str = r#"Respond with strict JSON only, no prose, in this shape:
{
  "transformations": [{"field": "<field name>", "op": "<uppercase|lowercase|trim|numeric_coerce>"}],
  "issues": [{"row": <row index or null>, "field": "<field name>", "message": "<what is wrong>", "severity": "<info|warning|error|critical>"}]
}"#;

const ENTITY_CONTRACT: &str = r#"Respond with strict JSON only, no prose, in this shape:
{"entity_type": "<one of the listed types>", "confidence": <fraction 0.0-1.0>, "reasoning": "<one short sentence>"}"#;

const EDGE_CASE_CONTRACT: &str = r#"Respond with strict JSON only, no prose, in this shape:
{"interpretation": "<what the values represent>", "target_field": "<standard field name or null>", "confidence": <fraction 0.0-1.0>, "suggested_transform": "<op name or null>"}"#;

/// Cheap-tier column mapping prompt (0-100 confidence contract).
pub fn mapping_prompt(
    columns: &[ColumnProfile],
    catalog: &FieldCatalog,
    examples: &[(String, String)],
) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Map each source column of a tabular business file to a standard field.\n\
         Use null for target_field when no standard field applies.\n\n",
    );
    write_catalog_section(&mut prompt, catalog);
    write_examples_section(&mut prompt, examples);
    write_columns_section(&mut prompt, columns);
    prompt.push_str(MAPPING_CONTRACT);
    prompt
}

/// Deep-tier mapping prompt (0.0-1.0 confidence contract), optionally carrying
/// the low-confidence suggestions an escalation is retrying.
pub fn deep_mapping_prompt(
    columns: &[ColumnProfile],
    catalog: &FieldCatalog,
    examples: &[(String, String)],
    prior: Option<&[MappingSuggestion]>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Map each source column of a tabular business file to a standard field.\n\
         These columns are ambiguous or structurally complex; reason carefully about\n\
         sample values, not just names. Use null for target_field when no standard\n\
         field applies.\n\n",
    );
    write_catalog_section(&mut prompt, catalog);
    write_examples_section(&mut prompt, examples);
    if let Some(suggestions) = prior
        && !suggestions.is_empty()
    {
        prompt.push_str("A faster model produced these low-confidence suggestions; correct or confirm them:\n");
        for s in suggestions {
            let _ = writeln!(
                prompt,
                "- {} -> {} (confidence {:.2}): {}",
                s.source_column, s.target_field, s.confidence, s.reasoning
            );
        }
        prompt.push('\n');
    }
    write_columns_section(&mut prompt, columns);
    prompt.push_str(DEEP_MAPPING_CONTRACT);
    prompt
}

/// Validation and transformation planning prompt for mapped data.
pub fn validation_prompt(
    entity_type: EntityType,
    fields: &[String],
    sample_rows: &[Vec<(String, String)>],
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Review sample rows of {entity_type} data after column mapping. Propose\n\
         cleanup transformations and flag data issues. Available ops: uppercase,\n\
         lowercase, trim, numeric_coerce.\n"
    );
    let _ = writeln!(prompt, "Fields: {}", fields.join(", "));
    prompt.push_str("\nSample rows:\n");
    for (index, row) in sample_rows.iter().enumerate() {
        let rendered: Vec<String> = row
            .iter()
            .map(|(field, value)| format!("{field}={value:?}"))
            .collect();
        let _ = writeln!(prompt, "{index}: {}", rendered.join(", "));
    }
    prompt.push('\n');
    prompt.push_str(VALIDATION_CONTRACT);
    prompt
}

/// Entity type detection prompt with a closed answer set.
pub fn entity_detection_prompt(columns: &[ColumnProfile], sample_rows: &[Vec<String>]) -> String {
    let mut prompt = String::new();
    let types: Vec<String> = EntityType::DETECTABLE
        .iter()
        .map(|t| t.to_string())
        .collect();
    let _ = writeln!(
        prompt,
        "Classify what kind of business data this tabular file contains.\n\
         Answer with exactly one of: {}.\n",
        types.join(", ")
    );
    write_columns_section(&mut prompt, columns);
    if !sample_rows.is_empty() {
        prompt.push_str("Sample rows:\n");
        for row in sample_rows {
            let _ = writeln!(prompt, "{}", row.join(" | "));
        }
        prompt.push('\n');
    }
    prompt.push_str(ENTITY_CONTRACT);
    prompt
}

/// Focused prompt for a single column whose values resisted classification.
pub fn edge_case_prompt(column: &ColumnProfile, context: &str) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "A single column in a tabular business file could not be mapped or\n\
         cleanly classified. Interpret it.\n\nColumn: {}",
        column.name
    );
    if !column.sample_values.is_empty() {
        let _ = writeln!(prompt, "Sample values: {:?}", column.sample_values);
    }
    let _ = writeln!(
        prompt,
        "Null fraction: {:.2}, unique fraction: {:.2}",
        column.null_fraction, column.unique_fraction
    );
    if !context.is_empty() {
        let _ = writeln!(prompt, "Context: {context}");
    }
    prompt.push('\n');
    prompt.push_str(EDGE_CASE_CONTRACT);
    prompt
}

fn write_catalog_section(prompt: &mut String, catalog: &FieldCatalog) {
    prompt.push_str("Standard fields (name [domain]: known aliases):\n");
    for field in &catalog.fields {
        let _ = writeln!(
            prompt,
            "- {} [{}]: {}",
            field.name,
            field.domain,
            field.aliases.join(", ")
        );
    }
    prompt.push('\n');
}

fn write_examples_section(prompt: &mut String, examples: &[(String, String)]) {
    if examples.is_empty() {
        return;
    }
    prompt.push_str("Previously confirmed mappings from similar files:\n");
    for (source, target) in examples {
        let _ = writeln!(prompt, "- \"{source}\" -> {target}");
    }
    prompt.push('\n');
}

fn write_columns_section(prompt: &mut String, columns: &[ColumnProfile]) {
    prompt.push_str("Source columns:\n");
    for column in columns {
        let samples = if column.sample_values.is_empty() {
            "(no samples)".to_string()
        } else {
            format!("{:?}", column.sample_values)
        };
        let _ = writeln!(
            prompt,
            "- {} (declared {:?}, {:.0}% null): {}",
            column.name,
            column.declared_type,
            column.null_fraction * 100.0,
            samples
        );
    }
    prompt.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabmap_model::{ColumnProfile, ModelTier};

    fn columns() -> Vec<ColumnProfile> {
        vec![
            ColumnProfile::named("sku").with_samples(&["A-100", "A-101"]),
            ColumnProfile::named("qty on hand").with_samples(&["5", "12"]),
        ]
    }

    #[test]
    fn cheap_contract_uses_percent_scale() {
        let prompt = mapping_prompt(&columns(), &FieldCatalog::builtin(), &[]);
        assert!(prompt.contains("integer 0-100"));
        assert!(prompt.contains("sku"));
        assert!(prompt.contains("qty on hand"));
    }

    #[test]
    fn deep_contract_uses_unit_scale_and_carries_prior() {
        let prior = vec![MappingSuggestion {
            source_column: "qty on hand".to_string(),
            target_field: "quantity_on_hand".to_string(),
            target_domain: None,
            confidence: 0.55,
            reasoning: "name similarity".to_string(),
            alternatives: Vec::new(),
            model_used: ModelTier::Cheap,
        }];
        let prompt =
            deep_mapping_prompt(&columns(), &FieldCatalog::builtin(), &[], Some(&prior));
        assert!(prompt.contains("fraction 0.0-1.0"));
        assert!(prompt.contains("qty on hand -> quantity"));
    }

    #[test]
    fn few_shot_examples_appear_before_columns() {
        let examples = vec![("prod_cd".to_string(), "sku_code".to_string())];
        let prompt = mapping_prompt(&columns(), &FieldCatalog::builtin(), &examples);
        let examples_at = prompt.find("prod_cd").unwrap();
        let columns_at = prompt.find("Source columns:").unwrap();
        assert!(examples_at < columns_at);
    }

    #[test]
    fn entity_prompt_enumerates_closed_answer_set() {
        let prompt = entity_detection_prompt(&columns(), &[]);
        for entity in EntityType::DETECTABLE {
            assert!(prompt.contains(&entity.to_string()));
        }
        assert!(!prompt.contains("unknown,"));
    }

    #[test]
    fn validation_prompt_lists_rows_and_ops() {
        let rows = vec![vec![
            ("sku_code".to_string(), " a-100 ".to_string()),
            ("unit_price".to_string(), "$5.00".to_string()),
        ]];
        let fields = vec!["sku_code".to_string(), "unit_price".to_string()];
        let prompt = validation_prompt(EntityType::Inventory, &fields, &rows);
        assert!(prompt.contains("numeric_coerce"));
        assert!(prompt.contains("$5.00"));
    }
}
