//! Deterministic fallback matcher.
//!
//! When the model tier is unavailable or returns garbage, columns are matched
//! against the standard field catalog without any model call. Four phases, in
//! descending confidence:
//!
//! 1. exact normalized-name match against the curated alias table
//! 2. synonym near-match (separator-insensitive equality, or substring
//!    containment at a penalty)
//! 3. broad match: Jaro-Winkler similarity or token overlap above a floor
//! 4. a small contextual boost when the column name carries a keyword of the
//!    candidate field's domain
//!
//! Scores are on the cheap tier's 0-100 scale and normalized to 0..1 when the
//! suggestions are assembled.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rapidfuzz::distance::jaro_winkler;

use tabmap_model::{
    AlternativeSuggestion, FieldCatalog, FieldDomain, MappingSuggestion, ModelTier, StandardField,
};

const EXACT_ALIAS_SCORE: f64 = 98.0;
const SYNONYM_SCORE: f64 = 90.0;
const SUBSTRING_PENALTY: f64 = 8.0;
const BROAD_MATCH_FLOOR: f64 = 75.0;
const DOMAIN_BOOST_STRONG: f64 = 5.0;
const DOMAIN_BOOST_WEAK: f64 = 3.0;
const MAX_SCORE: f64 = 100.0;
const MAX_ALTERNATIVES: usize = 2;

#[derive(Debug, Clone)]
struct Candidate {
    field: String,
    domain: FieldDomain,
    score: f64,
    reason: String,
}

/// Matches every column against the catalog, assigning each standard field
/// to at most one column (greedy, best score first).
pub fn match_columns(columns: &[String], catalog: &FieldCatalog) -> Vec<MappingSuggestion> {
    let per_column: Vec<(usize, Vec<Candidate>)> = columns
        .iter()
        .enumerate()
        .map(|(index, column)| (index, candidates_for(column, catalog)))
        .collect();

    // All (column, candidate) pairs, best score first.
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (column_index, candidates) in &per_column {
        for (candidate_index, candidate) in candidates.iter().enumerate() {
            pairs.push((*column_index, candidate_index, candidate.score));
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));

    let mut assigned_columns: BTreeSet<usize> = BTreeSet::new();
    let mut assigned_fields: BTreeSet<String> = BTreeSet::new();
    let mut chosen: Vec<(usize, usize)> = Vec::new();
    for (column_index, candidate_index, _) in pairs {
        let candidate = &per_column[column_index].1[candidate_index];
        if assigned_columns.contains(&column_index) || assigned_fields.contains(&candidate.field) {
            continue;
        }
        assigned_columns.insert(column_index);
        assigned_fields.insert(candidate.field.clone());
        chosen.push((column_index, candidate_index));
    }
    chosen.sort_unstable();

    chosen
        .into_iter()
        .map(|(column_index, candidate_index)| {
            let candidates = &per_column[column_index].1;
            let best = &candidates[candidate_index];
            let alternatives = candidates
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != candidate_index)
                .take(MAX_ALTERNATIVES)
                .map(|(_, c)| AlternativeSuggestion {
                    field: c.field.clone(),
                    confidence: c.score / 100.0,
                })
                .collect();
            MappingSuggestion {
                source_column: columns[column_index].clone(),
                target_field: best.field.clone(),
                target_domain: Some(best.domain),
                confidence: best.score / 100.0,
                reasoning: best.reason.clone(),
                alternatives,
                model_used: ModelTier::Cheap,
            }
        })
        .collect()
}

/// All catalog fields this column could map to, best first, floor applied.
fn candidates_for(column: &str, catalog: &FieldCatalog) -> Vec<Candidate> {
    let normalized = normalize(column);
    let mut candidates: Vec<Candidate> = catalog
        .fields
        .iter()
        .filter_map(|field| score_pair(column, &normalized, field))
        .collect();
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates
}

fn score_pair(column: &str, normalized: &str, field: &StandardField) -> Option<Candidate> {
    let (mut score, reason) = base_score(normalized, field)?;
    if score < EXACT_ALIAS_SCORE
        && let Some(boost) = domain_boost(normalized, field.domain)
    {
        score = (score + boost).min(MAX_SCORE);
    }
    Some(Candidate {
        field: field.name.clone(),
        domain: field.domain,
        score,
        reason: format!("{reason} for '{column}'"),
    })
}

fn base_score(normalized: &str, field: &StandardField) -> Option<(f64, String)> {
    // Phase 1: exact alias match.
    if field.name == normalized || field.aliases.iter().any(|a| a == normalized) {
        return Some((
            EXACT_ALIAS_SCORE,
            format!("exact alias match on {}", field.name),
        ));
    }

    // Phase 2: synonym near-match, separators ignored.
    let squeezed = squeeze(normalized);
    for alias in std::iter::once(&field.name).chain(field.aliases.iter()) {
        let alias_squeezed = squeeze(alias);
        if alias_squeezed == squeezed {
            return Some((SYNONYM_SCORE, format!("synonym match on '{alias}'")));
        }
        if alias_squeezed.len() >= 3
            && squeezed.len() >= 3
            && (squeezed.contains(&alias_squeezed) || alias_squeezed.contains(&squeezed))
        {
            return Some((
                SYNONYM_SCORE - SUBSTRING_PENALTY,
                format!("partial synonym match on '{alias}'"),
            ));
        }
    }

    // Phase 3: broad similarity against the best alias.
    let mut best: Option<(f64, &str)> = None;
    for alias in std::iter::once(&field.name).chain(field.aliases.iter()) {
        let similarity =
            jaro_winkler::similarity(normalized.chars(), normalize(alias).chars()) * 100.0;
        let overlap = token_overlap(normalized, alias) * 100.0;
        let score = similarity.max(overlap);
        if best.is_none_or(|(s, _)| score > s) {
            best = Some((score, alias));
        }
    }
    let (score, alias) = best?;
    if score < BROAD_MATCH_FLOOR {
        return None;
    }
    Some((score, format!("name similarity {score:.0}% to '{alias}'")))
}

/// Shared-token ratio between two names, over the larger token count.
fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<String> = normalize(b)
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let shared = tokens_a
        .iter()
        .filter(|t| tokens_b.contains(**t))
        .count() as f64;
    shared / tokens_a.len().max(tokens_b.len()) as f64
}

/// Boost when the column name itself names the field's domain.
fn domain_boost(normalized: &str, domain: FieldDomain) -> Option<f64> {
    let keywords: &[&str] = match domain {
        FieldDomain::Inventory => &["inventory", "stock", "warehouse"],
        FieldDomain::Orders => &["order", "invoice", "purchase"],
        FieldDomain::Suppliers => &["supplier", "vendor"],
        FieldDomain::Products => &["product", "item"],
        FieldDomain::Recipes => &["recipe", "ingredient", "menu"],
        FieldDomain::Customers => &["customer", "client", "loyalty"],
    };
    let tokens: BTreeSet<&str> = normalized.split_whitespace().collect();
    if keywords.iter().any(|k| tokens.contains(k)) {
        return Some(DOMAIN_BOOST_STRONG);
    }
    if keywords.iter().any(|k| normalized.contains(k)) {
        return Some(DOMAIN_BOOST_WEAK);
    }
    None
}

/// Lowercases and replaces separators with single spaces.
pub(crate) fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_space = true;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Removes separators entirely, for separator-insensitive comparison.
fn squeeze(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn best_for<'a>(
        suggestions: &'a [MappingSuggestion],
        column: &str,
    ) -> &'a MappingSuggestion {
        suggestions
            .iter()
            .find(|s| s.source_column == column)
            .unwrap_or_else(|| panic!("no suggestion for {column}"))
    }

    #[test]
    fn exact_alias_scores_98() {
        let catalog = FieldCatalog::builtin();
        let columns = vec!["sku".to_string()];
        let suggestions = match_columns(&columns, &catalog);
        let sku = best_for(&suggestions, "sku");
        assert_eq!(sku.target_field, "sku_code");
        assert!((sku.confidence - 0.98).abs() < 1e-9);
        assert_eq!(sku.target_domain, Some(FieldDomain::Inventory));
    }

    #[test]
    fn separator_variants_are_synonyms() {
        let catalog = FieldCatalog::builtin();
        let columns = vec!["Unit Cost".to_string()];
        let suggestions = match_columns(&columns, &catalog);
        let cost = best_for(&suggestions, "Unit Cost");
        assert_eq!(cost.target_field, "unit_cost");
        // Space vs underscore normalizes to an exact alias match.
        assert!((cost.confidence - 0.98).abs() < 1e-9);
    }

    #[test]
    fn substring_synonym_carries_penalty() {
        let catalog = FieldCatalog::builtin();
        let columns = vec!["supplier_name_full".to_string()];
        let suggestions = match_columns(&columns, &catalog);
        let supplier = best_for(&suggestions, "supplier_name_full");
        assert_eq!(supplier.target_field, "supplier_name");
        // 90 - 8 substring penalty + 5 domain boost.
        assert!((supplier.confidence - 0.87).abs() < 1e-9);
    }

    #[test]
    fn fields_are_assigned_at_most_once() {
        let catalog = FieldCatalog::builtin();
        let columns = vec!["sku".to_string(), "sku_code".to_string()];
        let suggestions = match_columns(&columns, &catalog);
        let targets: Vec<&str> = suggestions.iter().map(|s| s.target_field.as_str()).collect();
        let unique: BTreeSet<&&str> = targets.iter().collect();
        assert_eq!(targets.len(), unique.len());
    }

    #[test]
    fn unrelated_columns_are_left_unmapped() {
        let catalog = FieldCatalog::builtin();
        let columns = vec!["zzz_internal_flag_q7".to_string()];
        let suggestions = match_columns(&columns, &catalog);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize("Qty__On-Hand "), "qty on hand");
        assert_eq!(normalize("price ($)"), "price");
    }
}
