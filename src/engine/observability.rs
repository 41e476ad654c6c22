//! Observability (C9): term suggestions, top-term listings, and index
//! statistics — everything an AI client asks outside of `search` itself to
//! orient a query before running it.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::index::store::Snapshot;
use crate::schema;

const TOP_FACET_VALUES: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct TermSuggestion {
    pub term: String,
    pub doc_freq: u64,
}

/// §4.8 `suggestTerms`: seek the term dictionary to the first term `>=
/// prefix`, stop once a term no longer starts with it, return the top
/// `limit` by document frequency. Analyzed fields get a lowercased prefix;
/// keyword fields are matched verbatim.
pub fn suggest_terms(snapshot: &Snapshot, field: &str, prefix: &str, limit: usize) -> EngineResult<Vec<TermSuggestion>> {
    let spec = schema::field_spec(field).ok_or_else(|| EngineError::invalid_field(format!("unknown field: {field}")))?;
    if spec.kind == schema::FieldKind::Numeric {
        return Err(EngineError::invalid_field(format!("{field} is numeric doc-values only, not term-enumerable")));
    }
    let seek_prefix = if spec.kind == schema::FieldKind::Text { prefix.to_lowercase() } else { prefix.to_string() };

    let Some(fp) = snapshot.postings.get(field) else { return Ok(vec![]) };
    let mut candidates: Vec<TermSuggestion> = fp
        .terms_from(&seek_prefix)
        .take_while(|(t, _)| t.starts_with(&seek_prefix))
        .map(|(term, postings)| TermSuggestion { term: term.clone(), doc_freq: postings.len() as u64 })
        .collect();
    candidates.sort_by(|a, b| b.doc_freq.cmp(&a.doc_freq).then(a.term.cmp(&b.term)));
    candidates.truncate(limit);
    Ok(candidates)
}

/// §4.8 `getTopTerms`: enumerate the whole dictionary for `field`.
pub fn get_top_terms(snapshot: &Snapshot, field: &str, limit: usize) -> EngineResult<Vec<TermSuggestion>> {
    let spec = schema::field_spec(field).ok_or_else(|| EngineError::invalid_field(format!("unknown field: {field}")))?;
    if spec.kind == schema::FieldKind::Numeric {
        return Err(EngineError::invalid_field(format!("{field} is numeric doc-values only, not term-enumerable")));
    }
    let Some(fp) = snapshot.postings.get(field) else { return Ok(vec![]) };
    let mut all: Vec<TermSuggestion> = fp
        .terms
        .iter()
        .map(|(term, postings)| TermSuggestion { term: term.clone(), doc_freq: postings.len() as u64 })
        .collect();
    all.sort_by(|a, b| b.doc_freq.cmp(&a.doc_freq).then(a.term.cmp(&b.term)));
    all.truncate(limit);
    Ok(all)
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetTopValue {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRangeHint {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub document_count: u64,
    pub segment_count: u64,
    pub disk_bytes: u64,
    pub facet_top_values: HashMap<String, Vec<FacetTopValue>>,
    pub date_ranges: HashMap<String, DateRangeHint>,
    pub language_distribution: HashMap<String, u64>,
}

/// §4.8 `getIndexStats`. `segment_count` is always 1 in this engine's
/// single-snapshot-file model (DESIGN.md); kept in the response shape so a
/// client written against a true segmented engine still parses it.
pub fn get_index_stats(snapshot: &Snapshot, index_dir: &std::path::Path) -> IndexStats {
    let document_count = snapshot.live_doc_count() as u64;
    let disk_bytes = estimate_disk_bytes(index_dir);

    let mut facet_top_values = HashMap::new();
    for field in schema::facetable_fields() {
        if let Some(values) = snapshot.doc_values_keyword.get(field) {
            let mut counts: HashMap<&str, u64> = HashMap::new();
            for value in values.values() {
                *counts.entry(value.as_str()).or_insert(0) += 1;
            }
            let mut top: Vec<FacetTopValue> =
                counts.into_iter().map(|(value, count)| FacetTopValue { value: value.to_string(), count }).collect();
            top.sort_by(|a, b| b.count.cmp(&a.count).then(a.value.cmp(&b.value)));
            top.truncate(TOP_FACET_VALUES);
            facet_top_values.insert(field.to_string(), top);
        }
    }

    let mut date_ranges = HashMap::new();
    for field in schema::sortable_fields() {
        if let Some(values) = snapshot.doc_values_numeric.get(field) {
            let min = values.values().copied().min();
            let max = values.values().copied().max();
            date_ranges.insert(field.to_string(), DateRangeHint { min, max });
        }
    }

    IndexStats {
        document_count,
        segment_count: 1,
        disk_bytes,
        facet_top_values,
        date_ranges,
        language_distribution: (*snapshot.language_distribution).clone(),
    }
}

fn estimate_disk_bytes(index_dir: &std::path::Path) -> u64 {
    std::fs::read_dir(index_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_numeric_field_for_suggestions() {
        let snapshot = Snapshot::default();
        let result = suggest_terms(&snapshot, schema::FIELD_FILE_SIZE, "1", 10);
        assert!(result.is_err());
    }
}
