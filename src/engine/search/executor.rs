//! Query executor (C5): builds the composite query, applies filters/facets,
//! sorts, paginates, and highlights. The single entry point every transport
//! method (`search`, `getDocumentDetails`'s passage reuse) goes through.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::index::store::Snapshot;
use crate::schema;

use super::filters::{self, FilterClause, FilterOp};
use super::highlighter::{self, Passage};
use super::query::Query;
use super::scoring;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;
const CONTENT_BOOST: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Score,
    ModifiedDate,
    CreatedDate,
    FileSize,
}

impl Default for SortBy {
    fn default() -> Self {
        SortBy::Score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFilter {
    pub field: String,
    #[serde(default)]
    pub op: Option<String>,
    pub value: Option<String>,
    pub values: Option<Vec<String>>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RawFilter {
    pub(crate) fn into_clause(self) -> EngineResult<FilterClause> {
        let op_name = self.op.as_deref().unwrap_or("eq");
        let op = match op_name {
            "eq" => FilterOp::Eq(self.value.ok_or_else(|| {
                EngineError::invalid_argument("filter op 'eq' requires 'value'")
            })?),
            "in" => FilterOp::In(self.values.ok_or_else(|| {
                EngineError::invalid_argument("filter op 'in' requires 'values'")
            })?),
            "not" => FilterOp::Not(self.value.ok_or_else(|| {
                EngineError::invalid_argument("filter op 'not' requires 'value'")
            })?),
            "not_in" => FilterOp::NotIn(self.values.ok_or_else(|| {
                EngineError::invalid_argument("filter op 'not_in' requires 'values'")
            })?),
            "range" => {
                let is_date_field = matches!(
                    self.field.as_str(),
                    schema::FIELD_CREATED_DATE | schema::FIELD_MODIFIED_DATE | schema::FIELD_INDEXED_DATE
                );
                let parse_bound = |s: Option<String>| -> EngineResult<Option<i64>> {
                    match s {
                        None => Ok(None),
                        Some(s) if is_date_field => Ok(Some(filters::parse_date(&s)?)),
                        Some(s) => s
                            .parse::<i64>()
                            .map(Some)
                            .map_err(|_| EngineError::invalid_range(format!("not a number: {s}"))),
                    }
                };
                FilterOp::Range { from: parse_bound(self.from)?, to: parse_bound(self.to)? }
            }
            other => return Err(EngineError::invalid_argument(format!("unknown filter op: {other}"))),
        };
        Ok(FilterClause { field: self.field, op })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub filters: Vec<RawFilter>,
    #[serde(default)]
    pub facets: Vec<String>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default = "default_max_passages")]
    pub max_passages: usize,
    #[serde(default = "default_max_passage_char_length")]
    pub max_passage_char_length: usize,
    #[serde(default)]
    pub language: Option<String>,
    /// Soft deadline (§5 "Cancellation / timeouts"); `None` means no deadline.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_max_passages() -> usize {
    3
}

fn default_max_passage_char_length() -> usize {
    200
}

#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub file_path: String,
    pub score: f32,
    pub file_name: String,
    pub file_extension: Option<String>,
    pub file_type: String,
    pub language: Option<String>,
    pub modified_date: i64,
    pub passages: Vec<Passage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetValue {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveFilterResult {
    pub field: String,
    pub match_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
    pub total_hits: u64,
    pub page: usize,
    pub page_size: usize,
    pub facets: HashMap<String, Vec<FacetValue>>,
    pub active_filters: Vec<ActiveFilterResult>,
    pub execution_time_ms: u64,
    pub partial: bool,
}

fn clamp_page_size(raw: Option<usize>) -> usize {
    raw.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Steps 1-5 of §4.5 "Main query construction".
pub fn build_main_query(query_text: &str, language_override: Option<&str>, distribution: &HashMap<String, u64>) -> EngineResult<Query> {
    let trimmed = query_text.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return Ok(Query::MatchAll);
    }

    let q_content = super::parser::parse(trimmed, schema::FIELD_CONTENT)?;
    let mut should = vec![(q_content, CONTENT_BOOST)];

    if let Some(lang) = language_override {
        if schema::SUPPORTED_LANGUAGES.contains(&lang) {
            let field = schema::stemmed_field_name(lang);
            let q_stemmed = super::parser::parse(trimmed, &field)?;
            should.push((q_stemmed, 1.0));
        }
    } else {
        for lang in schema::SUPPORTED_LANGUAGES {
            let weight = crate::index::language_boost_weight(distribution, lang);
            if weight > 0.0 {
                let field = schema::stemmed_field_name(lang);
                let q_stemmed = super::parser::parse(trimmed, &field)?;
                should.push((q_stemmed, weight));
            }
        }
    }

    Ok(Query::Boolean { should, must: vec![], must_not: vec![], minimum_should_match: 1 })
}

fn stored_field(snapshot: &Snapshot, doc_id: u32) -> Option<&crate::index::store::StoredDocument> {
    snapshot.doc(doc_id)
}

pub async fn search(snapshot: &Snapshot, request: &SearchRequest) -> EngineResult<SearchResponse> {
    let started = Instant::now();
    let deadline = request.deadline_ms.map(|ms| started + Duration::from_millis(ms));

    let page = request.page.unwrap_or(0);
    let page_size = clamp_page_size(request.page_size);

    let main_query =
        build_main_query(&request.query, request.language.as_deref(), &snapshot.language_distribution)?;
    let scored = scoring::evaluate(&main_query, snapshot);

    let clauses: Vec<FilterClause> =
        request.filters.clone().into_iter().map(RawFilter::into_clause).collect::<EngineResult<_>>()?;

    // activeFilters: cumulative hit count as each filter is layered on top
    // of the main query, in request order (§4.5 "Facets").
    let mut active_filters = Vec::with_capacity(clauses.len());
    let mut cumulative: std::collections::HashSet<u32> = scored.keys().copied().collect();
    for clause in &clauses {
        let matched = filters::matches(snapshot, clause)?;
        cumulative = cumulative.intersection(&matched).copied().collect();
        active_filters.push(ActiveFilterResult { field: clause.field.clone(), match_count: cumulative.len() as u64 });
    }
    let final_doc_ids: Vec<u32> = cumulative.into_iter().collect();

    // drill-sideways facets: each facet field counted with every filter
    // except one on that same field applied.
    let mut facets = HashMap::new();
    for facet_field in &request.facets {
        let mut sideways: std::collections::HashSet<u32> = scored.keys().copied().collect();
        for clause in &clauses {
            if &clause.field == facet_field {
                continue;
            }
            let matched = filters::matches(snapshot, clause)?;
            sideways = sideways.intersection(&matched).copied().collect();
        }
        let mut counts: HashMap<String, u64> = HashMap::new();
        if let Some(values) = snapshot.doc_values_keyword.get(facet_field.as_str()) {
            for doc_id in &sideways {
                if let Some(value) = values.get(doc_id) {
                    *counts.entry(value.clone()).or_insert(0) += 1;
                }
            }
        }
        let mut facet_values: Vec<FacetValue> =
            counts.into_iter().map(|(value, count)| FacetValue { value, count }).collect();
        facet_values.sort_by(|a, b| b.count.cmp(&a.count).then(a.value.cmp(&b.value)));
        facets.insert(facet_field.clone(), facet_values);
    }

    let mut ranked: Vec<(u32, f32)> = final_doc_ids
        .into_iter()
        .map(|id| (id, *scored.get(&id).unwrap_or(&0.0)))
        .collect();

    let mut partial = false;
    sort_hits(snapshot, &mut ranked, request.sort_by, request.sort_order);
    if let Some(deadline) = deadline {
        if Instant::now() >= deadline {
            partial = true;
        }
    }

    let total_hits = ranked.len() as u64;
    let start = page * page_size;
    let page_slice: Vec<(u32, f32)> = ranked.into_iter().skip(start).take(page_size).collect();

    let mut hits = Vec::with_capacity(page_slice.len());
    for (doc_id, score) in page_slice {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                partial = true;
                break;
            }
        }
        let Some(doc) = stored_field(snapshot, doc_id) else { continue };
        let occurrences = snapshot.content_term_vectors.get(&doc_id);
        let passages = match occurrences {
            Some(occurrences) => highlighter::highlight(
                &main_query,
                &doc.content,
                occurrences,
                request.max_passages,
                request.max_passage_char_length,
            ),
            None => vec![],
        };
        hits.push(Hit {
            file_path: doc.file_path.clone(),
            score,
            file_name: doc.file_name.clone(),
            file_extension: doc.file_extension.clone(),
            file_type: doc.file_type.clone(),
            language: doc.language.clone(),
            modified_date: doc.modified_date,
            passages,
        });
    }

    Ok(SearchResponse {
        hits,
        total_hits,
        page,
        page_size,
        facets,
        active_filters,
        execution_time_ms: started.elapsed().as_millis() as u64,
        partial,
    })
}

fn sort_hits(snapshot: &Snapshot, ranked: &mut [(u32, f32)], sort_by: SortBy, sort_order: SortOrder) {
    let key = |doc_id: u32| -> i64 {
        match sort_by {
            SortBy::Score => 0,
            SortBy::ModifiedDate => snapshot.doc(doc_id).map(|d| d.modified_date).unwrap_or(0),
            SortBy::CreatedDate => snapshot.doc(doc_id).map(|d| d.created_date).unwrap_or(0),
            SortBy::FileSize => snapshot.doc(doc_id).map(|d| d.file_size as i64).unwrap_or(0),
        }
    };
    ranked.sort_by(|(a_id, a_score), (b_id, b_score)| {
        let ordering = if sort_by == SortBy::Score {
            b_score.partial_cmp(a_score).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            let a_key = key(*a_id);
            let b_key = key(*b_id);
            match sort_order {
                SortOrder::Asc => a_key.cmp(&b_key),
                SortOrder::Desc => b_key.cmp(&a_key),
            }
            // tie-break by score descending (§4.5 "Sorting").
            .then_with(|| b_score.partial_cmp(a_score).unwrap_or(std::cmp::Ordering::Equal))
        };
        ordering
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(500)), MAX_PAGE_SIZE);
        assert_eq!(clamp_page_size(None), DEFAULT_PAGE_SIZE);
    }
}
