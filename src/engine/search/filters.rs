//! Structured filters (§4.5 "Filters"): `eq`/`in`/`not`/`not_in`/`range`
//! clauses combined as a top-level `BOOLEAN must`, evaluated against
//! doc-values rather than the scored query tree (filters restrict the doc
//! set; they never contribute to score).

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{EngineError, EngineResult};
use crate::index::store::Snapshot;
use crate::schema;

#[derive(Debug, Clone)]
pub enum FilterOp {
    Eq(String),
    In(Vec<String>),
    Not(String),
    NotIn(Vec<String>),
    Range { from: Option<i64>, to: Option<i64> },
}

#[derive(Debug, Clone)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDThh:mm:ss`, and `YYYY-MM-DDThh:mm:ssZ`
/// (§4.5 "range"), returning epoch millis.
pub fn parse_date(value: &str) -> EngineResult<i64> {
    let trimmed = value.trim_end_matches('Z');
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.and_utc().timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis());
    }
    Err(EngineError::invalid_range(format!("unrecognized date: {value}")))
}

fn field_is_known(field: &str) -> bool {
    schema::field_spec(field).is_some()
}

pub fn validate(clause: &FilterClause) -> EngineResult<()> {
    if !field_is_known(&clause.field) {
        return Err(EngineError::invalid_field(format!("unknown filter field: {}", clause.field)));
    }
    Ok(())
}

/// Doc ids satisfying `clause` against `snapshot`.
pub fn matches(snapshot: &Snapshot, clause: &FilterClause) -> EngineResult<HashSet<u32>> {
    validate(clause)?;
    match &clause.op {
        FilterOp::Eq(value) => Ok(keyword_eq(snapshot, &clause.field, value)),
        FilterOp::In(values) => {
            let mut out = HashSet::new();
            for v in values {
                out.extend(keyword_eq(snapshot, &clause.field, v));
            }
            Ok(out)
        }
        FilterOp::Not(value) => {
            let excluded = keyword_eq(snapshot, &clause.field, value);
            Ok(all_live_docs(snapshot).difference(&excluded).copied().collect())
        }
        FilterOp::NotIn(values) => {
            let mut excluded = HashSet::new();
            for v in values {
                excluded.extend(keyword_eq(snapshot, &clause.field, v));
            }
            Ok(all_live_docs(snapshot).difference(&excluded).copied().collect())
        }
        FilterOp::Range { from, to } => {
            let lo = from.unwrap_or(i64::MIN);
            let hi = to.unwrap_or(i64::MAX);
            let Some(values) = snapshot.doc_values_numeric.get(clause.field.as_str()) else {
                return Err(EngineError::invalid_field(format!("not a range-filterable field: {}", clause.field)));
            };
            Ok(values.iter().filter(|(_, v)| **v >= lo && **v <= hi).map(|(id, _)| *id).collect())
        }
    }
}

fn keyword_eq(snapshot: &Snapshot, field: &str, value: &str) -> HashSet<u32> {
    if let Some(values) = snapshot.doc_values_keyword.get(field) {
        return values.iter().filter(|(_, v)| v.as_str() == value).map(|(id, _)| *id).collect();
    }
    if let Some(postings) = snapshot.postings.get(field) {
        if let Some(list) = postings.terms.get(value) {
            return list.iter().map(|p| p.doc_id).collect();
        }
    }
    HashSet::new()
}

fn all_live_docs(snapshot: &Snapshot) -> HashSet<u32> {
    snapshot
        .documents
        .iter()
        .enumerate()
        .filter_map(|(id, d)| d.as_ref().map(|_| id as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_parses_as_midnight_utc() {
        let ms = parse_date("2024-01-01").unwrap();
        assert_eq!(ms, 1704067200000);
    }

    #[test]
    fn datetime_with_zulu_suffix_parses() {
        let a = parse_date("2024-06-01T12:00:00Z").unwrap();
        let b = parse_date("2024-06-01T12:00:00").unwrap();
        assert_eq!(a, b);
    }
}
