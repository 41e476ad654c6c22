//! Term-vector-based unified highlighter (§4.5 "Highlighting"): builds
//! passages from `content`'s term vectors (offsets), never from the stemmed
//! shadow fields, so a stemmed-only hit (P4) always falls back to the plain
//! excerpt passage.

use std::collections::HashSet;

use crate::index::store::ContentOccurrence;
use crate::schema;

use super::query::Query;

#[derive(Debug, Clone, serde::Serialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Passage {
    pub text: String,
    pub offset: usize,
    pub score: f32,
    pub matched_terms: Vec<String>,
    pub term_coverage: f32,
    pub spans: Vec<MatchSpan>,
}

/// Collects the literal terms (and prefix stems) a query asks of the
/// `content` field specifically, ignoring stemmed-shadow-field clauses
/// (those never drive highlighting offsets, only recall).
fn collect_content_terms(query: &Query, exact: &mut HashSet<String>, prefixes: &mut HashSet<String>) {
    match query {
        Query::MatchAll => {}
        Query::Term { field, term } if field == schema::FIELD_CONTENT => {
            exact.insert(term.clone());
        }
        Query::Term { .. } => {}
        Query::Phrase { field, terms, .. } if field == schema::FIELD_CONTENT => {
            exact.extend(terms.iter().cloned());
        }
        Query::Phrase { .. } => {}
        Query::Prefix { field, prefix, .. } if field == schema::FIELD_CONTENT => {
            prefixes.insert(prefix.clone());
        }
        Query::Prefix { .. } => {}
        Query::Boolean { should, must, must_not, .. } => {
            for (q, _) in should {
                collect_content_terms(q, exact, prefixes);
            }
            for q in must {
                collect_content_terms(q, exact, prefixes);
            }
            for q in must_not {
                collect_content_terms(q, exact, prefixes);
            }
        }
    }
}

fn is_match(term: &str, exact: &HashSet<String>, prefixes: &HashSet<String>) -> bool {
    exact.contains(term) || prefixes.iter().any(|p| term.starts_with(p.as_str()))
}

pub fn highlight(
    query: &Query,
    content: &str,
    occurrences: &[ContentOccurrence],
    max_passages: usize,
    max_passage_char_length: usize,
) -> Vec<Passage> {
    let mut exact = HashSet::new();
    let mut prefixes = HashSet::new();
    collect_content_terms(query, &mut exact, &mut prefixes);
    let query_unique_terms = exact.len().max(1);

    if content.is_empty() || occurrences.is_empty() {
        return vec![fallback_passage(content, max_passage_char_length)];
    }

    let mut windows: Vec<(usize, usize)> = Vec::new();
    let mut window_start = 0usize;
    while window_start < content.len() {
        let mut window_end = (window_start + max_passage_char_length).min(content.len());
        while window_end < content.len() && !content.is_char_boundary(window_end) {
            window_end += 1;
        }
        windows.push((window_start, window_end));
        if window_end == content.len() {
            break;
        }
        window_start = window_end;
    }

    let mut scored: Vec<Passage> = Vec::new();
    for (start, end) in windows {
        let in_window: Vec<&ContentOccurrence> =
            occurrences.iter().filter(|o| o.start_char >= start && o.end_char <= end).collect();
        let matched: Vec<&ContentOccurrence> =
            in_window.iter().filter(|o| is_match(&o.term, &exact, &prefixes)).copied().collect();
        if matched.is_empty() {
            continue;
        }
        let unique_matched: HashSet<&str> = matched.iter().map(|o| o.term.as_str()).collect();
        let coverage = unique_matched.len() as f32 / query_unique_terms as f32;
        let score = matched.len() as f32 * coverage;
        let spans = matched
            .iter()
            .map(|o| MatchSpan { start: o.start_char - start, end: o.end_char - start })
            .collect();
        scored.push(Passage {
            text: content[start..end].to_string(),
            offset: start,
            score,
            matched_terms: unique_matched.into_iter().map(str::to_string).collect(),
            term_coverage: coverage,
            spans,
        });
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(max_passages.max(1));

    if scored.is_empty() || scored.iter().all(|p| p.score <= 0.0) {
        return vec![fallback_passage(content, max_passage_char_length)];
    }
    scored
}

fn fallback_passage(content: &str, max_len: usize) -> Passage {
    let mut end = max_len.min(content.len());
    while end < content.len() && !content.is_char_boundary(end) {
        end += 1;
    }
    Passage {
        text: content[..end].to_string(),
        offset: 0,
        score: 0.0,
        matched_terms: Vec::new(),
        term_coverage: 0.0,
        spans: Vec::new(),
    }
}
