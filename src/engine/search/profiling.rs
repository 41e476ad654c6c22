//! `profileQuery` (C9 / §4.8): query-structure and cost diagnostics for an AI
//! client tuning its own queries. Three independent levels, each opt-in past
//! level 1 so a caller doesn't pay for explanations it didn't ask for.

use serde::Serialize;

use crate::error::EngineResult;
use crate::index::store::Snapshot;

use super::executor::{build_main_query, RawFilter};
use super::filters::{self, FilterClause};
use super::query::{self, Query};
use super::scoring;

const RARE_MAX_RATIO: f32 = 0.01;
const COMMON_MAX_RATIO: f32 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Rare,
    Common,
    VeryCommon,
}

#[derive(Debug, Clone, Serialize)]
pub struct TermStat {
    pub field: String,
    pub term: String,
    pub doc_freq: u64,
    pub total_docs: u64,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterImpactStep {
    pub field: String,
    pub cumulative_match_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClauseContribution {
    pub clause: String,
    pub score: f32,
    pub contribution_pct: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocExplanation {
    pub file_path: String,
    pub total_score: f32,
    pub clauses: Vec<ClauseContribution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub rewritten_query: String,
    pub term_stats: Vec<TermStat>,
    pub estimated_cost: u64,
    pub filter_impact: Option<Vec<FilterImpactStep>>,
    pub explanations: Vec<DocExplanation>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileRequest {
    pub query: String,
    pub language: Option<String>,
    pub filters: Vec<RawFilter>,
    pub filter_impact: bool,
    pub explain_docs: Vec<String>,
}

enum Clause {
    Term { field: String, term: String },
    Phrase { field: String, terms: Vec<String> },
    Prefix { field: String, prefix: String },
}

fn collect_clauses(query: &Query, out: &mut Vec<Clause>) {
    match query {
        Query::MatchAll => {}
        Query::Term { field, term } => out.push(Clause::Term { field: field.clone(), term: term.clone() }),
        Query::Phrase { field, terms, .. } => {
            out.push(Clause::Phrase { field: field.clone(), terms: terms.clone() })
        }
        Query::Prefix { field, prefix, .. } => {
            out.push(Clause::Prefix { field: field.clone(), prefix: prefix.clone() })
        }
        Query::Boolean { should, must, must_not, .. } => {
            for (q, _) in should {
                collect_clauses(q, out);
            }
            for q in must {
                collect_clauses(q, out);
            }
            for q in must_not {
                collect_clauses(q, out);
            }
        }
    }
}

fn rarity(doc_freq: u64, total_docs: u64) -> Rarity {
    if total_docs == 0 || doc_freq == 0 {
        return Rarity::Rare;
    }
    let ratio = doc_freq as f32 / total_docs as f32;
    if ratio < RARE_MAX_RATIO {
        Rarity::Rare
    } else if ratio <= COMMON_MAX_RATIO {
        Rarity::Common
    } else {
        Rarity::VeryCommon
    }
}

fn doc_freq_for(snapshot: &Snapshot, field: &str, term: &str) -> u64 {
    snapshot.postings.get(field).map(|fp| fp.doc_freq(term) as u64).unwrap_or(0)
}

fn prefix_doc_freq(snapshot: &Snapshot, field: &str, prefix: &str) -> u64 {
    let Some(fp) = snapshot.postings.get(field) else { return 0 };
    fp.terms_from(prefix)
        .take_while(|(t, _)| t.starts_with(prefix))
        .take(1000)
        .map(|(_, postings)| postings.len() as u64)
        .sum()
}

fn term_stats(snapshot: &Snapshot, clauses: &[Clause]) -> Vec<TermStat> {
    let total_docs = snapshot.live_doc_count() as u64;
    let mut stats = Vec::new();
    for clause in clauses {
        match clause {
            Clause::Term { field, term } => {
                let doc_freq = doc_freq_for(snapshot, field, term);
                stats.push(TermStat {
                    field: field.clone(),
                    term: term.clone(),
                    doc_freq,
                    total_docs,
                    rarity: rarity(doc_freq, total_docs),
                });
            }
            Clause::Phrase { field, terms } => {
                for term in terms {
                    let doc_freq = doc_freq_for(snapshot, field, term);
                    stats.push(TermStat {
                        field: field.clone(),
                        term: term.clone(),
                        doc_freq,
                        total_docs,
                        rarity: rarity(doc_freq, total_docs),
                    });
                }
            }
            Clause::Prefix { field, prefix } => {
                let doc_freq = prefix_doc_freq(snapshot, field, prefix);
                stats.push(TermStat {
                    field: field.clone(),
                    term: format!("{prefix}*"),
                    doc_freq,
                    total_docs,
                    rarity: rarity(doc_freq, total_docs),
                });
            }
        }
    }
    stats
}

/// Level 2: re-run the clause-accumulated filter set, recording the match
/// count after each filter is layered on (mirrors `executor::search`'s
/// `activeFilters` computation, kept independent so profiling never takes a
/// lock on the live searcher beyond the snapshot it was handed).
fn filter_impact(snapshot: &Snapshot, main_query: &Query, clauses: &[FilterClause]) -> EngineResult<Vec<FilterImpactStep>> {
    let scored = scoring::evaluate(main_query, snapshot);
    let mut cumulative: std::collections::HashSet<u32> = scored.keys().copied().collect();
    let mut steps = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let matched = filters::matches(snapshot, clause)?;
        cumulative = cumulative.intersection(&matched).copied().collect();
        steps.push(FilterImpactStep { field: clause.field.clone(), cumulative_match_count: cumulative.len() as u64 });
    }
    Ok(steps)
}

/// Level 3: per-clause score contribution for specific documents, derived by
/// re-evaluating each top-level `should`/`must` clause in isolation against
/// the same snapshot and comparing its contribution to the combined score.
fn explain_docs(snapshot: &Snapshot, main_query: &Query, file_paths: &[String]) -> Vec<DocExplanation> {
    let Query::Boolean { should, must, .. } = main_query else {
        return file_paths
            .iter()
            .filter_map(|p| snapshot.doc_by_path(p))
            .map(|(_, d)| DocExplanation { file_path: d.file_path.clone(), total_score: 0.0, clauses: vec![] })
            .collect();
    };

    let mut named_maps: Vec<(String, std::collections::HashMap<u32, f32>)> = Vec::new();
    for q in must {
        named_maps.push((format!("+{}", query::describe(q)), scoring::evaluate(q, snapshot)));
    }
    for (q, boost) in should {
        let mut scores = scoring::evaluate(q, snapshot);
        for v in scores.values_mut() {
            *v *= boost;
        }
        named_maps.push((query::describe(q), scores));
    }

    let mut explanations = Vec::new();
    for path in file_paths {
        let Some((doc_id, doc)) = snapshot.doc_by_path(path) else { continue };
        let mut clause_scores = Vec::new();
        let mut total = 0.0f32;
        for (name, map) in &named_maps {
            if let Some(score) = map.get(&doc_id) {
                clause_scores.push((name.clone(), *score));
                total += score;
            }
        }
        let clauses = clause_scores
            .into_iter()
            .map(|(clause, score)| ClauseContribution {
                clause,
                score,
                contribution_pct: if total > 0.0 { score / total * 100.0 } else { 0.0 },
            })
            .collect();
        explanations.push(DocExplanation { file_path: doc.file_path.clone(), total_score: total, clauses });
    }
    explanations
}

pub fn profile(snapshot: &Snapshot, request: &ProfileRequest) -> EngineResult<ProfileResponse> {
    let main_query =
        build_main_query(&request.query, request.language.as_deref(), &snapshot.language_distribution)?;

    let mut clauses = Vec::new();
    collect_clauses(&main_query, &mut clauses);
    let stats = term_stats(snapshot, &clauses);
    let estimated_cost: u64 = stats.iter().map(|s| s.doc_freq.max(1)).sum();

    let filter_clauses: Vec<FilterClause> =
        request.filters.clone().into_iter().map(RawFilter::into_clause).collect::<EngineResult<_>>()?;

    let impact = if request.filter_impact && !filter_clauses.is_empty() {
        Some(filter_impact(snapshot, &main_query, &filter_clauses)?)
    } else {
        None
    };

    let explanations = if request.explain_docs.is_empty() {
        vec![]
    } else {
        explain_docs(snapshot, &main_query, &request.explain_docs)
    };

    Ok(ProfileResponse {
        rewritten_query: query::describe(&main_query),
        term_stats: stats,
        estimated_cost,
        filter_impact: impact,
        explanations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rarity_boundaries_match_spec() {
        assert_eq!(rarity(5, 1000), Rarity::Rare);
        assert_eq!(rarity(100, 1000), Rarity::Common);
        assert_eq!(rarity(300, 1000), Rarity::VeryCommon);
    }
}
