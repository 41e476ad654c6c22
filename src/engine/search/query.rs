//! The composite query AST the parser produces and the executor scores.
//! Plays the role of `seekstorm::search::QueryType`/`Query` but generalized
//! to a boolean tree over the fixed field set instead of one query per
//! request against a single field.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixMode {
    /// len(prefix) >= 4: per-term blended-frequency scoring over the top 50
    /// matching terms (§4.2 "Adaptive prefix scoring").
    Scored,
    /// len(prefix) < 4: every match scores identically.
    Constant,
}

#[derive(Debug, Clone)]
pub enum Query {
    MatchAll,
    Term { field: String, term: String },
    Phrase { field: String, terms: Vec<String>, slop: u32 },
    Prefix { field: String, prefix: String, mode: PrefixMode },
    Boolean { should: Vec<(Query, f32)>, must: Vec<Query>, must_not: Vec<Query>, minimum_should_match: usize },
}

impl Query {
    pub fn boosted(self, boost: f32) -> (Query, f32) {
        (self, boost)
    }
}

/// Textual form of a (possibly rewritten) query, used by `profileQuery`
/// (§4.8 "return query structure after rewrites").
pub fn describe(query: &Query) -> String {
    match query {
        Query::MatchAll => "MatchAll".to_string(),
        Query::Term { field, term } => format!("{field}:{term}"),
        Query::Phrase { field, terms, slop } => {
            if *slop == 0 {
                format!("{field}:\"{}\"", terms.join(" "))
            } else {
                format!("{field}:\"{}\"~{slop}", terms.join(" "))
            }
        }
        Query::Prefix { field, prefix, mode } => {
            let suffix = match mode {
                PrefixMode::Scored => "*",
                PrefixMode::Constant => "*(const)",
            };
            format!("{field}:{prefix}{suffix}")
        }
        Query::Boolean { should, must, must_not, minimum_should_match } => {
            let mut parts = Vec::new();
            for q in must {
                parts.push(format!("+{}", describe(q)));
            }
            for (q, boost) in should {
                if (*boost - 1.0).abs() < f32::EPSILON {
                    parts.push(describe(q));
                } else {
                    parts.push(format!("({})^{boost}", describe(q)));
                }
            }
            for q in must_not {
                parts.push(format!("-{}", describe(q)));
            }
            format!("BOOLEAN(minShouldMatch={minimum_should_match})[{}]", parts.join(" "))
        }
    }
}
