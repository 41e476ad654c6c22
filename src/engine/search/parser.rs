//! Custom query parser (C2): a conventional `+required -excluded optional`
//! boolean parser, extended with phrase expansion and adaptive prefix
//! scoring. Built on the same `'"' | '+' | '-'` token-boundary handling the
//! teacher's tokenizer already special-cases for query text.

use crate::analysis;
use crate::error::{EngineError, EngineResult};
use crate::schema;

use super::query::{PrefixMode, Query};

const PHRASE_BOOST: f32 = 2.0;
const PHRASE_SLOP: u32 = 3;
const PREFIX_SCORED_MIN_LEN: usize = 4;

#[derive(Debug, Clone)]
enum Modifier {
    Required,
    Excluded,
    Optional,
}

#[derive(Debug, Clone)]
struct Clause {
    modifier: Modifier,
    text: String,
    is_phrase: bool,
    explicit_slop: Option<u32>,
}

/// Splits `input` into raw clauses, honoring quoted phrases and a leading
/// `+`/`-` modifier per clause (unquoted tokens only — a modifier inside a
/// phrase is just part of the phrase text).
fn lex(input: &str) -> EngineResult<Vec<Clause>> {
    let mut clauses = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }
        let modifier = match chars[i] {
            '+' => {
                i += 1;
                Modifier::Required
            }
            '-' => {
                i += 1;
                Modifier::Excluded
            }
            _ => Modifier::Optional,
        };
        if i >= chars.len() {
            break;
        }
        if chars[i] == '"' {
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(EngineError::invalid_query_syntax("unterminated phrase"));
            }
            let text: String = chars[start..i].iter().collect();
            i += 1;
            let mut slop = None;
            if i < chars.len() && chars[i] == '~' {
                i += 1;
                let digits_start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if i == digits_start {
                    return Err(EngineError::invalid_query_syntax("expected slop value after ~"));
                }
                let digits: String = chars[digits_start..i].iter().collect();
                slop = Some(digits.parse().unwrap_or(0));
            }
            if text.trim().is_empty() {
                return Err(EngineError::invalid_query_syntax("empty phrase"));
            }
            clauses.push(Clause { modifier, text, is_phrase: true, explicit_slop: slop });
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            clauses.push(Clause { modifier, text, is_phrase: false, explicit_slop: None });
        }
    }
    Ok(clauses)
}

fn prefix_query(field: &str, raw_prefix: &str) -> Query {
    let prefix = analysis::tokenize_query_term(raw_prefix);
    let mode = if prefix.chars().count() >= PREFIX_SCORED_MIN_LEN {
        PrefixMode::Scored
    } else {
        PrefixMode::Constant
    };
    Query::Prefix { field: field.to_string(), prefix, mode }
}

fn leading_wildcard_query(raw_suffix: &str) -> Query {
    let analyzed = analysis::tokenize_query_term(raw_suffix);
    let reversed: String = analyzed.chars().rev().collect();
    let mode = if reversed.chars().count() >= PREFIX_SCORED_MIN_LEN {
        PrefixMode::Scored
    } else {
        PrefixMode::Constant
    };
    Query::Prefix { field: schema::FIELD_CONTENT_REVERSED.to_string(), prefix: reversed, mode }
}

fn clause_query(field: &str, clause: &Clause) -> EngineResult<Query> {
    if clause.is_phrase {
        let terms: Vec<String> = clause.text.split_whitespace().map(analysis::tokenize_query_term).collect();
        if terms.is_empty() {
            return Err(EngineError::invalid_query_syntax("empty phrase"));
        }
        let slop = clause.explicit_slop.unwrap_or(0);
        if terms.len() > 1 && slop == 0 && clause.explicit_slop.is_none() {
            // phrase expansion (§4.2): (phrase^B) OR (phrase~S)
            let exact = Query::Phrase { field: field.to_string(), terms: terms.clone(), slop: 0 };
            let sloppy = Query::Phrase { field: field.to_string(), terms, slop: PHRASE_SLOP };
            return Ok(Query::Boolean {
                should: vec![(exact, PHRASE_BOOST), (sloppy, 1.0)],
                must: vec![],
                must_not: vec![],
                minimum_should_match: 1,
            });
        }
        Ok(Query::Phrase { field: field.to_string(), terms, slop })
    } else if clause.text == "*" {
        Ok(Query::MatchAll)
    } else if let Some(suffix) = clause.text.strip_prefix('*') {
        if suffix.is_empty() || suffix.contains('*') {
            return Err(EngineError::invalid_query_syntax("malformed wildcard"));
        }
        Ok(leading_wildcard_query(suffix))
    } else if let Some(prefix) = clause.text.strip_suffix('*') {
        if prefix.is_empty() {
            return Err(EngineError::invalid_query_syntax("malformed wildcard"));
        }
        Ok(prefix_query(field, prefix))
    } else {
        let term = analysis::tokenize_query_term(&clause.text);
        Ok(Query::Term { field: field.to_string(), term })
    }
}

/// Parses `input` against `field` (almost always `content`; the executor
/// re-parses the same string against each stemmed shadow field).
pub fn parse(input: &str, field: &str) -> EngineResult<Query> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return Ok(Query::MatchAll);
    }

    let clauses = lex(trimmed)?;
    if clauses.is_empty() {
        return Ok(Query::MatchAll);
    }
    if clauses.len() == 1 && matches!(clauses[0].modifier, Modifier::Optional) {
        return clause_query(field, &clauses[0]);
    }

    let mut must = Vec::new();
    let mut must_not = Vec::new();
    let mut should = Vec::new();
    for clause in &clauses {
        let q = clause_query(field, clause)?;
        match clause.modifier {
            Modifier::Required => must.push(q),
            Modifier::Excluded => must_not.push(q),
            Modifier::Optional => should.push((q, 1.0)),
        }
    }
    let minimum_should_match = if should.is_empty() { 0 } else { 1 };
    Ok(Query::Boolean { should, must, must_not, minimum_should_match })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_expands_to_boosted_exact_or_sloppy() {
        let q = parse("\"arbeitsvertrag mietvertrag\"", schema::FIELD_CONTENT).unwrap();
        match q {
            Query::Boolean { should, .. } => {
                assert_eq!(should.len(), 2);
                assert_eq!(should[0].1, PHRASE_BOOST);
            }
            other => panic!("expected boolean expansion, got {other:?}"),
        }
    }

    #[test]
    fn prefix_length_four_is_scored() {
        let q = prefix_query(schema::FIELD_CONTENT, "cont");
        match q {
            Query::Prefix { mode, .. } => assert_eq!(mode, PrefixMode::Scored),
            _ => panic!("expected prefix"),
        }
    }

    #[test]
    fn prefix_length_three_is_constant() {
        let q = prefix_query(schema::FIELD_CONTENT, "con");
        match q {
            Query::Prefix { mode, .. } => assert_eq!(mode, PrefixMode::Constant),
            _ => panic!("expected prefix"),
        }
    }

    #[test]
    fn leading_wildcard_rewrites_to_reversed_prefix() {
        let q = parse("*vertrag", schema::FIELD_CONTENT).unwrap();
        match q {
            Query::Prefix { field, prefix, .. } => {
                assert_eq!(field, schema::FIELD_CONTENT_REVERSED);
                assert_eq!(prefix, "gartrev");
            }
            other => panic!("expected prefix on reversed field, got {other:?}"),
        }
    }

    #[test]
    fn match_all_for_empty_or_star() {
        assert!(matches!(parse("", schema::FIELD_CONTENT).unwrap(), Query::MatchAll));
        assert!(matches!(parse("*", schema::FIELD_CONTENT).unwrap(), Query::MatchAll));
    }
}
