//! In-memory inverted index primitives: one posting list per (field, term).
//! Positions are token offsets within the field, used for phrase/slop
//! matching; `content`'s term vectors additionally carry character offsets
//! for highlighting (see [`super::store::ContentOccurrence`]).

use ahash::AHashMap;

#[derive(Debug, Clone)]
pub struct Posting {
    pub doc_id: u32,
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn term_freq(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// Term -> postings, kept in a `BTreeMap` so that range scans from a prefix
/// (suggestTerms, prefix query rewrite) are a single seek-forward walk rather
/// than a full dictionary sweep.
pub type TermDictionary = std::collections::BTreeMap<String, Vec<Posting>>;

#[derive(Debug, Default)]
pub struct FieldPostings {
    pub terms: TermDictionary,
}

impl FieldPostings {
    pub fn add(&mut self, term: &str, doc_id: u32, position: u32) {
        let postings = self.terms.entry(term.to_string()).or_default();
        match postings.last_mut() {
            Some(p) if p.doc_id == doc_id => p.positions.push(position),
            _ => postings.push(Posting { doc_id, positions: vec![position] }),
        }
    }

    /// Removes every posting for `doc_id`. Called before re-adding on UPDATE
    /// (I1) and on DELETE.
    pub fn remove_doc(&mut self, doc_id: u32) {
        self.terms.retain(|_, postings| {
            postings.retain(|p| p.doc_id != doc_id);
            !postings.is_empty()
        });
    }

    pub fn doc_freq(&self, term: &str) -> u32 {
        self.terms.get(term).map(|p| p.len() as u32).unwrap_or(0)
    }

    /// Terms `>= prefix` in dictionary order, stopping the caller's iteration
    /// once a term no longer starts with `prefix` (observability C9).
    pub fn terms_from(&self, prefix: &str) -> impl Iterator<Item = (&String, &Vec<Posting>)> {
        self.terms.range(prefix.to_string()..)
    }
}

pub type PerFieldPostings = AHashMap<String, FieldPostings>;
