//! Text analyzers (C1): a shared normalizing prefix plus three flavors bound
//! to fields via [`analyzer_for_field`], mirroring the teacher's per-field
//! tokenizer dispatch in `seekstorm::tokenizer` but rebuilt around the fixed
//! document schema instead of a user-supplied one.

mod reversed;
mod stemmer;
mod tokenizer;

pub use reversed::reverse_token;
pub use stemmer::{stem_token, StemOverrides};
pub use tokenizer::{normalize_and_tokenize, tokenize_query_term};

use crate::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analyzer {
    /// StandardTokenize -> Lowercase -> NFKC fold. Used for `content`, `title`,
    /// and the other metadata text fields.
    Default,
    /// Default analyzer, then each token's characters are reversed.
    Reversed,
    /// Default analyzer, then a Snowball stemmer for the given language.
    Stemmed(&'static str),
    /// No analysis: the raw value is the one term (file_path, file_extension, …).
    Keyword,
}

/// The per-field analyzer binding referenced throughout §4.1: query-time
/// analysis must use the same map as index-time analysis.
pub fn analyzer_for_field(field: &str) -> Analyzer {
    if field == schema::FIELD_CONTENT_REVERSED {
        return Analyzer::Reversed;
    }
    if let Some(lang) = schema::is_stemmed_field(field) {
        return Analyzer::Stemmed(lang);
    }
    match schema::field_spec(field) {
        Some(spec) if spec.kind == schema::FieldKind::Text => Analyzer::Default,
        _ => Analyzer::Keyword,
    }
}

/// Analyze `text` for `field`, yielding normalized tokens in document order.
/// `overrides` supplies irregular stem forms consulted ahead of Snowball
/// (the drop-in extension point noted in DESIGN.md's open-question ledger).
pub fn analyze(field: &str, text: &str, overrides: &StemOverrides) -> Vec<String> {
    match analyzer_for_field(field) {
        Analyzer::Keyword => vec![text.to_string()],
        Analyzer::Default => normalize_and_tokenize(text),
        Analyzer::Reversed => normalize_and_tokenize(text)
            .into_iter()
            .map(|t| reverse_token(&t))
            .collect(),
        Analyzer::Stemmed(lang) => normalize_and_tokenize(text)
            .into_iter()
            .map(|t| stem_token(lang, &t, overrides))
            .collect(),
    }
}
