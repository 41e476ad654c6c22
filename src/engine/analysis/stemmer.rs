//! Snowball stemming per language, via the teacher's `rust-stemmers` fork
//! (already a dependency used by SeekStorm's own tokenizer for stopword and
//! morphological handling).

use std::collections::HashMap;
use std::sync::Arc;

use rust_stemmers::{Algorithm, Stemmer};

/// Irregular-form overrides consulted before the Snowball stemmer, the
/// drop-in extension point the spec's open questions leave for future
/// dictionary-based lemmatization. Empty by default.
#[derive(Debug, Clone, Default)]
pub struct StemOverrides {
    by_language: HashMap<&'static str, Arc<HashMap<String, String>>>,
}

impl StemOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, language: &'static str, surface: &str, stem: &str) -> Self {
        let entry = self.by_language.entry(language).or_insert_with(|| Arc::new(HashMap::new()));
        Arc::make_mut(entry).insert(surface.to_string(), stem.to_string());
        self
    }

    fn lookup(&self, language: &str, token: &str) -> Option<String> {
        self.by_language.get(language).and_then(|m| m.get(token)).cloned()
    }
}

fn algorithm_for(language: &str) -> Option<Algorithm> {
    match language {
        "en" => Some(Algorithm::English),
        "de" => Some(Algorithm::German),
        _ => None,
    }
}

/// Stem one already-normalized token for `language`. Unsupported languages
/// (should not occur given [`crate::schema::SUPPORTED_LANGUAGES`]) pass the
/// token through unchanged rather than panicking.
pub fn stem_token(language: &str, token: &str, overrides: &StemOverrides) -> String {
    if let Some(stem) = overrides.lookup(language, token) {
        return stem;
    }
    match algorithm_for(language) {
        Some(algorithm) => Stemmer::create(algorithm).stem(token).into_owned(),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn german_stem_shares_root_across_forms() {
        let overrides = StemOverrides::new();
        let vertrag = stem_token("de", "vertrag", &overrides);
        let vertraege = stem_token("de", "verträge", &overrides);
        let vertragspartner = stem_token("de", "vertragspartner", &overrides);
        // all three reduce to a shared stem prefix, which is what lets a
        // query for "vertrag" recall "verträge" and "vertragspartner".
        assert!(vertraege.starts_with(&vertrag[..vertrag.len().min(5)]));
        assert!(vertragspartner.starts_with(&vertrag[..vertrag.len().min(5)]));
    }

    #[test]
    fn override_wins_over_snowball() {
        let overrides = StemOverrides::new().with_override("en", "better", "good");
        assert_eq!(stem_token("en", "better", &overrides), "good");
    }
}
