//! Standard tokenizer + lowercase + Unicode NFKC fold, adapted from the
//! character-scanning style of `seekstorm::tokenizer::tokenizer` but
//! simplified: this engine has no proximity/bigram tokenizer variants, only
//! the single normalizing prefix every analyzer in §4.1 shares.

use unicode_normalization::UnicodeNormalization;

/// `StandardTokenize -> Lowercase -> Unicode-NFKC-fold`. NFKC folding is what
/// lets `Muller` and `Müller` both reduce to `muller` (diacritic folding),
/// and what collapses full-width/ligature variants into their plain forms.
fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Splits normalized text on non-word-character boundaries, the same
/// start/end scan the teacher's tokenizer performs, minus the query-specific
/// `"+-` passthrough (the query parser handles those before tokens ever
/// reach the analyzer).
pub fn normalize_and_tokenize(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    let mut tokens = Vec::new();
    let mut start = false;
    let mut start_pos = 0;

    for (idx, ch) in normalized.char_indices() {
        let is_word = regex_syntax::is_word_character(ch);
        if is_word {
            if !start {
                start_pos = idx;
                start = true;
            }
        } else if start {
            tokens.push(normalized[start_pos..idx].to_string());
            start = false;
        }
    }
    if start {
        tokens.push(normalized[start_pos..].to_string());
    }
    tokens
}

/// Analyze a single query term (not a whole field value): used by the prefix
/// and phrase rewrite paths in the query parser, which already know they
/// have one token and just need it normalized the same way the index is.
pub fn tokenize_query_term(term: &str) -> String {
    normalize(term)
}
