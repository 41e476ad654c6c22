//! Language distribution cache (§3.2): `language -> document count`,
//! refreshed after each commit and consulted by the query executor to derive
//! per-language boost weights (P6).

use std::collections::HashMap;

pub fn compute(documents: &[Option<super::store::StoredDocument>]) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for doc in documents.iter().flatten() {
        if let Some(lang) = &doc.language {
            *counts.entry(lang.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// `w(L) = 0.3 + 0.7 * count(L)/total` when `count(L) > 0`, else `0` (P6).
pub fn boost_weight(distribution: &HashMap<String, u64>, language: &str) -> f32 {
    let total: u64 = distribution.values().sum();
    if total == 0 {
        return 0.0;
    }
    let count = *distribution.get(language).unwrap_or(&0);
    if count == 0 {
        return 0.0;
    }
    0.3 + 0.7 * (count as f32 / total as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_is_zero_for_absent_language() {
        let mut d = HashMap::new();
        d.insert("de".to_string(), 10u64);
        assert_eq!(boost_weight(&d, "fr"), 0.0);
    }

    #[test]
    fn weight_formula_matches_spec() {
        let mut d = HashMap::new();
        d.insert("de".to_string(), 3u64);
        d.insert("en".to_string(), 1u64);
        let w = boost_weight(&d, "de");
        assert!((w - (0.3 + 0.7 * 0.75)).abs() < 1e-6);
    }
}
