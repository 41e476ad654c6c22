//! Reversed analyzer for `content_reversed` (§3.1, §4.2 B2): enables
//! efficient leading-wildcard queries by turning `*suffix` into a prefix
//! search once the term itself is reversed.

pub fn reverse_token(token: &str) -> String {
    token.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverses_unicode_scalar_values() {
        assert_eq!(reverse_token("vertrag"), "gartrev");
        assert_eq!(reverse_token("müller"), "rellüm");
    }
}
