//! Trigram string similarity.
//!
//! Each lower-cased alphanumeric word is padded with two leading spaces and one
//! trailing space, then cut into 3-character windows. Similarity is the size of
//! the shared trigram set over the size of the union. The same function is
//! registered on every connection as the SQL scalar `similarity(a, b)`.

use std::collections::HashSet;

/// Unique trigrams of `text`.
pub fn trigrams(text: &str) -> HashSet<String> {
    let mut set = HashSet::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = format!("  {} ", word.to_lowercase()).chars().collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }
    set
}

/// Trigram overlap in `[0, 1]`. Two strings without any words score 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (ta, tb) = (trigrams(a), trigrams(b));
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    let union = ta.len() + tb.len() - shared;
    shared as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_is_one() {
        assert_eq!(similarity("Webhook secret rotated", "webhook SECRET rotated"), 1.0);
    }

    #[test]
    fn punctuation_is_a_word_separator() {
        assert_eq!(similarity("pricing-v2", "pricing v2"), 1.0);
    }

    #[test]
    fn short_word_trigrams() {
        // "  a", " ab", "abc", "bc " vs "  a", " ab", "abd", "bd "
        assert_eq!(trigrams("abc").len(), 4);
        assert!((similarity("abc", "abd") - 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_text_scores_low() {
        let s = similarity(
            "stripe-webhook Webhook secret rotated every quarter",
            "godot-pay Export templates must match engine version",
        );
        assert!(s < 0.1, "got {s}");
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("--", "abc"), 0.0);
    }
}
