//! Blended textual + structural query similarity

use std::collections::HashSet;

use super::normalize::{normalize_query, NormalizedQuery};
use crate::error::ParseError;

pub const STRING_WEIGHT: f64 = 0.6;
pub const STRUCTURE_WEIGHT: f64 = 0.4;

/// Matching-characters ratio in `[0, 1]`: `2 * M / (len(a) + len(b))`
///
/// `M` is the length of the longest common subsequence, which keeps the
/// ratio symmetric in its arguments. Two empty strings are identical.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    2.0 * prev[b.len()] as f64 / total as f64
}

/// Jaccard similarity over the sets of structure tags
pub fn structure_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Similarity of two already-normalized queries
pub fn normalized_similarity(a: &NormalizedQuery, b: &NormalizedQuery) -> f64 {
    STRING_WEIGHT * string_similarity(&a.canonical_text, &b.canonical_text)
        + STRUCTURE_WEIGHT * structure_similarity(&a.structure_tokens, &b.structure_tokens)
}

/// Normalize both queries and compute their blended similarity
pub fn calculate_similarity(query1: &str, query2: &str) -> Result<f64, ParseError> {
    let norm1 = normalize_query(query1)?;
    let norm2 = normalize_query(query2)?;
    Ok(normalized_similarity(&norm1, &norm2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_string_similarity_bounds() {
        assert_eq!(string_similarity("", ""), 1.0);
        assert_eq!(string_similarity("abc", ""), 0.0);
        assert_eq!(string_similarity("select", "select"), 1.0);
        assert_eq!(string_similarity("abc", "xyz"), 0.0);
        // "abcd" vs "bcde": common "bcd" -> 2 * 3 / 8
        assert!((string_similarity("abcd", "bcde") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_structure_similarity() {
        let a = tags(&["KEYWORD:SELECT", "KEYWORD:FROM", "IDENTIFIER:users"]);
        let b = tags(&["KEYWORD:SELECT", "KEYWORD:FROM", "IDENTIFIER:orders", "KEYWORD:FROM"]);
        // {select, from} / {select, from, users, orders}
        assert!((structure_similarity(&a, &b) - 0.5).abs() < 1e-12);
        assert_eq!(structure_similarity(&a, &[]), 0.0);
        assert_eq!(structure_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_identical_queries_are_fully_similar() {
        let sim = calculate_similarity(
            "SELECT * FROM users WHERE age > 25",
            "select *   from users where age > 40",
        )
        .unwrap();
        assert!((sim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let pairs = [
            ("SELECT * FROM users", "SELECT name FROM users WHERE id = 1"),
            (
                "select o.id from orders o join users u on u.id = o.user_id",
                "select id from products order by price desc",
            ),
            ("delete from reviews", "insert into reviews (comment) values ('x')"),
        ];
        for (a, b) in pairs {
            let ab = calculate_similarity(a, b).unwrap();
            let ba = calculate_similarity(b, a).unwrap();
            assert!((ab - ba).abs() < 1e-12, "{a} / {b}: {ab} != {ba}");
            assert!((0.0..=1.0).contains(&ab));
        }
    }

    #[test]
    fn test_similarity_propagates_parse_errors() {
        assert!(calculate_similarity("select 1", "select 'oops").is_err());
    }
}
