//! Query normalization: literal/whitespace canonicalization and structure tags

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::parse::{parse_one, strip_comments, Node, Statement, Token, TokenKind};
use crate::error::ParseError;

/// Placeholder substituted for every literal
pub const PLACEHOLDER: &str = "?";

/// Canonical form of a query used for grouping and similarity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedQuery {
    pub canonical_text: String,
    pub structure_tokens: Vec<String>,
}

fn integer_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\b\d+\b").expect("valid integer regex"))
}

fn string_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"'[^']*'").expect("valid string regex"))
}

/// Replace standalone integers and single-quoted strings with `?`
///
/// Purely textual: digits inside identifiers such as `"col 1"` or inside
/// comments are replaced too.
pub fn normalize_parameters(query: &str) -> String {
    let query = integer_regex().replace_all(query, PLACEHOLDER);
    string_regex().replace_all(&query, PLACEHOLDER).into_owned()
}

/// Lowercase and collapse whitespace runs to single spaces
pub fn normalize_whitespace(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Walk a parsed statement and emit its structure tags
pub fn extract_structure(statement: &Statement) -> Vec<String> {
    let mut elements = vec![];
    for node in &statement.nodes {
        process_node(node, &mut elements);
    }
    elements
}

fn process_node(node: &Node, elements: &mut Vec<String>) {
    match node {
        Node::Token(token) => {
            if let Some(tag) = token_tag(token) {
                elements.push(tag);
            }
        }
        Node::Where(children) => {
            elements.push("WHERE".to_string());
            for child in children {
                match child {
                    Node::Comparison(_) => elements.push("COMPARISON".to_string()),
                    other => process_node(other, elements),
                }
            }
        }
        Node::Group(children) | Node::Comparison(children) => {
            for child in children {
                process_node(child, elements);
            }
        }
    }
}

fn token_tag(token: &Token) -> Option<String> {
    match token.kind {
        TokenKind::Keyword => Some(format!("KEYWORD:{}", token.text.to_uppercase())),
        TokenKind::Name => Some(format!("IDENTIFIER:{}", token.text.to_lowercase())),
        TokenKind::Number => Some("NUMBER".to_string()),
        TokenKind::String => Some("STRING".to_string()),
        TokenKind::Placeholder => Some("PARAM".to_string()),
        TokenKind::Punct => Some(format!("PUNCT:{}", token.text)),
        TokenKind::Comparison | TokenKind::Operator | TokenKind::Comment => None,
    }
}

/// Normalize a query and extract its structure
///
/// Comments are dropped before literals are replaced, so quotes inside them
/// cannot pair with real literals and a `--` comment cannot swallow the
/// rest of the query once lines are joined. The structure is taken from
/// the canonical text, so normalizing an already-normalized query is a
/// no-op. Only the first statement counts.
pub fn normalize_query(query: &str) -> Result<NormalizedQuery, ParseError> {
    let canonical_text = normalize_whitespace(&normalize_parameters(&strip_comments(query)?));
    let statement = parse_one(&canonical_text)?;
    let structure_tokens = extract_structure(&statement);

    Ok(NormalizedQuery {
        canonical_text,
        structure_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_parameters() {
        assert_eq!(
            normalize_parameters("SELECT * FROM users WHERE age > 25 AND name = 'Bob'"),
            "SELECT * FROM users WHERE age > ? AND name = ?"
        );
        // textual substitution, no SQL awareness
        assert_eq!(normalize_parameters("select col1, 2 from t"), "select col1, ? from t");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  SELECT *\n\tFROM   Users  "),
            "select * from users"
        );
    }

    #[test]
    fn test_extract_structure_tags() {
        let statement = parse_one("SELECT name, 'x', 3 FROM users WHERE age > 25").unwrap();
        assert_eq!(
            extract_structure(&statement),
            vec![
                "KEYWORD:SELECT",
                "IDENTIFIER:name",
                "PUNCT:,",
                "STRING",
                "PUNCT:,",
                "NUMBER",
                "KEYWORD:FROM",
                "IDENTIFIER:users",
                "WHERE",
                "KEYWORD:WHERE",
                "COMPARISON",
            ]
        );
    }

    #[test]
    fn test_normalize_query() {
        let normalized = normalize_query("SELECT *  FROM Users WHERE age > 25 LIMIT 10").unwrap();
        assert_eq!(
            normalized.canonical_text,
            "select * from users where age > ? limit ?"
        );
        assert_eq!(
            normalized.structure_tokens,
            vec![
                "KEYWORD:SELECT",
                "KEYWORD:FROM",
                "IDENTIFIER:users",
                "WHERE",
                "KEYWORD:WHERE",
                "COMPARISON",
                "KEYWORD:LIMIT",
                "PARAM",
            ]
        );
    }

    #[test]
    fn test_normalize_query_is_idempotent() {
        let queries = [
            "SELECT * FROM users WHERE age > 25",
            "select o.id, sum(o.total_price) from orders o join users u on u.id = o.user_id group by o.id",
            "INSERT INTO reviews (user_id, comment) VALUES (1, 'Great product!')",
        ];
        for query in queries {
            let first = normalize_query(query).unwrap();
            let second = normalize_query(&first.canonical_text).unwrap();
            assert_eq!(first, second, "not idempotent for {query}");
        }
    }

    #[test]
    fn test_normalize_query_parse_errors() {
        assert_eq!(normalize_query(""), Err(ParseError::Empty));
        assert!(matches!(
            normalize_query("select 'unterminated"),
            Err(ParseError::Tokenize(_))
        ));
    }

    #[test]
    fn test_line_comment_before_where_keeps_structure() {
        let commented = normalize_query("SELECT * FROM users -- active users\nWHERE age > 25").unwrap();
        let plain = normalize_query("SELECT * FROM users WHERE age > 25").unwrap();
        assert_eq!(commented, plain);
        assert!(commented.structure_tokens.contains(&"WHERE".to_string()));
        assert!(commented.structure_tokens.contains(&"COMPARISON".to_string()));
    }

    #[test]
    fn test_quote_inside_block_comment() {
        let normalized =
            normalize_query("SELECT name /* user's name */ FROM users WHERE name = 'Bob'").unwrap();
        assert_eq!(
            normalized.canonical_text,
            "select name from users where name = ?"
        );
        let again = normalize_query(&normalized.canonical_text).unwrap();
        assert_eq!(again, normalized);
    }
}
