//! Reindenting SQL formatter

use super::Formatter;
use crate::error::{Result, ScoreError};
use crate::query::{tokenize, Token, TokenKind};

/// Keywords that start a new line
const CLAUSE_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "UNION", "EXCEPT",
    "INTERSECT", "VALUES", "SET", "RETURNING", "WINDOW",
];

/// Words that may precede `JOIN` and start the join line themselves
const JOIN_MODIFIERS: &[&str] = &["INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "OUTER"];

const INDENT: &str = "  ";

/// One clause per line, `AND`/`OR` indented under their clause
///
/// Keyword case and comments are preserved; whitespace is rebuilt.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlFormatter;

impl Formatter for SqlFormatter {
    fn format(&self, sql: &str) -> Result<String> {
        let tokens = tokenize(sql).map_err(|e| ScoreError::Format(e.to_string()))?;
        Ok(reindent(&tokens))
    }
}

fn reindent(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    let mut prev: Option<&Token> = None;
    let mut force_newline = false;

    for token in tokens {
        if token.is_punct(")") {
            depth = depth.saturating_sub(1);
        }

        let line_start = if force_newline {
            Some(depth)
        } else if starts_clause(token, prev) {
            Some(depth)
        } else if token.is_keyword("AND") || token.is_keyword("OR") {
            Some(depth + 1)
        } else {
            None
        };

        match line_start {
            Some(level) if !out.is_empty() && !prev.is_some_and(|p| p.is_punct("(")) => {
                trim_trailing_spaces(&mut out);
                out.push('\n');
                out.push_str(&INDENT.repeat(level));
            }
            _ => {
                if needs_space(prev, token) && !out.ends_with('\n') {
                    out.push(' ');
                }
            }
        }
        force_newline = false;

        out.push_str(&render(token));

        if token.is_punct("(") {
            depth += 1;
        }
        if token.is_punct(";") || (token.kind == TokenKind::Comment && token.text.starts_with("--")) {
            force_newline = true;
        }
        prev = Some(token);
    }

    trim_trailing_spaces(&mut out);
    out
}

fn starts_clause(token: &Token, prev: Option<&Token>) -> bool {
    if CLAUSE_KEYWORDS.iter().any(|k| token.is_keyword(k)) {
        // `UNION ALL SELECT` keeps SELECT on the UNION line
        return !prev.is_some_and(|p| p.is_keyword("ALL") || p.is_keyword("DISTINCT"));
    }
    if token.is_keyword("JOIN") {
        return !prev.is_some_and(|p| JOIN_MODIFIERS.iter().any(|m| p.is_keyword(m)));
    }
    if JOIN_MODIFIERS.iter().any(|m| token.is_keyword(m)) {
        // only the first modifier of `LEFT OUTER JOIN` breaks the line
        return !prev.is_some_and(|p| JOIN_MODIFIERS.iter().any(|m| p.is_keyword(m)));
    }
    false
}

fn needs_space(prev: Option<&Token>, token: &Token) -> bool {
    let Some(prev) = prev else { return false };
    if token.is_punct(",") || token.is_punct(")") || token.is_punct(";") || token.is_punct(".") {
        return false;
    }
    if prev.is_punct("(") || prev.is_punct(".") {
        return false;
    }
    // function call: `count(*)`
    if token.is_punct("(") && prev.kind == TokenKind::Name {
        return false;
    }
    true
}

fn render(token: &Token) -> String {
    match token.kind {
        TokenKind::Name if needs_quoting(&token.text) => {
            format!("\"{}\"", token.text.replace('"', "\"\""))
        }
        _ => token.text.clone(),
    }
}

fn needs_quoting(name: &str) -> bool {
    name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        || crate::query::parse::is_keyword(name)
}

fn trim_trailing_spaces(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}
