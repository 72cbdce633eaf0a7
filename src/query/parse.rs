//! SQL token stream and statement grouping
//!
//! Tokens come from `sqlparser`'s tokenizer with the SQLite dialect. This
//! module cuts the token stream into statements at `;` and groups each one
//! into a shallow tree: parenthesised groups, `WHERE` clauses, and
//! comparisons inside `WHERE` clauses. That is all the normalizer,
//! formatter and linter need.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token as SqlToken, Tokenizer, Whitespace, Word};

use crate::error::ParseError;

/// Token classes produced by [`tokenize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    /// Bare or quoted identifier
    Name,
    Number,
    String,
    /// Bind parameter (`?`, `?1`, `$name`)
    Placeholder,
    /// `( ) , ; .`
    Punct,
    /// `= == <> < > <= >= <=>`
    Comparison,
    Operator,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text; quoted identifiers keep only their inner text
    pub text: String,
    /// 1-based line of the token's first character
    pub line: usize,
    /// Preceded by a space or tab on the same line
    pub space_before: bool,
}

impl Token {
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(word)
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }
}

/// Reserved words treated as keywords; other words the tokenizer knows as
/// keywords (`name`, `comment`, `count`, ...) stay identifiers
const KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE", "CAST", "COLLATE",
    "COMMIT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DEFAULT",
    "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "ESCAPE", "EXCEPT", "EXISTS", "EXPLAIN",
    "FALSE", "FETCH", "FIRST", "FOREIGN", "FROM", "FULL", "GLOB", "GROUP", "HAVING", "ILIKE",
    "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE",
    "LIMIT", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "OVER",
    "PARTITION", "PLAN", "PRIMARY", "QUERY", "RECURSIVE", "REFERENCES", "REPLACE", "RETURNING",
    "RIGHT", "ROLLBACK", "SELECT", "SET", "TABLE", "THEN", "TRUE", "UNION", "UNIQUE", "UPDATE",
    "USING", "VALUES", "VIEW", "WHEN", "WHERE", "WINDOW", "WITH",
];

/// Keywords that end a `WHERE` clause
const WHERE_TERMINATORS: &[&str] = &[
    "GROUP", "ORDER", "LIMIT", "HAVING", "UNION", "EXCEPT", "INTERSECT", "RETURNING", "WINDOW",
    "OFFSET", "FETCH",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

fn lex(sql: &str) -> Result<Vec<SqlToken>, ParseError> {
    let dialect = SQLiteDialect {};
    Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| ParseError::Tokenize(e.to_string()))
}

/// Split SQL text into tokens, dropping whitespace
pub fn tokenize(sql: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = vec![];
    let mut line = 1;
    let mut space_before = false;

    for raw in lex(sql)? {
        let classified = match &raw {
            SqlToken::EOF => None,
            SqlToken::Whitespace(Whitespace::Space) | SqlToken::Whitespace(Whitespace::Tab) => {
                space_before = true;
                None
            }
            SqlToken::Whitespace(Whitespace::Newline) => {
                space_before = false;
                None
            }
            SqlToken::Whitespace(Whitespace::SingleLineComment { comment, prefix }) => Some((
                TokenKind::Comment,
                format!("{}{}", prefix, comment.trim_end()),
            )),
            SqlToken::Whitespace(Whitespace::MultiLineComment(comment)) => {
                Some((TokenKind::Comment, format!("/*{}*/", comment)))
            }
            SqlToken::Word(word) => Some(classify_word(word)),
            SqlToken::Number(number, _) => Some((TokenKind::Number, number.clone())),
            SqlToken::SingleQuotedString(_)
            | SqlToken::DoubleQuotedString(_)
            | SqlToken::NationalStringLiteral(_)
            | SqlToken::EscapedStringLiteral(_)
            | SqlToken::HexStringLiteral(_) => Some((TokenKind::String, render(&raw))),
            SqlToken::Placeholder(name) => Some((TokenKind::Placeholder, name.clone())),
            SqlToken::LParen
            | SqlToken::RParen
            | SqlToken::Comma
            | SqlToken::SemiColon
            | SqlToken::Period => Some((TokenKind::Punct, raw.to_string())),
            SqlToken::Eq
            | SqlToken::DoubleEq
            | SqlToken::Neq
            | SqlToken::Lt
            | SqlToken::Gt
            | SqlToken::LtEq
            | SqlToken::GtEq
            | SqlToken::Spaceship => Some((TokenKind::Comparison, raw.to_string())),
            other => Some((TokenKind::Operator, other.to_string())),
        };

        if let Some((kind, text)) = classified {
            tokens.push(Token {
                kind,
                text,
                line,
                space_before,
            });
            space_before = false;
        }
        line += render(&raw).matches('\n').count();
    }

    Ok(tokens)
}

fn classify_word(word: &Word) -> (TokenKind, String) {
    let reserved =
        word.quote_style.is_none() && word.keyword != Keyword::NoKeyword && is_keyword(&word.value);
    let kind = if reserved {
        TokenKind::Keyword
    } else {
        TokenKind::Name
    };
    (kind, word.value.clone())
}

/// Source text of a token, with quotes escaped the SQL way
fn render(token: &SqlToken) -> String {
    match token {
        SqlToken::Word(word) => match word.quote_style {
            Some(quote) => {
                let close = if quote == '[' { ']' } else { quote };
                let escaped = word
                    .value
                    .replace(close, &format!("{}{}", close, close));
                format!("{}{}{}", quote, escaped, close)
            }
            None => word.value.clone(),
        },
        SqlToken::SingleQuotedString(s) => format!("'{}'", s.replace('\'', "''")),
        other => other.to_string(),
    }
}

/// SQL text with comments removed
///
/// Line comments become a newline and block comments a space, so the
/// tokens around them stay apart.
pub fn strip_comments(sql: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(sql.len());
    for token in lex(sql)? {
        match token {
            SqlToken::EOF => {}
            SqlToken::Whitespace(Whitespace::SingleLineComment { .. }) => out.push('\n'),
            SqlToken::Whitespace(Whitespace::MultiLineComment(_)) => out.push(' '),
            other => out.push_str(&render(&other)),
        }
    }
    Ok(out)
}

/// Node of a grouped statement
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Token(Token),
    /// Parenthesised group, including its `(` and `)` tokens
    Group(Vec<Node>),
    /// `WHERE` clause, starting with the `WHERE` keyword
    Where(Vec<Node>),
    /// `operand <op> operand` inside a `WHERE` clause
    Comparison(Vec<Node>),
}

impl Node {
    fn token(&self) -> Option<&Token> {
        match self {
            Node::Token(t) => Some(t),
            _ => None,
        }
    }

    fn is_punct(&self, punct: &str) -> bool {
        self.token().is_some_and(|t| t.is_punct(punct))
    }

    fn is_operand(&self) -> bool {
        match self {
            Node::Token(t) => matches!(
                t.kind,
                TokenKind::Name | TokenKind::Number | TokenKind::String | TokenKind::Placeholder
            ),
            Node::Group(_) => true,
            _ => false,
        }
    }

    fn is_comparison_operator(&self) -> bool {
        self.token().is_some_and(|t| {
            t.kind == TokenKind::Comparison || t.is_keyword("LIKE") || t.is_keyword("ILIKE")
        })
    }
}

/// A single grouped statement
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub nodes: Vec<Node>,
}

/// Parse SQL text and return its statements
///
/// Empty statements (stray `;`, comment-only text) are skipped.
pub fn parse(sql: &str) -> Result<Vec<Statement>, ParseError> {
    let tokens = tokenize(sql)?;
    let mut statements = vec![];
    let mut current: Vec<Token> = vec![];

    for token in tokens {
        match token.kind {
            TokenKind::Comment => continue,
            TokenKind::Punct if token.text == ";" => {
                if !current.is_empty() {
                    statements.push(build_statement(std::mem::take(&mut current))?);
                }
            }
            _ => current.push(token),
        }
    }
    if !current.is_empty() {
        statements.push(build_statement(current)?);
    }

    Ok(statements)
}

/// Parse SQL text and return its first statement
///
/// Trailing statements are dropped.
pub fn parse_one(sql: &str) -> Result<Statement, ParseError> {
    let mut statements = parse(sql)?;
    if statements.len() > 1 {
        tracing::debug!(
            dropped = statements.len() - 1,
            "multiple statements found, using the first"
        );
    }
    if statements.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(statements.swap_remove(0))
}

fn build_statement(tokens: Vec<Token>) -> Result<Statement, ParseError> {
    let mut iter = tokens.into_iter().peekable();
    let nodes = group_nodes(&mut iter, None)?;
    if let Some(extra) = iter.next() {
        return Err(ParseError::UnbalancedParenthesis(extra.line));
    }
    Ok(Statement { nodes })
}

type TokenIter = std::iter::Peekable<std::vec::IntoIter<Token>>;

/// Group tokens until the end of input or the `)` matching the `(` on line `open`
fn group_nodes(iter: &mut TokenIter, open: Option<usize>) -> Result<Vec<Node>, ParseError> {
    let mut nodes = vec![];

    while let Some(token) = iter.peek() {
        if token.is_punct(")") {
            if open.is_none() {
                return Err(ParseError::UnbalancedParenthesis(token.line));
            }
            return Ok(nodes);
        }

        if token.is_keyword("WHERE") {
            nodes.push(group_where(iter)?);
            continue;
        }

        let Some(token) = iter.next() else { break };
        if token.is_punct("(") {
            nodes.push(group_parenthesis(iter, token)?);
        } else {
            nodes.push(Node::Token(token));
        }
    }

    match open {
        Some(line) => Err(ParseError::UnbalancedParenthesis(line)),
        None => Ok(nodes),
    }
}

fn group_parenthesis(iter: &mut TokenIter, open: Token) -> Result<Node, ParseError> {
    let line = open.line;
    let mut children = vec![Node::Token(open)];
    children.extend(group_nodes(iter, Some(line))?);
    match iter.next() {
        Some(close) if close.is_punct(")") => children.push(Node::Token(close)),
        _ => return Err(ParseError::UnbalancedParenthesis(line)),
    }
    Ok(Node::Group(children))
}

fn group_where(iter: &mut TokenIter) -> Result<Node, ParseError> {
    let mut children = vec![];
    if let Some(keyword) = iter.next() {
        children.push(Node::Token(keyword));
    }

    while let Some(token) = iter.peek() {
        if token.is_punct(")")
            || WHERE_TERMINATORS.iter().any(|word| token.is_keyword(word))
        {
            break;
        }
        let Some(token) = iter.next() else { break };
        if token.is_punct("(") {
            children.push(group_parenthesis(iter, token)?);
        } else {
            children.push(Node::Token(token));
        }
    }

    Ok(Node::Where(group_comparisons(children)))
}

fn group_comparisons(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut iter = nodes.into_iter().peekable();

    while let Some(node) = iter.next() {
        if !node.is_comparison_operator() {
            out.push(node);
            continue;
        }

        let mut parts = take_left_operand(&mut out);
        if parts.is_empty() {
            out.push(node);
            continue;
        }
        parts.push(node);

        if let Some(operand) = iter.next_if(Node::is_operand) {
            parts.push(operand);
            while let Some(dot) = iter.next_if(|n| n.is_punct(".")) {
                parts.push(dot);
                if let Some(operand) = iter.next_if(Node::is_operand) {
                    parts.push(operand);
                }
            }
        }
        out.push(Node::Comparison(parts));
    }

    out
}

/// Pop a possibly qualified operand (`a`, `t.a`, `s.t.a`) off the end of `out`
fn take_left_operand(out: &mut Vec<Node>) -> Vec<Node> {
    if !out.last().is_some_and(Node::is_operand) {
        return vec![];
    }
    let mut start = out.len() - 1;
    while start >= 2 && out[start - 1].is_punct(".") && out[start - 2].is_operand() {
        start -= 2;
    }
    out.split_off(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<TokenKind> {
        tokenize(sql).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_basic_select() {
        assert_eq!(
            kinds("SELECT name FROM users WHERE age >= 25"),
            vec![
                TokenKind::Keyword,
                TokenKind::Name,
                TokenKind::Keyword,
                TokenKind::Name,
                TokenKind::Keyword,
                TokenKind::Name,
                TokenKind::Comparison,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn test_tokenize_literals_and_quotes() {
        let tokens = tokenize(r#"select "Full Name", 'it''s', 2.5e3, ? from t"#).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Name);
        assert_eq!(tokens[1].text, "Full Name");
        assert_eq!(tokens[3].kind, TokenKind::String);
        assert_eq!(tokens[3].text, "'it''s'");
        assert_eq!(tokens[5].kind, TokenKind::Number);
        assert_eq!(tokens[5].text, "2.5e3");
        assert_eq!(tokens[7].kind, TokenKind::Placeholder);
    }

    #[test]
    fn test_tokenize_errors() {
        for sql in ["select 'abc", "select \"abc", "select 1 /* never closed"] {
            assert!(
                matches!(tokenize(sql), Err(ParseError::Tokenize(_))),
                "{sql} should not tokenize"
            );
        }
    }

    #[test]
    fn test_tokenize_lines_and_spacing() {
        let tokens = tokenize("SELECT a , b\n-- note\nFROM t").unwrap();
        let comma = &tokens[2];
        assert!(comma.is_punct(","));
        assert!(comma.space_before);
        assert_eq!(tokens[4].kind, TokenKind::Comment);
        assert_eq!(tokens[4].text, "-- note");
        assert_eq!(tokens[4].line, 2);
        assert!(tokens[5].is_keyword("FROM"));
        assert_eq!(tokens[5].line, 3);
        assert!(!tokens[5].space_before);
    }

    #[test]
    fn test_non_reserved_words_are_names() {
        let tokens = tokenize("SELECT name, count(id) FROM users").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Name);
        assert_eq!(tokens[3].kind, TokenKind::Name);
        assert_eq!(tokens[5].kind, TokenKind::Name);
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(
            strip_comments("SELECT name /* user's name */ FROM users -- all\nWHERE name = 'O''Hara'")
                .unwrap(),
            "SELECT name   FROM users \nWHERE name = 'O''Hara'"
        );
        assert_eq!(strip_comments(r#"select "a""b" from [t]"#).unwrap(), r#"select "a""b" from [t]"#);
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse_one("   "), Err(ParseError::Empty));
        assert_eq!(parse_one(" ; -- nothing here"), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_keeps_first_statement() {
        let statements = parse("select 1; select 2;").unwrap();
        assert_eq!(statements.len(), 2);

        let first = parse_one("select a from t; delete from t").unwrap();
        assert_eq!(first.nodes.len(), 4);
    }

    #[test]
    fn test_parse_unbalanced_parenthesis() {
        assert_eq!(
            parse_one("select (1 from t"),
            Err(ParseError::UnbalancedParenthesis(1))
        );
        assert!(matches!(
            parse_one("select 1) from t"),
            Err(ParseError::UnbalancedParenthesis(_))
        ));
    }

    #[test]
    fn test_where_groups_comparisons() {
        let statement =
            parse_one("select * from users u where u.age > 25 and name like 'a%' order by id")
                .unwrap();

        let where_node = statement
            .nodes
            .iter()
            .find_map(|n| match n {
                Node::Where(children) => Some(children),
                _ => None,
            })
            .unwrap();

        let comparisons: Vec<&Vec<Node>> = where_node
            .iter()
            .filter_map(|n| match n {
                Node::Comparison(parts) => Some(parts),
                _ => None,
            })
            .collect();
        assert_eq!(comparisons.len(), 2);
        // u . age > 25
        assert_eq!(comparisons[0].len(), 5);

        // ORDER BY is outside the WHERE clause
        assert!(statement
            .nodes
            .iter()
            .any(|n| matches!(n, Node::Token(t) if t.is_keyword("ORDER"))));
    }

    #[test]
    fn test_where_inside_subquery_stops_at_parenthesis() {
        let statement =
            parse_one("select * from (select id from t where id = 1) s where s.id > 0").unwrap();
        let top_level_wheres = statement
            .nodes
            .iter()
            .filter(|n| matches!(n, Node::Where(_)))
            .count();
        assert_eq!(top_level_wheres, 1);
        assert!(statement.nodes.iter().any(|n| matches!(n, Node::Group(_))));
    }
}
