//! Built-in SQL style linter
//!
//! Rules are token and line based; nothing here needs a full parse.

use super::Linter;
use crate::error::{Result, ScoreError};
use crate::query::{tokenize, Token, TokenKind};
use crate::scorer::{RuleCategory, Violation};

const JOIN_QUALIFIERS: &[&str] = &["INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "OUTER"];

pub struct RuleLinter {
    max_line_length: usize,
}

impl RuleLinter {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }

    fn check_lines(&self, sql: &str, out: &mut Vec<Violation>) {
        for (idx, line) in sql.lines().enumerate() {
            let line_no = idx + 1;

            let length = line.chars().count();
            if length > self.max_line_length {
                out.push(violation(
                    RuleCategory::LayoutLongLines,
                    line_no,
                    format!("line is {} characters, limit is {}", length, self.max_line_length),
                ));
            }

            if line.ends_with(' ') || line.ends_with('\t') {
                out.push(violation(
                    RuleCategory::LayoutSpacing,
                    line_no,
                    "trailing whitespace".to_string(),
                ));
            }

            let content = line.trim_start();
            if content.is_empty() {
                continue;
            }
            let indent = &line[..line.len() - content.len()];
            if indent.contains('\t') {
                out.push(violation(
                    RuleCategory::LayoutIndent,
                    line_no,
                    "indentation uses tabs".to_string(),
                ));
            } else if indent.len() % 2 != 0 {
                out.push(violation(
                    RuleCategory::LayoutIndent,
                    line_no,
                    format!("indentation of {} spaces is not a multiple of two", indent.len()),
                ));
            }
        }
    }
}

impl Default for RuleLinter {
    fn default() -> Self {
        Self::new(80)
    }
}

impl Linter for RuleLinter {
    fn lint(&self, sql: &str) -> Result<Vec<Violation>> {
        let tokens: Vec<Token> = tokenize(sql)
            .map_err(|e| ScoreError::Lint(e.to_string()))?
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();

        let mut violations = vec![];
        self.check_lines(sql, &mut violations);
        check_comma_spacing(&tokens, &mut violations);
        check_keyword_case(&tokens, &mut violations);
        check_table_aliases(&tokens, &mut violations);
        check_joins(&tokens, &mut violations);
        check_subqueries(&tokens, &mut violations);

        violations.sort_by_key(|v| v.line);
        Ok(violations)
    }
}

fn violation(category: RuleCategory, line: usize, description: String) -> Violation {
    Violation {
        category,
        line,
        description,
    }
}

fn check_comma_spacing(tokens: &[Token], out: &mut Vec<Violation>) {
    for comma in tokens.iter().filter(|t| t.is_punct(",") && t.space_before) {
        out.push(violation(
            RuleCategory::LayoutSpacing,
            comma.line,
            "whitespace before comma".to_string(),
        ));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
    Mixed,
}

fn case_of(word: &str) -> Case {
    if word == word.to_uppercase() {
        Case::Upper
    } else if word == word.to_lowercase() {
        Case::Lower
    } else {
        Case::Mixed
    }
}

fn check_keyword_case(tokens: &[Token], out: &mut Vec<Violation>) {
    let mut keywords = tokens.iter().filter(|t| t.kind == TokenKind::Keyword);
    let Some(first) = keywords.next() else { return };
    let expected = case_of(&first.text);

    for keyword in keywords {
        if case_of(&keyword.text) != expected {
            out.push(violation(
                RuleCategory::CapitalisationKeywords,
                keyword.line,
                format!("keyword '{}' does not match the case of '{}'", keyword.text, first.text),
            ));
        }
    }
}

/// `FROM users u` and `JOIN orders o` alias without `AS`
fn check_table_aliases(tokens: &[Token], out: &mut Vec<Violation>) {
    let is_name = |t: Option<&Token>| t.is_some_and(|t| t.kind == TokenKind::Name);

    for (i, token) in tokens.iter().enumerate() {
        let in_from = token.is_keyword("FROM");
        if !in_from && !token.is_keyword("JOIN") {
            continue;
        }

        let mut j = i + 1;
        while is_name(tokens.get(j)) {
            let table = &tokens[j];
            j += 1;
            while tokens.get(j).is_some_and(|t| t.is_punct(".")) && is_name(tokens.get(j + 1)) {
                j += 2;
            }

            if is_name(tokens.get(j)) {
                let alias = &tokens[j];
                out.push(violation(
                    RuleCategory::AliasingTable,
                    alias.line,
                    format!("implicit alias '{}' for table '{}', use AS", alias.text, table.text),
                ));
                j += 1;
            } else if tokens.get(j).is_some_and(|t| t.is_keyword("AS")) {
                j += 2;
            }

            // comma-separated FROM list
            if in_from && tokens.get(j).is_some_and(|t| t.is_punct(",")) {
                j += 1;
            } else {
                break;
            }
        }
    }
}

/// Bare `JOIN` without a join type
fn check_joins(tokens: &[Token], out: &mut Vec<Violation>) {
    for (i, token) in tokens.iter().enumerate() {
        if !token.is_keyword("JOIN") {
            continue;
        }
        let qualified = i > 0 && JOIN_QUALIFIERS.iter().any(|q| tokens[i - 1].is_keyword(q));
        if !qualified {
            out.push(violation(
                RuleCategory::AmbiguousJoin,
                token.line,
                "join type is implicit, use INNER JOIN".to_string(),
            ));
        }
    }
}

/// `FROM (SELECT ...)` and `JOIN (SELECT ...)`
fn check_subqueries(tokens: &[Token], out: &mut Vec<Violation>) {
    for window in tokens.windows(3) {
        let [clause, open, first] = window else { continue };
        if (clause.is_keyword("FROM") || clause.is_keyword("JOIN"))
            && open.is_punct("(")
            && (first.is_keyword("SELECT") || first.is_keyword("WITH"))
        {
            out.push(violation(
                RuleCategory::UnnecessarySubquery,
                open.line,
                "subquery in FROM/JOIN clause, consider a CTE or a join".to_string(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::ViolationSummary;

    fn summary(sql: &str) -> ViolationSummary {
        let violations = RuleLinter::default().lint(sql).unwrap();
        ViolationSummary::from_violations(&violations)
    }

    #[test]
    fn test_clean_query_has_no_violations() {
        assert!(summary("SELECT *\nFROM users\nWHERE age > 25").is_empty());
    }

    #[test]
    fn test_aliases_and_bare_join() {
        let s = summary("SELECT u.name\nFROM users u\nJOIN orders o ON o.user_id = u.id");
        assert_eq!(s.get(&RuleCategory::AliasingTable), 2);
        assert_eq!(s.get(&RuleCategory::AmbiguousJoin), 1);
    }

    #[test]
    fn test_explicit_alias_and_join_type_pass() {
        let s = summary("SELECT u.name\nFROM users AS u\nINNER JOIN orders AS o ON o.user_id = u.id");
        assert!(s.is_empty(), "unexpected: {:?}", s);
    }

    #[test]
    fn test_comma_separated_from_list() {
        let s = summary("SELECT *\nFROM users u, orders AS o, products p");
        assert_eq!(s.get(&RuleCategory::AliasingTable), 2);
    }

    #[test]
    fn test_subquery_in_from() {
        let s = summary("SELECT name\nFROM (SELECT name\n  FROM users) AS sub");
        assert_eq!(s.get(&RuleCategory::UnnecessarySubquery), 1);
    }

    #[test]
    fn test_layout_rules() {
        let long = format!("SELECT {}\nFROM t", "a".repeat(90));
        assert_eq!(summary(&long).get(&RuleCategory::LayoutLongLines), 1);

        let s = summary("SELECT a , b \nFROM t\n   WHERE a = 1\n\tAND b = 2");
        assert_eq!(s.get(&RuleCategory::LayoutSpacing), 2);
        assert_eq!(s.get(&RuleCategory::LayoutIndent), 2);
    }

    #[test]
    fn test_keyword_case() {
        let s = summary("SELECT *\nfrom users\nWHERE age > 1");
        assert_eq!(s.get(&RuleCategory::CapitalisationKeywords), 1);
    }

    #[test]
    fn test_violation_lines() {
        let violations = RuleLinter::default()
            .lint("SELECT *\nFROM users\nJOIN orders ON orders.user_id = users.id")
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 3);
        assert_eq!(violations[0].category, RuleCategory::AmbiguousJoin);
    }

    #[test]
    fn test_untokenizable_input_is_lint_error() {
        assert!(matches!(
            RuleLinter::default().lint("SELECT 'open"),
            Err(ScoreError::Lint(_))
        ));
    }
}
