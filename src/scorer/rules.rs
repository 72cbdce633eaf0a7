//! Lint rule categories and per-category violation counts

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Category of a lint rule, named like `layout.long_lines`
///
/// Known categories get their own variant; unknown names keep their
/// family (`layout.*`, `indent.*`) so scoring membership stays a match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleCategory {
    AliasingTable,
    AmbiguousJoin,
    UnnecessarySubquery,
    LayoutLongLines,
    LayoutSpacing,
    LayoutIndent,
    CapitalisationKeywords,
    /// Other `layout.<name>` rules
    Layout(String),
    /// `indent.<name>` rules
    Indent(String),
    Other(String),
}

impl RuleCategory {
    pub fn parse(name: &str) -> Self {
        match name {
            "aliasing.table" => Self::AliasingTable,
            "ambiguous.join" => Self::AmbiguousJoin,
            "unnecessary.subquery" => Self::UnnecessarySubquery,
            "layout.long_lines" => Self::LayoutLongLines,
            "layout.spacing" => Self::LayoutSpacing,
            "layout.indent" => Self::LayoutIndent,
            "capitalisation.keywords" => Self::CapitalisationKeywords,
            _ => {
                if let Some(rest) = name.strip_prefix("layout.") {
                    Self::Layout(rest.to_string())
                } else if let Some(rest) = name.strip_prefix("indent.") {
                    Self::Indent(rest.to_string())
                } else {
                    Self::Other(name.to_string())
                }
            }
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::AliasingTable => "aliasing.table".to_string(),
            Self::AmbiguousJoin => "ambiguous.join".to_string(),
            Self::UnnecessarySubquery => "unnecessary.subquery".to_string(),
            Self::LayoutLongLines => "layout.long_lines".to_string(),
            Self::LayoutSpacing => "layout.spacing".to_string(),
            Self::LayoutIndent => "layout.indent".to_string(),
            Self::CapitalisationKeywords => "capitalisation.keywords".to_string(),
            Self::Layout(rest) => format!("layout.{}", rest),
            Self::Indent(rest) => format!("indent.{}", rest),
            Self::Other(name) => name.clone(),
        }
    }

    /// Counts against the optimization sub-score
    pub fn is_optimization(&self) -> bool {
        matches!(
            self,
            Self::AliasingTable | Self::AmbiguousJoin | Self::UnnecessarySubquery
        )
    }

    /// Counts against the readability sub-score
    pub fn is_readability(&self) -> bool {
        matches!(
            self,
            Self::LayoutLongLines
                | Self::LayoutSpacing
                | Self::LayoutIndent
                | Self::Layout(_)
                | Self::Indent(_)
        )
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.name())
    }
}

impl Serialize for RuleCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// A single lint finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub category: RuleCategory,
    /// 1-based line in the linted text
    pub line: usize,
    pub description: String,
}

/// Number of violations per rule category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ViolationSummary(BTreeMap<RuleCategory, usize>);

impl ViolationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_violations<'a>(violations: impl IntoIterator<Item = &'a Violation>) -> Self {
        let mut summary = Self::new();
        for violation in violations {
            summary.add(violation.category.clone(), 1);
        }
        summary
    }

    pub fn add(&mut self, category: RuleCategory, count: usize) {
        if count > 0 {
            *self.0.entry(category).or_insert(0) += count;
        }
    }

    pub fn get(&self, category: &RuleCategory) -> usize {
        self.0.get(category).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RuleCategory, usize)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

impl FromIterator<(RuleCategory, usize)> for ViolationSummary {
    fn from_iter<I: IntoIterator<Item = (RuleCategory, usize)>>(iter: I) -> Self {
        let mut summary = Self::new();
        for (category, count) in iter {
            summary.add(category, count);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for name in [
            "aliasing.table",
            "ambiguous.join",
            "unnecessary.subquery",
            "layout.long_lines",
            "layout.spacing",
            "layout.indent",
            "capitalisation.keywords",
            "layout.commas",
            "indent.tabs",
            "structure.else_null",
        ] {
            assert_eq!(RuleCategory::parse(name).name(), name);
        }
    }

    #[test]
    fn test_category_membership() {
        assert!(RuleCategory::AliasingTable.is_optimization());
        assert!(!RuleCategory::AliasingTable.is_readability());
        assert!(RuleCategory::parse("layout.commas").is_readability());
        assert!(RuleCategory::parse("indent.tabs").is_readability());
        assert!(!RuleCategory::CapitalisationKeywords.is_readability());
        assert!(!RuleCategory::CapitalisationKeywords.is_optimization());
    }

    #[test]
    fn test_summary_tallies() {
        let violations = vec![
            Violation {
                category: RuleCategory::AliasingTable,
                line: 2,
                description: "implicit alias".to_string(),
            },
            Violation {
                category: RuleCategory::AliasingTable,
                line: 3,
                description: "implicit alias".to_string(),
            },
            Violation {
                category: RuleCategory::LayoutSpacing,
                line: 1,
                description: "trailing whitespace".to_string(),
            },
        ];
        let summary = ViolationSummary::from_violations(&violations);
        assert_eq!(summary.get(&RuleCategory::AliasingTable), 2);
        assert_eq!(summary.get(&RuleCategory::LayoutSpacing), 1);
        assert_eq!(summary.get(&RuleCategory::AmbiguousJoin), 0);
        assert_eq!(summary.total(), 3);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["aliasing.table"], 2);
    }
}
