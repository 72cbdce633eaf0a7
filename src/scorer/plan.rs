//! Execution plan inspection

use serde::Serialize;

use crate::engine::PlanRow;

/// What a query plan says about table access
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanInsights {
    /// Full table scans that use no index
    pub full_scans: usize,
    pub subqueries: usize,
    pub index_uses: usize,
    /// Human-readable observations, one per classified row
    pub notes: Vec<String>,
}

fn uses_index(detail: &str) -> bool {
    detail.contains("USING INDEX")
        || detail.contains("USING COVERING INDEX")
        || detail.contains("USING INTEGER PRIMARY KEY")
        || detail.contains("USING PRIMARY KEY")
}

/// Scans that read no table: `SELECT 1`, table-valued constants
fn scans_no_table(detail: &str) -> bool {
    detail.contains("CONSTANT ROW")
}

impl PlanInsights {
    pub fn from_rows(rows: &[PlanRow]) -> Self {
        let mut insights = Self::default();

        for row in rows {
            let detail = row.detail.to_uppercase();

            if detail.contains("SCAN") && !uses_index(&detail) && !scans_no_table(&detail) {
                insights.full_scans += 1;
                insights
                    .notes
                    .push(format!("full table scan: {}", row.detail));
            } else if uses_index(&detail) {
                insights.index_uses += 1;
                insights.notes.push(format!("uses index: {}", row.detail));
            }

            if detail.contains("SUBQUERY") {
                insights.subqueries += 1;
                insights.notes.push(format!("subquery: {}", row.detail));
            }
        }

        insights
    }
}
