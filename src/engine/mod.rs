//! Collaborators the scorer depends on
//!
//! The scorer never touches a database, linter or formatter directly. It
//! goes through these traits, so any of them can be swapped:
//! - QueryExecutor: runs a query and measures its cost
//! - PlanInspector: returns the query plan
//! - Linter: reports style violations in formatted SQL
//! - Formatter: reindents SQL for linting and display

mod format;
mod lint;
mod sqlite;

pub use format::SqlFormatter;
pub use lint::RuleLinter;
pub use sqlite::{seed_demo_database, SqliteEngine};

use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::scorer::Violation;

/// Cost of one query execution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExecutionMetrics {
    /// Wall-clock seconds
    pub execution_time: f64,
    /// Process CPU percent over the execution window
    pub cpu_usage: f64,
    pub rows_affected: u64,
}

/// One row of an execution plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRow {
    pub detail: String,
}

impl PlanRow {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

pub trait QueryExecutor {
    /// Execute `sql`, failing with `ScoreError::Execution` if the engine rejects it
    fn execute(&self, sql: &str) -> Result<ExecutionMetrics>;
}

pub trait PlanInspector {
    /// Plan rows for `sql`; empty when no plan is available
    fn explain(&self, sql: &str) -> Vec<PlanRow>;
}

pub trait Linter {
    fn lint(&self, sql: &str) -> Result<Vec<Violation>>;
}

pub trait Formatter {
    fn format(&self, sql: &str) -> Result<String>;
}

/// The set of collaborators used for one scoring session
pub struct Collaborators {
    pub executor: Box<dyn QueryExecutor>,
    pub planner: Box<dyn PlanInspector>,
    pub linter: Box<dyn Linter>,
    pub formatter: Box<dyn Formatter>,
}

impl Collaborators {
    /// Default collaborators: SQLite target database, built-in linter and formatter
    pub fn new(config: &Config) -> Self {
        let target = config.target_path();
        Self {
            executor: Box::new(SqliteEngine::new(target.clone())),
            planner: Box::new(SqliteEngine::new(target)),
            linter: Box::new(RuleLinter::new(config.lint.max_line_length)),
            formatter: Box::new(SqlFormatter),
        }
    }
}
