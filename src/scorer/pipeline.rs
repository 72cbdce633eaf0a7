//! End-to-end scoring of a query against its collaborators

use serde::Serialize;
use tracing::{info, warn};

use super::{PlanInsights, ScoreBreakdown, ViolationSummary};
use crate::config::ScoringConfig;
use crate::engine::{Collaborators, ExecutionMetrics};
use crate::error::{Result, ScoreError};
use crate::store::MetricsStore;
use crate::threshold::{ThresholdCalculator, Thresholds};

/// Outcome of scoring one query
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub query: String,
    pub score: f64,
    pub breakdown: Option<ScoreBreakdown>,
    pub execution: Option<ExecutionMetrics>,
    pub thresholds: Option<Thresholds>,
    pub violation_summary: ViolationSummary,
    pub formatted_query: Option<String>,
    pub plan: Option<PlanInsights>,
    pub error: Option<String>,
}

impl ScoreReport {
    /// Report for a query the engine could not execute
    pub fn failed(query: &str, error: &ScoreError) -> Self {
        Self {
            query: query.to_string(),
            score: 0.0,
            breakdown: None,
            execution: None,
            thresholds: None,
            violation_summary: ViolationSummary::new(),
            formatted_query: None,
            plan: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    First,
    Second,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub first: ScoreReport,
    pub second: ScoreReport,
    pub winner: Winner,
    /// Formatted version of the winning query
    pub optimized_query: String,
}

impl Comparison {
    pub fn better(&self) -> &ScoreReport {
        match self.winner {
            Winner::First => &self.first,
            Winner::Second => &self.second,
        }
    }
}

pub struct Scorer<'a> {
    store: &'a MetricsStore,
    collaborators: &'a Collaborators,
    config: &'a ScoringConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(
        store: &'a MetricsStore,
        collaborators: &'a Collaborators,
        config: &'a ScoringConfig,
    ) -> Self {
        Self {
            store,
            collaborators,
            config,
        }
    }

    /// Execute, lint and score `query`, then record its sample
    ///
    /// An execution failure yields a zero-score report; lint, format and
    /// persistence failures are returned as errors.
    pub fn score_query(&self, query: &str) -> Result<ScoreReport> {
        let metrics = match self.collaborators.executor.execute(query) {
            Ok(metrics) => metrics,
            Err(e @ ScoreError::Execution(_)) => {
                warn!(error = %e, "query could not be executed, scoring as zero");
                return Ok(ScoreReport::failed(query, &e));
            }
            Err(e) => return Err(e),
        };

        let formatted = self.collaborators.formatter.format(query)?;
        let violations = self.collaborators.linter.lint(&formatted)?;
        let violation_summary = ViolationSummary::from_violations(&violations);

        let plan = PlanInsights::from_rows(&self.collaborators.planner.explain(query));

        // thresholds first, so the query's own sample does not calibrate it
        let thresholds = ThresholdCalculator::new(self.store, self.config)
            .calculate_dynamic_thresholds(Some(query))?;

        let breakdown = ScoreBreakdown::compute(
            metrics.execution_time,
            metrics.cpu_usage,
            &thresholds,
            &violation_summary,
            &plan,
        );

        match self
            .store
            .store(metrics.execution_time, metrics.cpu_usage, query)
        {
            Ok(_) => {}
            Err(ScoreError::Parse(e)) => {
                warn!(error = %e, "query is not groupable, sample not recorded");
            }
            Err(e) => return Err(e),
        }

        let score = breakdown.total();
        info!(
            score,
            performance = breakdown.performance,
            optimization = breakdown.optimization,
            readability = breakdown.readability,
            "scored query"
        );

        Ok(ScoreReport {
            query: query.to_string(),
            score,
            breakdown: Some(breakdown),
            execution: Some(metrics),
            thresholds: Some(thresholds),
            violation_summary,
            formatted_query: Some(formatted),
            plan: Some(plan),
            error: None,
        })
    }

    /// Score both queries; ties go to the second
    pub fn compare(&self, first: &str, second: &str) -> Result<Comparison> {
        let first = self.score_query(first)?;
        let second = self.score_query(second)?;

        let winner = if first.score > second.score {
            Winner::First
        } else {
            Winner::Second
        };
        let optimized_query = match winner {
            Winner::First => self.optimized_query(&first.query),
            Winner::Second => self.optimized_query(&second.query),
        };

        Ok(Comparison {
            first,
            second,
            winner,
            optimized_query,
        })
    }

    /// Formatted query for display, or the query itself if formatting fails
    pub fn optimized_query(&self, query: &str) -> String {
        match self.collaborators.formatter.format(query) {
            Ok(formatted) => formatted,
            Err(e) => {
                warn!(error = %e, "could not format query, showing it unchanged");
                query.to_string()
            }
        }
    }
}
