//! Composite query scoring
//!
//! Score = performance (0-50) + optimization (0-30) + readability (0-20),
//! rounded to two decimals.
//!
//! - Performance compares execution time and CPU usage against dynamic
//!   thresholds, 25 points each.
//! - Optimization decays exponentially with optimization-category lint
//!   violations, plus a bonus of up to 10 points from the query plan.
//! - Readability decays exponentially with layout/indent violations.

mod pipeline;
mod plan;
mod rules;

pub use pipeline::{Comparison, ScoreReport, Scorer, Winner};
pub use plan::PlanInsights;
pub use rules::{RuleCategory, Violation, ViolationSummary};

use serde::Serialize;

use crate::threshold::Thresholds;

pub const PERFORMANCE_TERM_MAX: f64 = 25.0;
pub const OPTIMIZATION_MAX: f64 = 30.0;
pub const READABILITY_MAX: f64 = 20.0;

/// Penalty points per optimization violation
const OPTIMIZATION_PENALTY: f64 = 5.0;
/// Number of optimization categories
const OPTIMIZATION_CATEGORIES: f64 = 3.0;
/// Penalty points per readability violation
const READABILITY_PENALTY: f64 = 2.0;
const DECAY_RATE: f64 = 2.0;

const PLAN_BONUS_MAX: f64 = 10.0;
const FULL_SCAN_PENALTY: f64 = 5.0;
const SUBQUERY_PENALTY: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub performance: f64,
    pub optimization: f64,
    pub readability: f64,
}

impl ScoreBreakdown {
    pub fn compute(
        execution_time: f64,
        cpu_usage: f64,
        thresholds: &Thresholds,
        violations: &ViolationSummary,
        plan: &PlanInsights,
    ) -> Self {
        Self {
            performance: performance_score(execution_time, cpu_usage, thresholds),
            optimization: optimization_score(violations, plan),
            readability: readability_score(violations),
        }
    }

    pub fn total(&self) -> f64 {
        round2(self.performance + self.optimization + self.readability)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `base * e^(-2 * min(penalty / max_penalty, 1))`; no penalty scores `base`
pub fn decay_score(base: f64, penalty: f64, max_penalty: f64) -> f64 {
    let ratio = if max_penalty > 0.0 {
        (penalty / max_penalty).clamp(0.0, 1.0)
    } else {
        0.0
    };
    base * (-DECAY_RATE * ratio).exp()
}

fn performance_term(value: f64, threshold: f64) -> f64 {
    (PERFORMANCE_TERM_MAX * (1.0 - value / threshold)).clamp(0.0, PERFORMANCE_TERM_MAX)
}

/// 0-50; each term is capped at 25 so negative CPU deltas cannot overshoot
pub fn performance_score(execution_time: f64, cpu_usage: f64, thresholds: &Thresholds) -> f64 {
    performance_term(execution_time, thresholds.execution_time)
        + performance_term(cpu_usage, thresholds.cpu_usage)
}

/// 0-10 from the plan: 10, minus 5 per full scan and 3 per subquery
pub fn plan_bonus(plan: &PlanInsights) -> f64 {
    let penalty =
        FULL_SCAN_PENALTY * plan.full_scans as f64 + SUBQUERY_PENALTY * plan.subqueries as f64;
    (PLAN_BONUS_MAX - penalty).clamp(0.0, PLAN_BONUS_MAX)
}

/// 0-30
pub fn optimization_score(violations: &ViolationSummary, plan: &PlanInsights) -> f64 {
    let count: usize = violations
        .iter()
        .filter(|(category, _)| category.is_optimization())
        .map(|(_, count)| count)
        .sum();
    let penalty = OPTIMIZATION_PENALTY * count as f64;
    let max_penalty = OPTIMIZATION_PENALTY * OPTIMIZATION_CATEGORIES;

    let normalized = decay_score(OPTIMIZATION_MAX, penalty, max_penalty);
    (normalized + plan_bonus(plan)).min(OPTIMIZATION_MAX)
}

/// 0-20; the maximum penalty scales with the distinct categories observed
pub fn readability_score(violations: &ViolationSummary) -> f64 {
    let (categories, count) = violations
        .iter()
        .filter(|(category, _)| category.is_readability())
        .fold((0usize, 0usize), |(categories, total), (_, count)| {
            (categories + 1, total + count)
        });
    let penalty = READABILITY_PENALTY * count as f64;
    let max_penalty = READABILITY_PENALTY * categories as f64;

    decay_score(READABILITY_MAX, penalty, max_penalty)
}
