//! Subcommand implementations

pub mod compare;
pub mod history;
pub mod score;
pub mod seed;
pub mod similarity;
pub mod thresholds;

use anyhow::{Context, Result};
use std::path::Path;

use crate::scorer::ScoreReport;

/// Read a query file, trimming surrounding whitespace
pub fn read_query(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read query file: {}", path.display()))?;
    Ok(content.trim().to_string())
}

fn print_report(title: &str, report: &ScoreReport) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));

    if let Some(error) = &report.error {
        println!("Score: {:.2}", report.score);
        println!("Error: {}", error);
        return;
    }

    println!("Score: {:.2}", report.score);
    if let Some(breakdown) = &report.breakdown {
        println!("  Performance:  {:>6.2} / 50", breakdown.performance);
        println!("  Optimization: {:>6.2} / 30", breakdown.optimization);
        println!("  Readability:  {:>6.2} / 20", breakdown.readability);
    }

    if let Some(execution) = &report.execution {
        println!(
            "Execution: {:.4}s | CPU {:.2}% | {} rows",
            execution.execution_time, execution.cpu_usage, execution.rows_affected
        );
    }
    if let Some(thresholds) = &report.thresholds {
        println!(
            "Thresholds: {:.4}s | CPU {:.2}% ({:?})",
            thresholds.execution_time, thresholds.cpu_usage, thresholds.source
        );
    }

    if report.violation_summary.is_empty() {
        println!("Violations: none");
    } else {
        println!("Violations:");
        for (category, count) in report.violation_summary.iter() {
            println!("  {:<28} {}", category, count);
        }
    }

    if let Some(plan) = &report.plan {
        for note in &plan.notes {
            println!("  plan: {}", note);
        }
    }
}
