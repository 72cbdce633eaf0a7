//! History command implementation

use anyhow::Result;
use std::path::Path;

use super::read_query;
use crate::query::get_query_group;
use crate::store::MetricsStore;

pub fn run(store: &MetricsStore, query_file: Option<&Path>, limit: usize) -> Result<()> {
    let group = match query_file {
        Some(path) => Some(get_query_group(&read_query(path)?)?),
        None => None,
    };

    let samples = store.recent(group.as_ref(), limit)?;
    if samples.is_empty() {
        println!("No samples found. Run 'sqlscore score' first.");
        return Ok(());
    }

    println!(
        "{:<20} {:<18} {:>10} {:>8} {}",
        "Timestamp", "Group", "Time (s)", "CPU %", "Query"
    );
    println!("{}", "-".repeat(100));

    for sample in samples {
        let query = sample.query_text.split_whitespace().collect::<Vec<_>>().join(" ");
        let query = if query.chars().count() > 40 {
            format!("{}...", query.chars().take(37).collect::<String>())
        } else {
            query
        };

        println!(
            "{:<20} {:<18} {:>10.4} {:>8.2} {}",
            sample.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            sample.group_key.digest(),
            sample.execution_time,
            sample.cpu_usage,
            query,
        );
    }

    Ok(())
}
