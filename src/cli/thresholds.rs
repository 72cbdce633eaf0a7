//! Thresholds command implementation

use anyhow::Result;
use std::path::Path;

use super::read_query;
use crate::config::ScoringConfig;
use crate::store::MetricsStore;
use crate::threshold::ThresholdCalculator;

pub fn run(store: &MetricsStore, config: &ScoringConfig, query_file: Option<&Path>) -> Result<()> {
    let query = query_file.map(read_query).transpose()?;

    let thresholds = ThresholdCalculator::new(store, config)
        .calculate_dynamic_thresholds(query.as_deref())?;

    println!("Execution time: {:.4}s", thresholds.execution_time);
    println!("CPU usage:      {:.2}%", thresholds.cpu_usage);
    println!("Source:         {:?}", thresholds.source);
    Ok(())
}
