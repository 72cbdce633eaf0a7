//! Score command implementation

use anyhow::Result;
use std::path::Path;

use super::{print_report, read_query};
use crate::config::Config;
use crate::engine::Collaborators;
use crate::scorer::Scorer;
use crate::store::MetricsStore;

pub fn run(store: &MetricsStore, config: &Config, query_file: &Path, json: bool) -> Result<()> {
    let query = read_query(query_file)?;
    let collaborators = Collaborators::new(config);
    let scorer = Scorer::new(store, &collaborators, &config.scoring);

    let report = scorer.score_query(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&format!("Query: {}", query_file.display()), &report);
    if let Some(formatted) = &report.formatted_query {
        println!("\nFormatted query:\n{}", formatted);
    }
    Ok(())
}
