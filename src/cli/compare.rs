//! Compare command implementation

use anyhow::Result;
use std::path::Path;

use super::{print_report, read_query};
use crate::config::Config;
use crate::engine::Collaborators;
use crate::scorer::{Scorer, Winner};
use crate::store::MetricsStore;

pub fn run(
    store: &MetricsStore,
    config: &Config,
    first_file: &Path,
    second_file: &Path,
    json: bool,
) -> Result<()> {
    let first = read_query(first_file)?;
    let second = read_query(second_file)?;

    let collaborators = Collaborators::new(config);
    let scorer = Scorer::new(store, &collaborators, &config.scoring);
    let comparison = scorer.compare(&first, &second)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(());
    }

    print_report(&format!("Query 1: {}", first_file.display()), &comparison.first);
    print_report(&format!("Query 2: {}", second_file.display()), &comparison.second);

    let label = match comparison.winner {
        Winner::First => "Query 1",
        Winner::Second => "Query 2",
    };
    println!(
        "\n{} performed better with score: {:.2}",
        label,
        comparison.better().score
    );

    println!("\nOptimized version of the better query:");
    println!("{}", comparison.optimized_query);
    Ok(())
}
