//! Seed command implementation

use anyhow::Result;

use crate::config::Config;
use crate::engine::seed_demo_database;

pub fn run(config: &Config) -> Result<()> {
    let path = config.target_path();
    seed_demo_database(&path)?;
    println!("Demo database ready at {}", path.display());
    Ok(())
}
