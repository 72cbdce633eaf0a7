//! Similarity command implementation

use anyhow::Result;
use std::path::Path;

use super::read_query;
use crate::query::{
    normalize_query, normalized_similarity, string_similarity, structure_similarity, GroupKey,
};

pub fn run(first_file: &Path, second_file: &Path, threshold: f64) -> Result<()> {
    let first = normalize_query(&read_query(first_file)?)?;
    let second = normalize_query(&read_query(second_file)?)?;

    let text = string_similarity(&first.canonical_text, &second.canonical_text);
    let structure = structure_similarity(&first.structure_tokens, &second.structure_tokens);
    let combined = normalized_similarity(&first, &second);

    println!("Text similarity:      {:.4}", text);
    println!("Structure similarity: {:.4}", structure);
    println!(
        "Combined:             {:.4} ({} threshold {:.2})",
        combined,
        if combined >= threshold { "meets" } else { "below" },
        threshold
    );

    let first_key = GroupKey::from_normalized(&first);
    let second_key = GroupKey::from_normalized(&second);
    println!("\nGroup 1: {}", first_key.digest());
    println!("Group 2: {}", second_key.digest());
    if first_key == second_key {
        println!("Same group");
    }
    Ok(())
}
