use anyhow::Result;

use lore::config::LoreConfig;
use lore::knowledge::duplicates;
use lore::validate;

pub fn duplicates(config: &LoreConfig, threshold: Option<f64>) -> Result<()> {
    let threshold = validate::duplicate_threshold(
        threshold.unwrap_or(config.retrieval.default_duplicate_threshold),
    )?;
    let conn = super::open_store(config)?;
    let pairs = duplicates::find_duplicates(&conn, threshold)?;

    if pairs.is_empty() {
        println!("No pairs above {threshold:.2}.");
        return Ok(());
    }

    println!("{} pair(s) above {threshold:.2}:\n", pairs.len());
    for p in &pairs {
        println!(
            "  {:.3}  #{} {}  <->  #{} {}",
            p.similarity, p.id_a, p.topic_a, p.id_b, p.topic_b
        );
    }
    println!();
    println!("Merge a pair with the merge_knowledge tool (keep_id, delete_id).");
    Ok(())
}
