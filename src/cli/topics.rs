use anyhow::Result;

use lore::config::LoreConfig;
use lore::knowledge::stats;

pub fn topics(config: &LoreConfig, source: Option<&str>) -> Result<()> {
    let conn = super::open_store(config)?;
    let topics = stats::list_topics(&conn, source, &config.retention)?;

    if topics.is_empty() {
        println!("No topics yet.");
        return Ok(());
    }

    println!(
        "{:<32} {:>5} {:>9}  {:<28} {}",
        "Topic", "Count", "Retention", "Last updated", "Sources"
    );
    println!("{}", "-".repeat(100));
    for t in &topics {
        println!(
            "{:<32} {:>5} {:>9.3}  {:<28} {}",
            t.topic,
            t.count,
            t.avg_retention,
            t.last_updated,
            t.sources.join(", ")
        );
    }
    Ok(())
}
