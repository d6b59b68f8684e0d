use anyhow::Result;

use lore::config::LoreConfig;
use lore::knowledge::stats;
use lore::knowledge::types::MemoryType;

/// Display the store health report in the terminal.
pub fn health(config: &LoreConfig) -> Result<()> {
    let conn = super::open_store(config)?;
    let report = stats::health_report(&conn, &config.retention, &config.maintenance);

    println!("Knowledge Health");
    println!("{}", "=".repeat(40));
    println!("  Total entries:       {}", report.total);
    println!("  Never accessed:      {}", report.never_accessed);
    println!();

    println!("By Type:");
    for t in MemoryType::ALL {
        let count = report.by_type.get(t.as_str()).copied().unwrap_or(0);
        println!("  {:<14} {}", t.as_str(), count);
    }
    println!();

    println!("By Source:");
    for (source, count) in &report.by_source {
        println!("  {:<14} {}", source, count);
    }
    println!();

    let d = &report.score_distribution;
    println!("Retention:");
    println!("  healthy (>=0.7)      {}", d.healthy);
    println!("  aging   (>=0.3)      {}", d.aging);
    println!("  stale   (>=0.1)      {}", d.stale);
    println!("  decay   (<0.1)       {}", d.decay);

    if !report.top_accessed.is_empty() {
        println!();
        println!("Most accessed:");
        for a in &report.top_accessed {
            println!("  #{:<6} {:>5}x  {} ({})", a.id, a.access_count, a.topic, a.source);
        }
    }

    if !report.stale_candidates.is_empty() {
        println!();
        println!("Stale candidates:");
        for c in &report.stale_candidates {
            println!("  #{:<6} {:.3}  {} ({})", c.id, c.score, c.topic, c.source);
        }
    }

    if !report.errors.is_empty() {
        println!();
        println!("Incomplete report, failed sections:");
        for e in &report.errors {
            println!("  {e}");
        }
    }

    Ok(())
}
