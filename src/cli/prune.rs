//! CLI `prune` command: report or delete entries whose retention has decayed.

use anyhow::Result;

use lore::config::LoreConfig;
use lore::knowledge::prune::{self, PruneCandidate};

/// Run the prune sweep. Only deletes when `apply` is set.
pub fn prune(config: &LoreConfig, apply: bool) -> Result<()> {
    let mut conn = super::open_store(config)?;
    let result = prune::prune(&mut conn, &config.retention, &config.maintenance, !apply)?;

    if result.deleted.is_empty() && result.flagged.is_empty() {
        println!("Nothing to prune.");
        return Ok(());
    }

    if !result.deleted.is_empty() {
        if result.dry_run {
            println!(
                "{} entr(ies) would be deleted (dry run, pass --apply to delete):\n",
                result.deleted.len()
            );
        } else {
            println!("Deleted {} entr(ies):\n", result.deleted.len());
        }
        print_table(&result.deleted);
    }

    if !result.flagged.is_empty() {
        println!();
        println!("{} entr(ies) flagged for review:\n", result.flagged.len());
        print_table(&result.flagged);
    }

    Ok(())
}

fn print_table(candidates: &[PruneCandidate]) {
    println!(
        "{:<8} {:<14} {:<16} {:<7} {}",
        "ID", "Type", "Source", "Score", "Preview"
    );
    println!("{}", "-".repeat(90));
    for c in candidates {
        println!(
            "{:<8} {:<14} {:<16} {:<7.3} {}",
            c.id, c.memory_type, c.source, c.score, c.content_preview
        );
    }
}
