//! Stored-item statistics.
//!
//! Quick summary of what the pipeline has kept: totals, qualified count,
//! average score, pass rate, and a per-source breakdown. Used by
//! `sieve stats`; the HTTP API serves the same [`Stats`] as JSON.

use anyhow::Result;

use crate::config::Config;
use crate::models::Stats;
use crate::store::ItemStore;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config, store: &dyn ItemStore) -> Result<()> {
    let stats = store.stats(config.pipeline.threshold).await?;
    print!("{}", render_stats(config, &stats));
    Ok(())
}

fn render_stats(config: &Config, stats: &Stats) -> String {
    let mut out = String::new();
    out.push_str("info-sieve — Stats\n");
    out.push_str("==================\n\n");
    out.push_str(&format!("  Database:    {}\n", config.db.path.display()));
    out.push_str(&format!("  Threshold:   {}\n\n", config.pipeline.threshold));
    out.push_str(&format!("  Items:       {}\n", stats.total));
    out.push_str(&format!("  Qualified:   {}\n", stats.qualified));
    out.push_str(&format!("  Avg score:   {:.1}\n", stats.avg_score));
    out.push_str(&format!("  Pass rate:   {:.1}%\n", stats.pass_rate));

    if !stats.sources.is_empty() {
        out.push_str("\n  By source:\n");
        out.push_str(&format!("  {:<24} {:>6}\n", "SOURCE", "ITEMS"));
        out.push_str(&format!("  {}\n", "-".repeat(31)));
        for s in &stats.sources {
            out.push_str(&format!("  {:<24} {:>6}\n", s.source, s.count));
        }
    }
    out.push('\n');
    out
}
