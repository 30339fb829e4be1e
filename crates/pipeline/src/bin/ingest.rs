use anyhow::{Context, Result, bail};
use ledger::LedgerStore;
use pipeline::{config::Config, ingest::run_ingest, logging, today};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let config = Config::load();
    let source = Arc::new(config.sourcify_client());
    let store = LedgerStore::new(&config.ledger_dir);

    info!("fetching sourcify stats from {}", config.stats_url);
    let report = run_ingest(source, &store, &today(), config.concurrency)
        .await
        .context("ingestion failed")?;
    report.log_summary();
    if report.is_total_failure() {
        bail!("no chain ledger could be appended");
    }
    info!("done");
    Ok(())
}
