use anyhow::{Context, Result};
use ledger::LedgerStore;
use pipeline::{config::Config, export::run_export, logging, today};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let config = Config::load();
    let directory = Arc::new(config.sourcify_client());
    let store = LedgerStore::new(&config.ledger_dir);

    let report = run_export(
        directory,
        &store,
        &config.export_file,
        &today(),
        config.concurrency,
    )
    .await
    .context("export failed")?;
    report.log_summary();
    Ok(())
}
