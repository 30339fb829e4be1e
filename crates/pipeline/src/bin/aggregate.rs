use anyhow::{Context, Result};
use common::error::StatsError;
use ledger::LedgerStore;
use pipeline::{aggregate::total_for_date, config::Config, logging, today};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let config = Config::load();
    let target_date = std::env::args().nth(1).unwrap_or_else(today);
    let store = LedgerStore::new(&config.ledger_dir);

    let result = match total_for_date(&store, &target_date, config.concurrency).await {
        Ok(result) => result,
        Err(err) => {
            if let Some(StatsError::InvalidDate(_)) = err.downcast_ref::<StatsError>() {
                error!("please provide the date in YYYY-MM-DD format");
                error!("usage: aggregate [YYYY-MM-DD]");
            }
            return Err(err).context("failed to calculate totals");
        }
    };
    result.log_summary();
    let result = result
        .ensure_complete()
        .context("failed to calculate totals")?;
    info!(
        "final result: {} total verified contracts on {}",
        result.total, result.date
    );
    Ok(())
}
