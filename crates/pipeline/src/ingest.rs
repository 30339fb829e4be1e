use crate::fanout::{ChainFailure, for_each_chain};
use anyhow::{Result, anyhow};
use common::sourcify::{SnapshotSource, StatsSnapshot};
use ledger::{ChainSnapshotRow, LedgerStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct IngestReport {
    pub date: String,
    pub appended: Vec<String>,
    pub failed: Vec<ChainFailure>,
}

impl IngestReport {
    /// every chain failed, nothing was recorded
    pub fn is_total_failure(&self) -> bool {
        self.appended.is_empty() && !self.failed.is_empty()
    }

    pub fn log_summary(&self) {
        info!(
            "ingest {}: {} chains appended, {} failed",
            self.date,
            self.appended.len(),
            self.failed.len()
        );
    }
}

/// fetches the snapshot on the blocking pool; any failure here is fatal
pub async fn fetch_snapshot<S>(source: Arc<S>) -> Result<StatsSnapshot>
where
    S: SnapshotSource + Send + Sync + 'static,
{
    let snapshot = tokio::task::spawn_blocking(move || source.fetch_snapshot())
        .await
        .map_err(|err| anyhow!("snapshot fetch task aborted: {err}"))??;
    Ok(snapshot)
}

/// appends one `date` row per chain in `snapshot`; a chain whose append
/// fails is reported and does not stop the others
pub async fn ingest_snapshot(
    store: &LedgerStore,
    snapshot: &StatsSnapshot,
    date: &str,
    concurrency: usize,
) -> IngestReport {
    let units = snapshot
        .iter()
        .map(|(chain_id, counts)| {
            let row = ChainSnapshotRow::new(chain_id, counts.full_match, counts.partial_match, date);
            (chain_id.clone(), row)
        })
        .collect();
    let store = store.clone();
    let outcomes = for_each_chain(units, concurrency, move |chain_id, snap: ChainSnapshotRow| {
        store.append(chain_id, &snap.row)?;
        Ok(snap.row.total)
    })
    .await;

    let mut report = IngestReport {
        date: date.to_string(),
        ..IngestReport::default()
    };
    for outcome in outcomes {
        match outcome.result {
            Ok(total) => {
                debug!("chain {}: appended total {total}", outcome.chain_id);
                report.appended.push(outcome.chain_id);
            }
            Err(reason) => {
                warn!("chain {}: append failed: {reason}", outcome.chain_id);
                report.failed.push(ChainFailure {
                    chain_id: outcome.chain_id,
                    reason,
                });
            }
        }
    }
    report
}

pub async fn run_ingest<S>(
    source: Arc<S>,
    store: &LedgerStore,
    date: &str,
    concurrency: usize,
) -> Result<IngestReport>
where
    S: SnapshotSource + Send + Sync + 'static,
{
    let snapshot = fetch_snapshot(source).await?;
    info!("fetched snapshot with {} chains", snapshot.len());
    Ok(ingest_snapshot(store, &snapshot, date, concurrency).await)
}
