use crate::fanout::{ChainFailure, for_each_chain};
use anyhow::{Result, anyhow};
use common::error::StatsError;
use common::sourcify::{ChainDirectory, display_name, name_map};
use ledger::{ChainSeries, LedgerStore};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainCatalogEntry {
    pub name: String,
    #[serde(flatten)]
    pub series: ChainSeries,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub last_updated: String,
    pub chains: BTreeMap<String, ChainCatalogEntry>,
}

#[derive(Debug)]
pub struct ExportReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub chains: usize,
    pub skipped_empty: Vec<String>,
    pub failed: Vec<ChainFailure>,
}

impl ExportReport {
    pub fn log_summary(&self) {
        info!(
            "written {} ({} KB, {} chains, {} empty skipped, {} failed)",
            self.path.display(),
            (self.bytes + 512) / 1024,
            self.chains,
            self.skipped_empty.len(),
            self.failed.len()
        );
    }
}

/// chain id -> name, or an empty map when the directory can't be reached
pub async fn resolve_names<D>(directory: Arc<D>) -> HashMap<String, String>
where
    D: ChainDirectory + Send + Sync + 'static,
{
    match tokio::task::spawn_blocking(move || directory.fetch_chains()).await {
        Ok(Ok(chains)) => name_map(chains),
        Ok(Err(err)) => {
            warn!("could not fetch chain names, using fallbacks: {err}");
            HashMap::new()
        }
        Err(err) => {
            warn!("chain name task aborted, using fallbacks: {err}");
            HashMap::new()
        }
    }
}

/// reads every ledger into the catalog; empty ledgers are left out
pub async fn build_catalog(
    store: &LedgerStore,
    names: &HashMap<String, String>,
    date: &str,
    concurrency: usize,
) -> Result<(ExportDocument, Vec<String>, Vec<ChainFailure>)> {
    let chain_ids = store.list()?;
    info!("processing {} chain ledgers", chain_ids.len());
    let units = chain_ids.into_iter().map(|id| (id, ())).collect();
    let reader = store.clone();
    let outcomes = for_each_chain(units, concurrency, move |chain_id, ()| {
        reader.read_series(chain_id)
    })
    .await;

    let mut chains = BTreeMap::new();
    let mut skipped_empty = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(series) if series.is_empty() => {
                debug!("skipping empty ledger {}", outcome.chain_id);
                skipped_empty.push(outcome.chain_id);
            }
            Ok(series) => {
                let name = display_name(names, &outcome.chain_id);
                chains.insert(outcome.chain_id, ChainCatalogEntry { name, series });
            }
            Err(reason) => {
                warn!("error reading ledger {}: {reason}", outcome.chain_id);
                failed.push(ChainFailure {
                    chain_id: outcome.chain_id,
                    reason,
                });
            }
        }
    }
    let document = ExportDocument {
        last_updated: date.to_string(),
        chains,
    };
    Ok((document, skipped_empty, failed))
}

/// serializes `document` next to `path` and renames it into place, so
/// readers see either the previous export or the new one. returns the size
pub fn write_document(document: &ExportDocument, path: &Path) -> Result<u64, StatsError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| StatsError::export(path, e))?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StatsError::export(path, e))?;
    serde_json::to_writer(&mut tmp, document).map_err(|e| StatsError::export(path, e))?;
    tmp.flush().map_err(|e| StatsError::export(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StatsError::export(path, e))?;
    tmp.persist(path)
        .map_err(|e| StatsError::export(path, e.error))?;
    let bytes = fs::metadata(path)
        .map_err(|e| StatsError::export(path, e))?
        .len();
    Ok(bytes)
}

pub async fn run_export<D>(
    directory: Arc<D>,
    store: &LedgerStore,
    output: &Path,
    date: &str,
    concurrency: usize,
) -> Result<ExportReport>
where
    D: ChainDirectory + Send + Sync + 'static,
{
    info!("fetching chain names");
    let names = resolve_names(directory).await;
    let (document, skipped_empty, failed) = build_catalog(store, &names, date, concurrency).await?;
    let chains = document.chains.len();
    let target = output.to_path_buf();
    let bytes = tokio::task::spawn_blocking(move || write_document(&document, &target))
        .await
        .map_err(|err| anyhow!("export write task aborted: {err}"))??;
    Ok(ExportReport {
        path: output.to_path_buf(),
        bytes,
        chains,
        skipped_empty,
        failed,
    })
}
