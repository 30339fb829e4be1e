use crate::fanout::{ChainFailure, for_each_chain};
use anyhow::{Result, bail};
use common::error::StatsError;
use ledger::{LedgerRecord, LedgerStore};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContribution {
    pub chain_id: String,
    pub matched_rows: usize,
    pub total: u64,
}

#[derive(Debug, Default)]
pub struct DateTotal {
    pub date: String,
    pub total: u64,
    pub chains_with_data: usize,
    pub chains_without_data: usize,
    pub contributions: Vec<ChainContribution>,
    pub failed: Vec<ChainFailure>,
}

impl DateTotal {
    /// a total is only meaningful once every ledger was scanned
    pub fn ensure_complete(self) -> Result<Self> {
        if !self.failed.is_empty() {
            let chains: Vec<&str> = self.failed.iter().map(|f| f.chain_id.as_str()).collect();
            bail!(
                "{} chain ledgers could not be read ({}), no total for {}",
                chains.len(),
                chains.join(", "),
                self.date
            );
        }
        Ok(self)
    }

    pub fn log_summary(&self) {
        info!("date: {}", self.date);
        info!("chains with data: {}", self.chains_with_data);
        info!("chains without data: {}", self.chains_without_data);
        if self.failed.is_empty() {
            info!("total verified contracts: {}", self.total);
        } else {
            info!("chains unreadable: {}", self.failed.len());
        }
    }
}

/// accepts exactly `dddd-dd-dd`, the calendar itself is not checked
pub fn validate_date(input: &str) -> Result<(), StatsError> {
    let bytes = input.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if well_formed {
        Ok(())
    } else {
        Err(StatsError::InvalidDate(input.to_string()))
    }
}

/// (matching rows, summed total) for one ledger's records. a record whose
/// total isn't an integer is not counted
pub fn sum_for_date(records: &[LedgerRecord], date: &str) -> (usize, u64) {
    records
        .iter()
        .filter(|record| record.date == date)
        .filter_map(|record| record.total)
        .fold((0, 0u64), |(count, sum), total| {
            (count + 1, sum.saturating_add(total))
        })
}

/// sums `total` over every ledger row dated `target_date`. each chain is
/// summed on its own and the subtotals are reduced once all are in.
/// unreadable ledgers are collected in `failed`, see `DateTotal::ensure_complete`
pub async fn total_for_date(
    store: &LedgerStore,
    target_date: &str,
    concurrency: usize,
) -> Result<DateTotal> {
    validate_date(target_date)?;
    let chain_ids = store.list()?;
    info!(
        "found {} chain ledgers, totalling {target_date}",
        chain_ids.len()
    );

    let units = chain_ids.into_iter().map(|id| (id, ())).collect();
    let reader = store.clone();
    let date = target_date.to_string();
    let outcomes = for_each_chain(units, concurrency, move |chain_id, ()| {
        let records = reader.read_records(chain_id)?;
        Ok(sum_for_date(&records, &date))
    })
    .await;

    let mut result = DateTotal {
        date: target_date.to_string(),
        ..DateTotal::default()
    };
    for outcome in outcomes {
        match outcome.result {
            Ok((matched_rows, total)) => {
                if matched_rows > 0 {
                    debug!("chain {}: {total} verified contracts", outcome.chain_id);
                    result.chains_with_data += 1;
                } else {
                    debug!("chain {}: no data for {target_date}", outcome.chain_id);
                    result.chains_without_data += 1;
                }
                result.total = result.total.saturating_add(total);
                result.contributions.push(ChainContribution {
                    chain_id: outcome.chain_id,
                    matched_rows,
                    total,
                });
            }
            Err(reason) => {
                warn!("chain {}: read failed: {reason}", outcome.chain_id);
                result.failed.push(ChainFailure {
                    chain_id: outcome.chain_id,
                    reason,
                });
            }
        }
    }
    Ok(result)
}
