use common::error::Result as StatsResult;
use futures::{StreamExt, stream};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFailure {
    pub chain_id: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct ChainOutcome<T> {
    pub chain_id: String,
    pub result: Result<T, String>,
}

/// runs `work` once per chain on the blocking pool, at most `concurrency`
/// units at a time. units share nothing; outcomes come back sorted by chain id
pub async fn for_each_chain<U, T, F>(
    units: Vec<(String, U)>,
    concurrency: usize,
    work: F,
) -> Vec<ChainOutcome<T>>
where
    U: Send + 'static,
    T: Send + 'static,
    F: Fn(&str, U) -> StatsResult<T> + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let units = units.into_iter().map(|(chain_id, unit)| {
        let work = work.clone();
        async move {
            let id = chain_id.clone();
            let result = match tokio::task::spawn_blocking(move || work(&id, unit)).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(err.to_string()),
                Err(err) => Err(format!("chain task aborted: {err}")),
            };
            ChainOutcome { chain_id, result }
        }
    });
    let mut outcomes: Vec<ChainOutcome<T>> = stream::iter(units)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    outcomes.sort_by(|a, b| a.chain_id.cmp(&b.chain_id));
    outcomes
}
