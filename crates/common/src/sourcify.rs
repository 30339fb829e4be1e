//! remote collaborators: the sourcify per-chain verification stats
//! snapshot and the chain name directory.
//!
//! both are modelled as traits so jobs can be driven by stub providers;
//! `SourcifyClient` is the blocking `ureq` backed implementation.
use crate::constants::{SOURCIFY_CHAINS_URL, SOURCIFY_STATS_URL};
use crate::error::{Result, StatsError};
use anyhow::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainCounts {
    pub full_match: u64,
    pub partial_match: u64,
}

/// one remote read of current verification counts, keyed by chain id
pub type StatsSnapshot = BTreeMap<String, ChainCounts>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainName {
    pub chain_id: String,
    pub name: String,
}

pub trait SnapshotSource {
    fn fetch_snapshot(&self) -> Result<StatsSnapshot>;
}

pub trait ChainDirectory {
    fn fetch_chains(&self) -> Result<Vec<ChainName>>;
}

#[derive(Debug, Clone)]
pub struct SourcifyClient {
    stats_url: String,
    chains_url: String,
}

impl Default for SourcifyClient {
    fn default() -> Self {
        Self::new(SOURCIFY_STATS_URL, SOURCIFY_CHAINS_URL)
    }
}

impl SourcifyClient {
    pub fn new(stats_url: &str, chains_url: &str) -> Self {
        SourcifyClient {
            stats_url: stats_url.to_string(),
            chains_url: chains_url.to_string(),
        }
    }
}

impl SnapshotSource for SourcifyClient {
    fn fetch_snapshot(&self) -> Result<StatsSnapshot> {
        let body =
            download_text(&self.stats_url).map_err(|e| StatsError::remote(&self.stats_url, e))?;
        parse_snapshot(&body).map_err(|e| StatsError::remote(&self.stats_url, e))
    }
}

impl ChainDirectory for SourcifyClient {
    fn fetch_chains(&self) -> Result<Vec<ChainName>> {
        let body =
            download_text(&self.chains_url).map_err(|e| StatsError::remote(&self.chains_url, e))?;
        parse_chain_names(&body).map_err(|e| StatsError::remote(&self.chains_url, e))
    }
}

/// GETs `url` and returns the response body as text
pub fn download_text(url: &str) -> std::result::Result<String, Error> {
    let mut res = ureq::get(url).call()?;
    Ok(res.body_mut().read_to_string()?)
}

/// parses a `stats.json` body: `{ "<chain id>": { "full_match": n, "partial_match": n }, .. }`
pub fn parse_snapshot(body: &str) -> std::result::Result<StatsSnapshot, serde_json::Error> {
    serde_json::from_str(body)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChainId {
    Num(u64),
    Str(String),
}

#[derive(Deserialize)]
struct RawChain {
    #[serde(rename = "chainId")]
    chain_id: RawChainId,
    name: String,
}

/// parses the chain directory list, ids may be served as numbers or strings
pub fn parse_chain_names(body: &str) -> std::result::Result<Vec<ChainName>, serde_json::Error> {
    let raw: Vec<RawChain> = serde_json::from_str(body)?;
    Ok(raw
        .into_iter()
        .map(|chain| ChainName {
            chain_id: match chain.chain_id {
                RawChainId::Num(id) => id.to_string(),
                RawChainId::Str(id) => id,
            },
            name: chain.name,
        })
        .collect())
}

/// chain id -> display name, later entries win on duplicate ids
pub fn name_map(chains: Vec<ChainName>) -> HashMap<String, String> {
    chains
        .into_iter()
        .map(|chain| (chain.chain_id, chain.name))
        .collect()
}

pub fn display_name(names: &HashMap<String, String>, chain_id: &str) -> String {
    names
        .get(chain_id)
        .cloned()
        .unwrap_or_else(|| format!("Chain {chain_id}"))
}
