use common::{
    constants::{
        DEFAULT_CONCURRENCY, DEFAULT_EXPORT_FILE, DEFAULT_LEDGER_DIR, SOURCIFY_CHAINS_URL,
        SOURCIFY_STATS_URL,
    },
    env::get_env_var,
    sourcify::SourcifyClient,
};
use serde::Deserialize;
use std::{fs, io::ErrorKind, path::PathBuf};
use tracing::warn;

const CONFIG_FILE: &str = "chainstats.toml";

/// optional `chainstats.toml`, every key can be overridden from the environment
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(alias = "LEDGER_DIR")]
    ledger_dir: Option<String>,
    #[serde(alias = "EXPORT_FILE")]
    export_file: Option<String>,
    #[serde(alias = "SOURCIFY_STATS_URL")]
    stats_url: Option<String>,
    #[serde(alias = "SOURCIFY_CHAINS_URL")]
    chains_url: Option<String>,
    #[serde(alias = "CHAINSTATS_CONCURRENCY")]
    concurrency: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ledger_dir: PathBuf,
    pub export_file: PathBuf,
    pub stats_url: String,
    pub chains_url: String,
    pub concurrency: usize,
}

impl Config {
    pub fn load() -> Self {
        let file = load_file_config().unwrap_or_default();
        Self::resolve(file, |key| get_env_var(key).ok())
    }

    pub fn resolve<F>(file: FileConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let ledger_dir = env("LEDGER_DIR")
            .or(file.ledger_dir)
            .unwrap_or_else(|| DEFAULT_LEDGER_DIR.into());
        let export_file = env("EXPORT_FILE")
            .or(file.export_file)
            .unwrap_or_else(|| DEFAULT_EXPORT_FILE.into());
        let stats_url = env("SOURCIFY_STATS_URL")
            .or(file.stats_url)
            .unwrap_or_else(|| SOURCIFY_STATS_URL.into());
        let chains_url = env("SOURCIFY_CHAINS_URL")
            .or(file.chains_url)
            .unwrap_or_else(|| SOURCIFY_CHAINS_URL.into());
        let concurrency = env("CHAINSTATS_CONCURRENCY")
            .and_then(|v| v.parse::<usize>().ok())
            .or(file.concurrency)
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_CONCURRENCY);
        Config {
            ledger_dir: ledger_dir.into(),
            export_file: export_file.into(),
            stats_url,
            chains_url,
            concurrency,
        }
    }

    pub fn sourcify_client(&self) -> SourcifyClient {
        SourcifyClient::new(&self.stats_url, &self.chains_url)
    }
}

fn load_file_config() -> Option<FileConfig> {
    if let Ok(path) = get_env_var("CHAINSTATS_CONFIG") {
        return read_file_config(&path);
    }
    read_file_config(CONFIG_FILE).or_else(|| read_file_config(&format!("../{CONFIG_FILE}")))
}

fn read_file_config(path: &str) -> Option<FileConfig> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            warn!("failed to read config {path}: {err}");
            return None;
        }
    };
    match toml::from_str::<FileConfig>(&contents) {
        Ok(config) => Some(config),
        Err(err) => {
            warn!("failed to parse config {path}: {err}");
            None
        }
    }
}
