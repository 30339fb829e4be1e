use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("remote unavailable ({url}): {reason}")]
    RemoteUnavailable { url: String, reason: String },
    #[error("ledger io error for chain {chain_id}: {reason}")]
    LedgerIo { chain_id: String, reason: String },
    #[error("ledger directory {path} unreadable: {reason}")]
    LedgerDir { path: String, reason: String },
    #[error("invalid chain id: {0:?}")]
    InvalidChainId(String),
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("failed to write export {path}: {reason}")]
    Export { path: String, reason: String },
}

impl StatsError {
    pub fn remote(url: &str, reason: impl ToString) -> Self {
        Self::RemoteUnavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn ledger_io(chain_id: &str, reason: impl ToString) -> Self {
        Self::LedgerIo {
            chain_id: chain_id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn ledger_dir(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::LedgerDir {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn export(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::Export {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}
