// sourcify endpoints
pub const SOURCIFY_STATS_URL: &str = "https://repo.sourcify.dev/stats.json";
pub const SOURCIFY_CHAINS_URL: &str = "https://sourcify.dev/server/chains";

// on-disk layout
pub const DEFAULT_LEDGER_DIR: &str = "./chainStats";
pub const DEFAULT_EXPORT_FILE: &str = "./docs/data.json";
pub const LEDGER_EXTENSION: &str = "csv";

// per-chain units in flight at once
pub const DEFAULT_CONCURRENCY: usize = 16;
