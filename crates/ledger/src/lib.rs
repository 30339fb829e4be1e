pub mod store;
pub mod types;

pub use store::LedgerStore;
pub use types::{ChainSeries, ChainSnapshotRow, LEDGER_HEADER, LedgerRecord, LedgerRow};
