use crate::types::{ChainSeries, LEDGER_HEADER, LedgerRecord, LedgerRow, RawLedgerRecord};
use common::constants::LEDGER_EXTENSION;
use common::error::{Result, StatsError};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// per-chain append-only csv ledgers, one `<chain id>.csv` per chain
#[derive(Debug, Clone)]
pub struct LedgerStore {
    dir: PathBuf,
}

impl LedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LedgerStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ledger_path(&self, chain_id: &str) -> Result<PathBuf> {
        if !is_valid_chain_id(chain_id) {
            return Err(StatsError::InvalidChainId(chain_id.to_string()));
        }
        Ok(self.dir.join(format!("{chain_id}.{LEDGER_EXTENSION}")))
    }

    /// creates the ledger with its header, returns false if it already existed.
    /// the header is written to a temp file that is then linked into place
    /// without clobbering, so a ledger never shows up without its header
    pub fn create(&self, chain_id: &str) -> Result<bool> {
        let path = self.ledger_path(chain_id)?;
        if path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir).map_err(|e| StatsError::ledger_dir(&self.dir, e))?;
        let mut tmp =
            NamedTempFile::new_in(&self.dir).map_err(|e| StatsError::ledger_io(chain_id, e))?;
        write_header(tmp.as_file_mut()).map_err(|e| StatsError::ledger_io(chain_id, e))?;
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                debug!("created ledger {}", path.display());
                Ok(true)
            }
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(StatsError::ledger_io(chain_id, err.error)),
        }
    }

    /// appends one record, the ledger is created first if missing.
    /// returns once the row is flushed and synced to disk
    pub fn append(&self, chain_id: &str, row: &LedgerRow) -> Result<()> {
        self.create(chain_id)?;
        let path = self.ledger_path(chain_id)?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| StatsError::ledger_io(chain_id, e))?;
        let len = file
            .metadata()
            .map_err(|e| StatsError::ledger_io(chain_id, e))?
            .len();
        let columns: Vec<String> = if len == 0 {
            // left empty by an older writer, rows must not land headerless
            warn!("ledger {} is empty, writing its header", path.display());
            write_header(&mut file).map_err(|e| StatsError::ledger_io(chain_id, e))?;
            LEDGER_HEADER.iter().map(|c| c.to_string()).collect()
        } else {
            ledger_columns(&path).map_err(|e| StatsError::ledger_io(chain_id, e))?
        };
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(&file);
        wtr.write_record(columns.iter().map(|column| row.cell(column)))
            .map_err(|e| StatsError::ledger_io(chain_id, e))?;
        wtr.flush().map_err(|e| StatsError::ledger_io(chain_id, e))?;
        file.sync_all().map_err(|e| StatsError::ledger_io(chain_id, e))?;
        Ok(())
    }

    /// chain ids with an existing ledger, sorted. no directory means no ledgers
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StatsError::ledger_dir(&self.dir, err)),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StatsError::ledger_dir(&self.dir, e))?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(LEDGER_EXTENSION)
            {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(id) if is_valid_chain_id(id) => ids.push(id.to_string()),
                _ => debug!("ignoring {} in ledger dir", path.display()),
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// dated records in write order, empty if the chain has no ledger
    pub fn read_records(&self, chain_id: &str) -> Result<Vec<LedgerRecord>> {
        let path = self.ledger_path(chain_id)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StatsError::ledger_io(chain_id, err)),
        };
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(file);
        let mut records = Vec::new();
        for record in rdr.deserialize::<RawLedgerRecord>() {
            let record = record.map_err(|e| StatsError::ledger_io(chain_id, e))?;
            if let Some(record) = record.into_record() {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// all rows in write order, non numeric cells read as 0
    pub fn read(&self, chain_id: &str) -> Result<Vec<LedgerRow>> {
        Ok(self
            .read_records(chain_id)?
            .into_iter()
            .map(LedgerRecord::into_row)
            .collect())
    }

    pub fn read_series(&self, chain_id: &str) -> Result<ChainSeries> {
        Ok(self.read(chain_id)?.into_iter().collect())
    }
}

/// header of an existing ledger; older ledgers order their columns differently
fn ledger_columns(path: &Path) -> csv::Result<Vec<String>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)?;
    Ok(rdr.headers()?.iter().map(str::to_string).collect())
}

fn write_header(file: &mut File) -> std::io::Result<()> {
    {
        let mut wtr = WriterBuilder::new().from_writer(&mut *file);
        wtr.write_record(LEDGER_HEADER)?;
        wtr.flush()?;
    }
    file.flush()?;
    file.sync_all()
}

fn is_valid_chain_id(chain_id: &str) -> bool {
    !chain_id.is_empty()
        && chain_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChainSnapshotRow;
    use tempfile::tempdir;

    #[test]
    fn append_writes_header_once() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        for day in ["2024-01-01", "2024-01-02", "2024-01-02"] {
            let snap = ChainSnapshotRow::new("1", 10, 5, day);
            store.append(&snap.chain_id, &snap.row).unwrap();
        }
        let contents = fs::read_to_string(dir.path().join("1.csv")).unwrap();
        assert_eq!(
            contents,
            "date,full_match,partial_match,total\n\
             2024-01-01,10,5,15\n\
             2024-01-02,10,5,15\n\
             2024-01-02,10,5,15\n"
        );
        assert_eq!(contents.matches("date,").count(), 1);
    }

    #[test]
    fn create_is_a_noop_for_existing_ledgers() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("nested"));
        assert!(store.create("5").unwrap());
        assert!(!store.create("5").unwrap());
        let contents = fs::read_to_string(dir.path().join("nested/5.csv")).unwrap();
        assert_eq!(contents, "date,full_match,partial_match,total\n");
        assert!(store.read("5").unwrap().is_empty());
    }

    #[test]
    fn read_preserves_write_order_and_duplicates() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        let rows = [
            ChainSnapshotRow::new("137", 1, 1, "2024-01-03").row,
            ChainSnapshotRow::new("137", 2, 1, "2024-01-01").row,
            ChainSnapshotRow::new("137", 2, 1, "2024-01-01").row,
        ];
        for row in &rows {
            store.append("137", row).unwrap();
        }
        assert_eq!(store.read("137").unwrap(), rows.to_vec());
        let series = store.read_series("137").unwrap();
        assert_eq!(series.dates, vec!["2024-01-03", "2024-01-01", "2024-01-01"]);
        assert_eq!(series.total, vec![2, 3, 3]);
    }

    #[test]
    fn read_absent_ledger_is_empty() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        assert!(store.read("42").unwrap().is_empty());
        assert!(store.read_series("42").unwrap().is_empty());
    }

    #[test]
    fn read_tolerates_foreign_ledgers() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("10.csv"),
            "date,full_match,partial_match,total\n\
             2023-05-01,4,1,5\n\
             ,9,9,18\n\
             2023-05-02,x,2,\n\
             2023-05-03,6, ,6\n",
        )
        .unwrap();
        let store = LedgerStore::new(dir.path());
        let series = store.read_series("10").unwrap();
        assert_eq!(series.dates, vec!["2023-05-01", "2023-05-02", "2023-05-03"]);
        assert_eq!(series.full, vec![4, 0, 6]);
        assert_eq!(series.partial, vec![1, 2, 0]);
        assert_eq!(series.total, vec![5, 0, 6]);
    }

    #[test]
    fn read_matches_columns_by_header_name() {
        let dir = tempdir().unwrap();
        // column order written by the earlier node ingestor
        fs::write(
            dir.path().join("100.csv"),
            "full_match,partial_match,total,date\n\
             4,1,5,2023-05-01\n\
             7,2,9,2023-05-02\n",
        )
        .unwrap();
        let store = LedgerStore::new(dir.path());
        let series = store.read_series("100").unwrap();
        assert_eq!(series.dates, vec!["2023-05-01", "2023-05-02"]);
        assert_eq!(series.full, vec![4, 7]);
        assert_eq!(series.partial, vec![1, 2]);
        assert_eq!(series.total, vec![5, 9]);

        // new rows follow the ledger's own column order
        let snap = ChainSnapshotRow::new("100", 8, 3, "2023-05-03");
        store.append("100", &snap.row).unwrap();
        let contents = fs::read_to_string(dir.path().join("100.csv")).unwrap();
        assert!(contents.ends_with("7,2,9,2023-05-02\n8,3,11,2023-05-03\n"));
        assert_eq!(store.read_series("100").unwrap().total, vec![5, 9, 11]);
    }

    #[test]
    fn read_records_keeps_non_numeric_cells_apart() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("3.csv"),
            "date,full_match,partial_match,total\n2024-01-02,1,,n/a\n",
        )
        .unwrap();
        let store = LedgerStore::new(dir.path());
        let records = store.read_records("3").unwrap();
        assert_eq!(
            records,
            vec![LedgerRecord {
                date: "2024-01-02".into(),
                full_match: Some(1),
                partial_match: None,
                total: None,
            }]
        );
        assert_eq!(store.read("3").unwrap()[0].total, 0);
    }

    #[test]
    fn append_to_empty_ledger_writes_header_first() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("7.csv"), "").unwrap();
        let store = LedgerStore::new(dir.path());
        assert!(!store.create("7").unwrap());
        for day in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            let snap = ChainSnapshotRow::new("7", 10, 5, day);
            store.append("7", &snap.row).unwrap();
        }
        let contents = fs::read_to_string(dir.path().join("7.csv")).unwrap();
        assert_eq!(
            contents,
            "date,full_match,partial_match,total\n\
             2024-01-01,10,5,15\n\
             2024-01-02,10,5,15\n\
             2024-01-03,10,5,15\n"
        );
        assert_eq!(store.read("7").unwrap().len(), 3);
    }

    #[test]
    fn create_leaves_no_temp_files_behind() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        assert!(store.create("1").unwrap());
        assert!(!store.create("1").unwrap());
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1.csv"]);
    }

    #[test]
    fn list_returns_sorted_ledger_ids() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        for id in ["137", "1", "10"] {
            store.create(id).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "not a ledger").unwrap();
        fs::write(dir.path().join("bad id.csv"), "").unwrap();
        assert_eq!(store.list().unwrap(), vec!["1", "10", "137"]);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("missing"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn rejects_chain_ids_that_escape_the_dir() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path());
        let row = ChainSnapshotRow::new("x", 1, 1, "2024-01-01").row;
        for id in ["", "../1", "a/b", "1.csv"] {
            assert!(matches!(
                store.append(id, &row),
                Err(StatsError::InvalidChainId(_))
            ));
        }
        assert!(store.list().unwrap().is_empty());
    }
}
