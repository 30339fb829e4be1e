use serde::{Deserialize, Serialize};

pub const LEDGER_HEADER: [&str; 4] = ["date", "full_match", "partial_match", "total"];

/// one persisted ledger record, field order matches `LEDGER_HEADER`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: String,
    pub full_match: u64,
    pub partial_match: u64,
    pub total: u64,
}

impl LedgerRow {
    /// the cell for a ledger column, empty for columns this row doesn't carry
    pub fn cell(&self, column: &str) -> String {
        match column {
            "date" => self.date.clone(),
            "full_match" => self.full_match.to_string(),
            "partial_match" => self.partial_match.to_string(),
            "total" => self.total.to_string(),
            _ => String::new(),
        }
    }
}

/// a snapshot entry for one chain, ready to be appended to its ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSnapshotRow {
    pub chain_id: String,
    pub row: LedgerRow,
}

impl ChainSnapshotRow {
    pub fn new(chain_id: &str, full_match: u64, partial_match: u64, date: &str) -> Self {
        ChainSnapshotRow {
            chain_id: chain_id.to_string(),
            row: LedgerRow {
                date: date.to_string(),
                full_match,
                partial_match,
                total: full_match.saturating_add(partial_match),
            },
        }
    }
}

/// ledger record as found on disk; older ledgers may carry blanks or
/// non numeric cells, so everything is read as text first
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawLedgerRecord {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub full_match: String,
    #[serde(default)]
    pub partial_match: String,
    #[serde(default)]
    pub total: String,
}

impl RawLedgerRecord {
    /// `None` for records without a date
    pub(crate) fn into_record(self) -> Option<LedgerRecord> {
        if self.date.is_empty() {
            return None;
        }
        Some(LedgerRecord {
            full_match: parse_count(&self.full_match),
            partial_match: parse_count(&self.partial_match),
            total: parse_count(&self.total),
            date: self.date,
        })
    }
}

fn parse_count(cell: &str) -> Option<u64> {
    cell.trim().parse().ok()
}

/// a dated ledger record as read back, cells that aren't integers are `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub date: String,
    pub full_match: Option<u64>,
    pub partial_match: Option<u64>,
    pub total: Option<u64>,
}

impl LedgerRecord {
    /// non numeric cells count as 0
    pub fn into_row(self) -> LedgerRow {
        LedgerRow {
            date: self.date,
            full_match: self.full_match.unwrap_or(0),
            partial_match: self.partial_match.unwrap_or(0),
            total: self.total.unwrap_or(0),
        }
    }
}

/// a chain's full ledger history as index aligned columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainSeries {
    pub dates: Vec<String>,
    pub full: Vec<u64>,
    pub partial: Vec<u64>,
    pub total: Vec<u64>,
}

impl ChainSeries {
    pub fn push(&mut self, row: LedgerRow) {
        self.dates.push(row.date);
        self.full.push(row.full_match);
        self.partial.push(row.partial_match);
        self.total.push(row.total);
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl FromIterator<LedgerRow> for ChainSeries {
    fn from_iter<I: IntoIterator<Item = LedgerRow>>(iter: I) -> Self {
        let mut series = ChainSeries::default();
        for row in iter {
            series.push(row);
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_row_total_is_computed() {
        let snap = ChainSnapshotRow::new("1", 10, 5, "2024-01-01");
        assert_eq!(snap.row.total, 15);
        let huge = ChainSnapshotRow::new("1", u64::MAX, 1, "2024-01-01");
        assert_eq!(huge.row.total, u64::MAX);
    }

    #[test]
    fn row_cells_by_column_name() {
        let row = ChainSnapshotRow::new("1", 10, 5, "2024-01-01").row;
        let cells: Vec<String> = ["total", "date", "full_match", "partial_match", "note"]
            .iter()
            .map(|c| row.cell(c))
            .collect();
        assert_eq!(cells, vec!["15", "2024-01-01", "10", "5", ""]);
    }

    #[test]
    fn raw_record_is_read_leniently() {
        let raw = RawLedgerRecord {
            date: "2024-01-01".into(),
            full_match: " 12 ".into(),
            partial_match: "".into(),
            total: "n/a".into(),
        };
        let record = raw.into_record().unwrap();
        assert_eq!(record.full_match, Some(12));
        assert_eq!(record.partial_match, None);
        assert_eq!(record.total, None);
        let row = record.into_row();
        assert_eq!(row.full_match, 12);
        assert_eq!(row.partial_match, 0);
        assert_eq!(row.total, 0);
        assert!(RawLedgerRecord::default().into_record().is_none());
    }

    #[test]
    fn series_columns_stay_aligned() {
        let series: ChainSeries = [
            ChainSnapshotRow::new("1", 1, 2, "2024-01-01").row,
            ChainSnapshotRow::new("1", 3, 4, "2024-01-02").row,
        ]
        .into_iter()
        .collect();
        assert_eq!(series.len(), 2);
        assert_eq!(series.dates, vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(series.full, vec![1, 3]);
        assert_eq!(series.partial, vec![2, 4]);
        assert_eq!(series.total, vec![3, 7]);
    }
}
