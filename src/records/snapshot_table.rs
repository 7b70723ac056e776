use std::path::Path;

use crate::error::{Context, Result};
use crate::fetch::StockSnapshot;

/// In-memory overview table plus CSV persistence.
#[derive(Debug, Clone, Default)]
pub struct SnapshotTable {
    pub data: Vec<StockSnapshot>,
}

impl SnapshotTable {
    pub fn new(data: Vec<StockSnapshot>) -> Self {
        Self { data }
    }

    pub fn get(&self, ticker: &str) -> Option<&StockSnapshot> {
        self.data
            .iter()
            .find(|snapshot| snapshot.ticker().eq_ignore_ascii_case(ticker))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write one row per snapshot, with a header row.
    pub fn save_to_csv<P: AsRef<Path>>(&self, file_path: P) -> Result<()> {
        let path = file_path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV writer for {}", path.display()))?;

        for snapshot in &self.data {
            writer.serialize(snapshot)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load a table written by `save_to_csv`; every row is re-validated.
    pub fn load_from_csv<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

        let mut data = Vec::new();
        for (line, row) in reader.deserialize::<StockSnapshot>().enumerate() {
            let snapshot = row.with_context(|| {
                format!("Invalid snapshot row {} in {}", line + 2, path.display())
            })?;
            data.push(snapshot);
        }

        Ok(Self::new(data))
    }
}
