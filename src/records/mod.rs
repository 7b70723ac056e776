use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DashboardConfig;
use crate::error::{Context, Result};
use crate::utils::{list_csv_files, snapshot_timestamp_slug};

pub mod indicators;
pub mod snapshot_table;

pub use indicators::HistoryIndicators;
pub use snapshot_table::SnapshotTable;

const EXPORT_SUFFIX: &str = "_overview.csv";

/// Facade that keeps export persistence isolated from the rest of the app.
pub struct Records {
    export_dir: PathBuf,
}

impl Records {
    pub fn for_config(config: &DashboardConfig) -> Self {
        Self::with_dir(config.export_dir.clone())
    }

    pub fn with_dir<P: Into<PathBuf>>(export_dir: P) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Ensure the export directory exists before any persistence happens.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.export_dir).with_context(|| {
            format!(
                "Failed to create export directory {}",
                self.export_dir.display()
            )
        })?;
        Ok(())
    }

    /// Persist the overview table using a timestamped filename.
    pub fn save_overview(&self, table: &SnapshotTable) -> Result<PathBuf> {
        self.prepare()?;
        let filename = format!("{}{EXPORT_SUFFIX}", snapshot_timestamp_slug());
        let path = self.export_dir.join(filename);
        table.save_to_csv(&path)?;
        Ok(path)
    }

    pub fn load_overview<P: AsRef<Path>>(&self, path: P) -> Result<SnapshotTable> {
        SnapshotTable::load_from_csv(path)
    }

    /// Most recently written overview export, if any.
    pub fn latest_overview(&self) -> Option<PathBuf> {
        list_csv_files(&self.export_dir)
            .into_iter()
            .find(|entry| entry.name.ends_with(EXPORT_SUFFIX))
            .map(|entry| entry.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::normalize;
    use crate::fetch::snapshots::tests::aapl_quote;

    #[test]
    fn saves_timestamped_export_and_finds_it() {
        let dir = tempfile::tempdir().unwrap();
        let records = Records::with_dir(dir.path().join("exports"));
        assert!(records.latest_overview().is_none());

        let table = SnapshotTable::new(vec![normalize(aapl_quote()).unwrap()]);
        let path = records.save_overview(&table).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_overview.csv"), "{name}");
        assert_eq!(records.latest_overview(), Some(path.clone()));

        let loaded = records.load_overview(&path).unwrap();
        assert_eq!(loaded.data, table.data);
    }
}
