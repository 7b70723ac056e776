use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Files in `dir` with the given extension, newest first. A missing directory yields nothing.
pub fn list_files_with_extension(dir: impl AsRef<Path>, extension: &str) -> Vec<FileEntry> {
    let mut entries = Vec::new();

    if let Ok(read_dir) = fs::read_dir(dir.as_ref()) {
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
                continue;
            }

            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(UNIX_EPOCH);
            let Some(name) = path
                .file_name()
                .and_then(|segment| segment.to_str())
                .map(|s| s.to_string())
            else {
                continue;
            };

            entries.push(FileEntry {
                name,
                path,
                modified,
            });
        }
    }

    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
    entries
}

pub fn list_csv_files(dir: impl AsRef<Path>) -> Vec<FileEntry> {
    list_files_with_extension(dir, "csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2024_01_01_10_00_overview.csv"), "a").unwrap();
        fs::write(dir.path().join("notes.txt"), "b").unwrap();

        let files = list_csv_files(dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "2024_01_01_10_00_overview.csv");
        assert!(list_csv_files(dir.path().join("missing")).is_empty());
    }
}
