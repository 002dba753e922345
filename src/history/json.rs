use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{CreatedRecord, HistoryData, HistoryResult, HistoryStore, ScannedRecord};

/// History kept in a single JSON file, rewritten on every change.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    data: HistoryData,
}

impl JsonStore {
    /// Opens the file at `path`, starting empty if it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> HistoryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => HistoryData::default(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened history at {}", path.display());
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Writes to a sibling temp file first so a crash never leaves a truncated
    // history behind
    fn save(&self) -> HistoryResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let contents = serde_json::to_string_pretty(&self.data)?;
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn commit<T>(&mut self, f: impl FnOnce(&mut HistoryData) -> T) -> HistoryResult<T> {
        let backup = self.data.clone();
        let res = f(&mut self.data);
        if let Err(e) = self.save() {
            self.data = backup;
            return Err(e);
        }
        Ok(res)
    }
}

impl HistoryStore for JsonStore {
    fn insert_scanned(&mut self, content: &str) -> HistoryResult<ScannedRecord> {
        self.commit(|d| d.insert_scanned(content))
    }

    fn insert_created(&mut self, content: &str, image_ref: &str) -> HistoryResult<CreatedRecord> {
        self.commit(|d| d.insert_created(content, image_ref))
    }

    fn scanned(&self) -> Vec<ScannedRecord> {
        self.data.scanned()
    }

    fn created(&self) -> Vec<CreatedRecord> {
        self.data.created()
    }

    fn delete_scanned(&mut self, ids: &[u64]) -> HistoryResult<usize> {
        self.commit(|d| d.delete_scanned(ids))
    }

    fn delete_created(&mut self, refs: &[String]) -> HistoryResult<Vec<CreatedRecord>> {
        self.commit(|d| d.delete_created(refs))
    }
}
