use super::{CreatedRecord, HistoryData, HistoryResult, HistoryStore, ScannedRecord};

/// Volatile store, history lasts as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: HistoryData,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryStore {
    fn insert_scanned(&mut self, content: &str) -> HistoryResult<ScannedRecord> {
        Ok(self.data.insert_scanned(content))
    }

    fn insert_created(&mut self, content: &str, image_ref: &str) -> HistoryResult<CreatedRecord> {
        Ok(self.data.insert_created(content, image_ref))
    }

    fn scanned(&self) -> Vec<ScannedRecord> {
        self.data.scanned()
    }

    fn created(&self) -> Vec<CreatedRecord> {
        self.data.created()
    }

    fn delete_scanned(&mut self, ids: &[u64]) -> HistoryResult<usize> {
        Ok(self.data.delete_scanned(ids))
    }

    fn delete_created(&mut self, refs: &[String]) -> HistoryResult<Vec<CreatedRecord>> {
        Ok(self.data.delete_created(refs))
    }
}
