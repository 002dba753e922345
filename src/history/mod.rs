//! # History
//!
//! Scanned and created codes, persisted through a [`HistoryStore`] and
//! published to subscribers as ordered snapshots. Both lists are always
//! ordered newest first.

mod images;
mod json;
mod memory;

pub use images::ImageStore;
pub use json::JsonStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use crate::builder::QrBitmap;
use crate::common::error::QRError;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("history file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write image: {0}")]
    Image(#[from] QRError),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

// Records
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedRecord {
    pub id: u64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub id: u64,
    pub content: String,
    /// Name of the PNG in the image store
    pub image_ref: String,
    pub timestamp: DateTime<Utc>,
}

/// Table contents shared by the store implementations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct HistoryData {
    next_id: u64,
    scanned: Vec<ScannedRecord>,
    created: Vec<CreatedRecord>,
}

impl HistoryData {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn insert_scanned(&mut self, content: &str) -> ScannedRecord {
        let rec =
            ScannedRecord { id: self.next_id(), content: content.to_string(), timestamp: Utc::now() };
        self.scanned.push(rec.clone());
        rec
    }

    pub(crate) fn insert_created(&mut self, content: &str, image_ref: &str) -> CreatedRecord {
        let rec = CreatedRecord {
            id: self.next_id(),
            content: content.to_string(),
            image_ref: image_ref.to_string(),
            timestamp: Utc::now(),
        };
        self.created.push(rec.clone());
        rec
    }

    pub(crate) fn scanned(&self) -> Vec<ScannedRecord> {
        let mut res = self.scanned.clone();
        res.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        res
    }

    pub(crate) fn created(&self) -> Vec<CreatedRecord> {
        let mut res = self.created.clone();
        res.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        res
    }

    pub(crate) fn delete_scanned(&mut self, ids: &[u64]) -> usize {
        let before = self.scanned.len();
        self.scanned.retain(|r| !ids.contains(&r.id));
        before - self.scanned.len()
    }

    pub(crate) fn delete_created(&mut self, refs: &[String]) -> Vec<CreatedRecord> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.created.drain(..).partition(|r| refs.contains(&r.image_ref));
        self.created = kept;
        removed
    }
}

// Store
//------------------------------------------------------------------------------

pub trait HistoryStore {
    fn insert_scanned(&mut self, content: &str) -> HistoryResult<ScannedRecord>;
    fn insert_created(&mut self, content: &str, image_ref: &str) -> HistoryResult<CreatedRecord>;
    /// Newest first
    fn scanned(&self) -> Vec<ScannedRecord>;
    /// Newest first
    fn created(&self) -> Vec<CreatedRecord>;
    /// Returns the number of rows removed.
    fn delete_scanned(&mut self, ids: &[u64]) -> HistoryResult<usize>;
    /// Returns the removed rows.
    fn delete_created(&mut self, refs: &[String]) -> HistoryResult<Vec<CreatedRecord>>;
}

// History service
//------------------------------------------------------------------------------

/// Wraps a store and pushes a fresh snapshot to subscribers after every
/// change.
pub struct History<S: HistoryStore> {
    store: S,
    images: Option<ImageStore>,
    scanned_tx: watch::Sender<Vec<ScannedRecord>>,
    created_tx: watch::Sender<Vec<CreatedRecord>>,
}

impl<S: HistoryStore> History<S> {
    pub fn new(store: S) -> Self {
        let (scanned_tx, _) = watch::channel(store.scanned());
        let (created_tx, _) = watch::channel(store.created());
        Self { store, images: None, scanned_tx, created_tx }
    }

    /// Keeps PNGs of created codes in `images`.
    pub fn with_images(mut self, images: ImageStore) -> Self {
        self.images = Some(images);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scanned(&self) -> Vec<ScannedRecord> {
        self.scanned_tx.borrow().clone()
    }

    pub fn created(&self) -> Vec<CreatedRecord> {
        self.created_tx.borrow().clone()
    }

    pub fn subscribe_scanned(&self) -> watch::Receiver<Vec<ScannedRecord>> {
        self.scanned_tx.subscribe()
    }

    pub fn subscribe_created(&self) -> watch::Receiver<Vec<CreatedRecord>> {
        self.created_tx.subscribe()
    }

    pub fn add_scanned(&mut self, content: &str) -> HistoryResult<ScannedRecord> {
        let rec = self.store.insert_scanned(content)?;
        info!("Saved scan #{}", rec.id);
        self.scanned_tx.send_replace(self.store.scanned());
        Ok(rec)
    }

    /// Records a created code. With an image store attached the bitmap is
    /// written first and its file name becomes the record's image ref. The PNG is
    /// removed again when the record cannot be saved.
    pub fn add_created(&mut self, qr: &QrBitmap) -> HistoryResult<CreatedRecord> {
        let image_ref = match &self.images {
            Some(images) => images.store(qr)?,
            None => String::new(),
        };
        let rec = match self.store.insert_created(qr.text(), &image_ref) {
            Ok(rec) => rec,
            Err(e) => {
                // No record points at the PNG, so it goes too
                if let Some(images) = &self.images {
                    images.remove([image_ref.as_str()]);
                }
                return Err(e);
            }
        };
        info!("Saved created code #{}", rec.id);
        self.created_tx.send_replace(self.store.created());
        Ok(rec)
    }

    pub fn delete_scanned(&mut self, ids: &[u64]) -> HistoryResult<usize> {
        let n = self.store.delete_scanned(ids)?;
        info!("Deleted {n} scanned record(s)");
        self.scanned_tx.send_replace(self.store.scanned());
        Ok(n)
    }

    /// Deletes created records along with their PNGs.
    pub fn delete_created(&mut self, refs: &[String]) -> HistoryResult<Vec<CreatedRecord>> {
        let removed = self.store.delete_created(refs)?;
        if let Some(images) = &self.images {
            images.remove(removed.iter().map(|r| r.image_ref.as_str()));
        }
        info!("Deleted {} created record(s)", removed.len());
        self.created_tx.send_replace(self.store.created());
        Ok(removed)
    }
}
