use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use super::HistoryResult;
use crate::builder::QrBitmap;

/// Directory of PNGs for created codes, named `QRCode_<millis>.png`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, image_ref: &str) -> PathBuf {
        self.dir.join(image_ref)
    }

    /// Writes the bitmap and returns its file name.
    pub fn store(&self, qr: &QrBitmap) -> HistoryResult<String> {
        fs::create_dir_all(&self.dir)?;

        let mut millis = Utc::now().timestamp_millis();
        let mut name = format!("QRCode_{millis}.png");
        // Two codes saved within the same millisecond
        while self.path_of(&name).exists() {
            millis += 1;
            name = format!("QRCode_{millis}.png");
        }

        qr.save_png(self.path_of(&name))?;
        debug!("Saved {}", self.path_of(&name).display());
        Ok(name)
    }

    /// Deletes the files behind the given refs. Failures are logged, never
    /// returned.
    pub fn remove<'a>(&self, refs: impl IntoIterator<Item = &'a str>) {
        for image_ref in refs.into_iter().filter(|r| !r.is_empty()) {
            let path = self.path_of(image_ref);
            match fs::remove_file(&path) {
                Ok(()) => debug!("Deleted {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("File not found: {}", path.display())
                }
                Err(e) => warn!("Failed to delete {}: {e}", path.display()),
            }
        }
    }
}
