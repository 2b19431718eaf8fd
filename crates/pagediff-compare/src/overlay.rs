// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diff overlay storage: PNG-encoded overlays addressed by their SHA-256
// digest, so results carry small handles instead of pixel buffers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{ImageFormat, RgbaImage};
use pagediff_core::OverlayHandle;
use pagediff_core::error::{PageDiffError, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

/// Destination for diff overlays produced during a comparison.
pub trait OverlayStore: Send + Sync {
    /// Store `image` and return a handle to it. Storing identical content twice
    /// yields the same key.
    fn put(&self, image: &RgbaImage) -> Result<OverlayHandle>;
}

/// Keeps encoded overlays in memory. The default store.
#[derive(Debug, Default)]
pub struct MemoryOverlayStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryOverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// PNG bytes for `key`, if stored.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    /// Number of distinct overlays held.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OverlayStore for MemoryOverlayStore {
    fn put(&self, image: &RgbaImage) -> Result<OverlayHandle> {
        let png = encode_png(image)?;
        let key = hash_bytes(&png);

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PageDiffError::OverlayStore("memory store lock poisoned".into()))?;
        entries.entry(key.clone()).or_insert(png);

        Ok(OverlayHandle {
            key,
            width: image.width(),
            height: image.height(),
            location: None,
            base_key: None,
        })
    }
}

/// Writes overlays to `<dir>/<digest>.png`, bounding memory use on long
/// documents.
#[derive(Debug, Clone)]
pub struct DirectoryOverlayStore {
    root: PathBuf,
}

impl DirectoryOverlayStore {
    /// Create the store, creating `root` if it does not exist.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|err| {
            PageDiffError::OverlayStore(format!("cannot create {}: {}", root.display(), err))
        })?;
        info!("Overlay directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OverlayStore for DirectoryOverlayStore {
    fn put(&self, image: &RgbaImage) -> Result<OverlayHandle> {
        let png = encode_png(image)?;
        let key = hash_bytes(&png);
        let path = self.root.join(format!("{}.png", key));

        if !path.exists() {
            std::fs::write(&path, &png).map_err(|err| {
                PageDiffError::OverlayStore(format!("cannot write {}: {}", path.display(), err))
            })?;
            debug!(path = %path.display(), bytes = png.len(), "Overlay written");
        }

        Ok(OverlayHandle {
            key,
            width: image.width(),
            height: image.height(),
            location: Some(path),
            base_key: None,
        })
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| PageDiffError::ImageError(format!("overlay encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Lowercase hex SHA-256 of `data`.
fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample(fill: u8) -> RgbaImage {
        RgbaImage::from_pixel(12, 9, Rgba([fill, fill, fill, 255]))
    }

    #[test]
    fn memory_store_deduplicates_by_content() {
        let store = MemoryOverlayStore::new();
        let first = store.put(&sample(10)).unwrap();
        let again = store.put(&sample(10)).unwrap();
        let other = store.put(&sample(200)).unwrap();

        assert_eq!(first.key, again.key);
        assert_ne!(first.key, other.key);
        assert_eq!(first.key.len(), 64);
        assert_eq!((first.width, first.height), (12, 9));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn memory_store_round_trips_png() {
        let store = MemoryOverlayStore::new();
        let handle = store.put(&sample(77)).unwrap();
        let png = store.get(&handle.key).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded, sample(77));
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn directory_store_writes_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryOverlayStore::new(dir.path().join("overlays")).unwrap();

        let handle = store.put(&sample(5)).unwrap();
        let location = handle.location.clone().unwrap();

        assert_eq!(location.parent(), Some(store.root()));

        assert!(location.exists());
        assert_eq!(
            location.file_name().unwrap().to_string_lossy(),
            format!("{}.png", handle.key)
        );
        assert_eq!(std::fs::read(&location).unwrap(), encode_png(&sample(5)).unwrap());
    }
}
