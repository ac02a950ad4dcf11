//! Snapshot storage collaborators.
//!
//! The editor only needs to save and load one slide snapshot at a time.
//! [`MemoryStore`] keeps snapshots in process; [`FileStore`] writes one JSON
//! file per slide under a data directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use deck_core::{DeckError, SlideSnapshot};

/// Errors raised by snapshot stores.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A snapshot could not be serialized or parsed.
    #[error(transparent)]
    Serialization(#[from] DeckError),
    /// The backend refused the write.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for per-slide snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load a slide's snapshot, or `None` if it was never saved.
    async fn load(
        &self,
        presentation_id: &str,
        slide_index: usize,
    ) -> Result<Option<SlideSnapshot>, PersistenceError>;

    /// Replace a slide's snapshot.
    async fn save(
        &self,
        presentation_id: &str,
        slide_index: usize,
        snapshot: &SlideSnapshot,
    ) -> Result<(), PersistenceError>;
}

/// In-process store. Clones of the snapshots are kept per slide.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slides: RwLock<HashMap<(String, usize), SlideSnapshot>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current snapshot of a slide.
    #[must_use]
    pub fn get(&self, presentation_id: &str, slide_index: usize) -> Option<SlideSnapshot> {
        self.slides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(presentation_id.to_string(), slide_index))
            .cloned()
    }

    /// Seed a slide's snapshot without counting it as a save.
    pub fn insert(&self, presentation_id: &str, slide_index: usize, snapshot: SlideSnapshot) {
        self.slides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((presentation_id.to_string(), slide_index), snapshot);
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(
        &self,
        presentation_id: &str,
        slide_index: usize,
    ) -> Result<Option<SlideSnapshot>, PersistenceError> {
        Ok(self.get(presentation_id, slide_index))
    }

    async fn save(
        &self,
        presentation_id: &str,
        slide_index: usize,
        snapshot: &SlideSnapshot,
    ) -> Result<(), PersistenceError> {
        self.insert(presentation_id, slide_index, snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One JSON file per slide: `<data_dir>/<presentation>/slide-<n>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `data_dir`. The directory is created if it
    /// doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the directory cannot be created.
    pub async fn new(data_dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        Ok(Self { data_dir })
    }

    /// Root directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn slide_path(&self, presentation_id: &str, slide_index: usize) -> PathBuf {
        self.data_dir
            .join(sanitize_filename(presentation_id))
            .join(format!("slide-{slide_index}.json"))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn load(
        &self,
        presentation_id: &str,
        slide_index: usize,
    ) -> Result<Option<SlideSnapshot>, PersistenceError> {
        let path = self.slide_path(presentation_id, slide_index);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(SlideSnapshot::from_json(&contents)?))
    }

    async fn save(
        &self,
        presentation_id: &str,
        slide_index: usize,
        snapshot: &SlideSnapshot,
    ) -> Result<(), PersistenceError> {
        let path = self.slide_path(presentation_id, slide_index);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = snapshot.to_json()?;
        // Write then rename so readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(path = %path.display(), "snapshot written");
        Ok(())
    }
}

/// Sanitize a presentation ID for use as a directory name.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(presentation_id: &str) -> String {
    let sanitized: String = presentation_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}
