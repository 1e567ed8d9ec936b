//! File-backed lyric persistence: one JSON file per track.

use crate::error::Result;
use crate::lyrics::{LyricDocument, TrackKey};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Local lyric storage keyed by normalized `"artist - title"`.
#[derive(Debug, Clone)]
pub struct LocalLyricsStorage {
    dir: PathBuf,
}

impl LocalLyricsStorage {
    /// Storage rooted at `dir`. The directory is created lazily on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage in the default location (`~/.config/tunesync/lyrics/`)
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(crate::paths::lyrics_dir())
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path that holds the document for `key`
    #[must_use]
    pub fn path_for(&self, key: &TrackKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Load the stored document for `key`.
    ///
    /// Returns `Ok(None)` when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self, key: &TrackKey) -> Result<Option<LyricDocument>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!("No local lyrics at {:?}", path);
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let document: LyricDocument = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} local lyric lines for {} from {:?}",
            document.lines.len(),
            key,
            path
        );
        Ok(Some(document))
    }

    /// Write `document` to its file, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written.
    pub fn save(&self, document: &LyricDocument) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(&document.track_key);
        let content = serde_json::to_string_pretty(document)?;
        fs::write(&path, content)?;

        info!("Saved lyrics for {} to {:?}", document.track_key, path);
        Ok(path)
    }
}
