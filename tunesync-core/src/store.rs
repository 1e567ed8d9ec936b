//! In-memory lyric cache with remote provider and local fallback.

use crate::error::{CoreError, Result};
use crate::local::LocalLyricsStorage;
use crate::lrc;
use crate::lyrics::{LyricDocument, LyricProvenance, TrackKey};
use crate::provider::{LyricsProvider, LyricsQuery};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves a lyric document from the remote providers and local storage.
///
/// Holds no cache of its own and is cheap to clone, so the sync engine can
/// move a copy into a background task while the [`LyricStore`] stays on the
/// engine's task.
#[derive(Clone)]
pub struct LyricFetcher {
    providers: Vec<Arc<dyn LyricsProvider>>,
    local: LocalLyricsStorage,
}

impl LyricFetcher {
    /// Create a fetcher that tries `providers` in order, then `local`
    pub fn new(providers: Vec<Arc<dyn LyricsProvider>>, local: LocalLyricsStorage) -> Self {
        Self { providers, local }
    }

    #[must_use]
    pub const fn local(&self) -> &LocalLyricsStorage {
        &self.local
    }

    /// Fetch lyrics for `key`: remote providers first, then local storage.
    ///
    /// Never fails. Network and parse errors are logged and treated as a
    /// miss; a total miss yields an empty document with provenance `None`.
    pub async fn fetch(&self, key: &TrackKey, query: &LyricsQuery) -> LyricDocument {
        if let Some(document) = self.fetch_remote(key, query).await {
            return document;
        }

        match self.local.load(key) {
            Ok(Some(stored)) if !stored.is_empty() => {
                info!("Using local lyrics for {} ({} lines)", key, stored.lines.len());
                return LyricDocument::new(key.clone(), stored.lines, LyricProvenance::Local);
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to load local lyrics for {}: {}", key, e),
        }

        info!("No lyrics found for {}", key);
        LyricDocument::empty(key.clone())
    }

    async fn fetch_remote(&self, key: &TrackKey, query: &LyricsQuery) -> Option<LyricDocument> {
        for provider in &self.providers {
            debug!("Trying provider {} for {}", provider.name(), key);

            let raw = match provider.search(query).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    info!("Provider {} returned no lyrics", provider.name());
                    continue;
                }
                Err(e) => {
                    warn!("Provider {} failed with error: {}", provider.name(), e);
                    continue;
                }
            };

            let parsed = lrc::parse_synced(&raw);
            if parsed.skipped > 0 {
                debug!(
                    "Skipped {} unparseable lines from {}",
                    parsed.skipped,
                    provider.name()
                );
            }
            if parsed.is_empty() {
                warn!(
                    "Provider {} returned lyrics with no parseable lines",
                    provider.name()
                );
                continue;
            }

            info!(
                "Found synced lyrics from {} ({} lines)",
                provider.name(),
                parsed.lines.len()
            );
            return Some(LyricDocument::new(
                key.clone(),
                parsed.lines,
                LyricProvenance::Remote,
            ));
        }
        None
    }
}

/// Time-indexed lyric documents keyed by track, cached for the process lifetime.
///
/// Entries are never evicted automatically. Misses are cached as empty
/// documents so a track without lyrics is only looked up once per session.
pub struct LyricStore {
    cache: HashMap<TrackKey, Arc<LyricDocument>>,
    fetcher: LyricFetcher,
}

impl LyricStore {
    pub fn new(providers: Vec<Arc<dyn LyricsProvider>>, local: LocalLyricsStorage) -> Self {
        Self {
            cache: HashMap::new(),
            fetcher: LyricFetcher::new(providers, local),
        }
    }

    /// Get the lyric document for a track, fetching it on a cache miss.
    pub async fn get(&mut self, key: &TrackKey, artist: &str, title: &str) -> Arc<LyricDocument> {
        self.get_with_query(key, &LyricsQuery::new(title, artist))
            .await
    }

    /// Like [`get`](Self::get) with a fully specified provider query.
    pub async fn get_with_query(
        &mut self,
        key: &TrackKey,
        query: &LyricsQuery,
    ) -> Arc<LyricDocument> {
        if let Some(cached) = self.cached(key) {
            debug!("Lyrics cache hit for {}", key);
            return cached;
        }

        let document = self.fetcher.fetch(key, query).await;
        self.insert(document)
    }

    /// Cached document for `key`, without fetching
    #[must_use]
    pub fn cached(&self, key: &TrackKey) -> Option<Arc<LyricDocument>> {
        self.cache.get(key).cloned()
    }

    /// Insert a document fetched elsewhere, replacing any previous entry.
    pub fn insert(&mut self, document: LyricDocument) -> Arc<LyricDocument> {
        let document = Arc::new(document);
        self.cache
            .insert(document.track_key.clone(), Arc::clone(&document));
        document
    }

    /// Drop the cached entry for `key`. Returns whether one existed.
    pub fn evict(&mut self, key: &TrackKey) -> bool {
        self.cache.remove(key).is_some()
    }

    /// Clone of the fetcher, for running lookups off the engine task
    #[must_use]
    pub fn fetcher(&self) -> LyricFetcher {
        self.fetcher.clone()
    }

    /// Write the cached document for `key` to local storage.
    ///
    /// # Errors
    ///
    /// Returns `LyricsNotFound` if nothing with lines is cached for `key`, or
    /// an I/O error if the file cannot be written.
    pub fn persist(&self, key: &TrackKey) -> Result<PathBuf> {
        let document = self
            .cache
            .get(key)
            .filter(|document| !document.is_empty())
            .ok_or_else(|| CoreError::LyricsNotFound {
                track: key.to_string(),
                artist: String::new(),
            })?;
        self.fetcher.local.save(document)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::LyricLine;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProvider {
        response: std::result::Result<Option<String>, String>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn returning(text: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.map(str::to_string)),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err("connection reset".to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LyricsProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn search(&self, _query: &LyricsQuery) -> std::result::Result<Option<String>, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .map_err(|reason| CoreError::LyricsProviderFailed {
                    provider: "fake".to_string(),
                    reason,
                })
        }
    }

    fn store_with(provider: Arc<FakeProvider>, dir: &std::path::Path) -> LyricStore {
        LyricStore::new(vec![provider as Arc<dyn LyricsProvider>], LocalLyricsStorage::new(dir))
    }

    #[tokio::test]
    async fn test_remote_fetch_then_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::returning(Some("[00:00.00]A\n[00:01.00]B"));
        let mut store = store_with(Arc::clone(&provider), dir.path());
        let key = TrackKey::new("Artist", "Title");

        let first = store.get(&key, "Artist", "Title").await;
        assert_eq!(first.provider, LyricProvenance::Remote);
        assert_eq!(first.lines.len(), 2);

        let second = store.get(&key, "Artist", "Title").await;
        assert_eq!(provider.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_total_miss_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::returning(None);
        let mut store = store_with(Arc::clone(&provider), dir.path());
        let key = TrackKey::new("Artist", "Title");

        let document = store.get(&key, "Artist", "Title").await;
        assert!(document.is_empty());
        assert_eq!(document.provider, LyricProvenance::None);

        store.get(&key, "Artist", "Title").await;
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let key = TrackKey::new("Artist", "Title");
        let local = LocalLyricsStorage::new(dir.path());
        local
            .save(&LyricDocument::new(
                key.clone(),
                vec![LyricLine::new(0, "Local line")],
                LyricProvenance::Remote,
            ))
            .unwrap();

        let mut store = store_with(FakeProvider::failing(), dir.path());
        let document = store.get(&key, "Artist", "Title").await;
        assert_eq!(document.provider, LyricProvenance::Local);
        assert_eq!(document.lines[0].text, "Local line");
    }

    #[tokio::test]
    async fn test_unparseable_remote_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let key = TrackKey::new("Artist", "Title");
        LocalLyricsStorage::new(dir.path())
            .save(&LyricDocument::new(
                key.clone(),
                vec![LyricLine::new(0, "Local line")],
                LyricProvenance::Remote,
            ))
            .unwrap();

        let mut store = store_with(FakeProvider::returning(Some("just plain text")), dir.path());
        let document = store.get(&key, "Artist", "Title").await;
        assert_eq!(document.provider, LyricProvenance::Local);
    }

    #[tokio::test]
    async fn test_evict_forces_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::returning(Some("[00:00.00]A"));
        let mut store = store_with(Arc::clone(&provider), dir.path());
        let key = TrackKey::new("Artist", "Title");

        store.get(&key, "Artist", "Title").await;
        assert!(store.evict(&key));
        store.get(&key, "Artist", "Title").await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_persist_writes_cached_document() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::returning(Some("[00:00.00]A"));
        let mut store = store_with(provider, dir.path());
        let key = TrackKey::new("Artist", "Title");

        store.get(&key, "Artist", "Title").await;
        let path = store.persist(&key).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_persist_rejects_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_with(FakeProvider::returning(None), dir.path());
        let key = TrackKey::new("Artist", "Title");

        store.get(&key, "Artist", "Title").await;
        assert!(matches!(
            store.persist(&key),
            Err(CoreError::LyricsNotFound { .. })
        ));
    }
}
