use crate::error::CoreError;
use async_trait::async_trait;

/// Query parameters for fetching lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsQuery {
    /// Track name
    pub track_name: String,
    /// Artist name
    pub artist_name: String,
    /// Track duration in seconds (for matching)
    pub duration_secs: Option<u32>,
}

impl LyricsQuery {
    /// Create a new lyrics query
    pub fn new(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            duration_secs: None,
        }
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}

/// Remote source of synced lyric text.
///
/// Implementations return the raw timestamped text (one `[mm:ss.xx]text`
/// entry per line) or `None` when the provider has nothing for the query.
/// Parsing is the store's job, so providers stay thin HTTP adapters.
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Search for synced lyrics
    async fn search(&self, query: &LyricsQuery) -> Result<Option<String>, CoreError>;
}
