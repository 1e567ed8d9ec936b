use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};
use tunesync_core::{CoreError, LyricsProvider, LyricsQuery};

const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Duration tolerance for matching (±2 seconds)
const DURATION_TOLERANCE_SECS: f64 = 2.0;

/// Calculate a score for duration matching (lower is better).
/// Returns 0 for exact matches, higher values for larger differences.
/// Capped at `i32::MAX` to prevent overflow.
fn duration_score(actual: Option<f64>, expected: Option<u32>, scale: f64) -> i32 {
    match (actual, expected) {
        (Some(d), Some(q)) => {
            let diff = (d - f64::from(q)).abs() * scale;
            #[allow(clippy::cast_possible_truncation)]
            if diff > f64::from(i32::MAX) {
                i32::MAX
            } else {
                diff as i32
            }
        }
        _ => 50, // Default score when duration is unknown
    }
}

/// LRCLIB.net synced lyrics provider
pub struct LrclibProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl LrclibProvider {
    /// Create a new LRCLIB provider with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_base_url(LRCLIB_API_URL)
    }

    /// Same as [`new`](Self::new) against a different API root (mirrors, tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("tunesync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Response from LRCLIB API
/// Note: API returns additional fields (trackName, albumName) that we don't use;
/// serde ignores unknown fields by default.
#[derive(Debug, Deserialize)]
struct LrclibResponse {
    id: i64,
    #[serde(rename = "artistName")]
    artist_name: String,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

impl LrclibResponse {
    /// Synced lyric text, if this record has any worth using
    fn synced(&self) -> Option<&str> {
        if self.instrumental {
            return None;
        }
        self.synced_lyrics
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    fn into_synced(self) -> Option<String> {
        if self.synced().is_none() {
            debug!("LRCLIB record {} has no synced lyrics", self.id);
            return None;
        }
        self.synced_lyrics
    }
}

/// Best record with synced lyrics, by closest duration
fn best_synced(
    results: Vec<LrclibResponse>,
    duration_secs: Option<u32>,
    scale: f64,
) -> Option<LrclibResponse> {
    results
        .into_iter()
        .filter(|r| r.synced().is_some())
        .min_by_key(|r| duration_score(r.duration, duration_secs, scale))
}

/// Keep only records within the duration tolerance of `duration_secs`
fn within_duration(results: Vec<LrclibResponse>, duration_secs: Option<u32>) -> Vec<LrclibResponse> {
    let Some(expected) = duration_secs else {
        return results;
    };
    let expected = f64::from(expected);
    results
        .into_iter()
        .filter(|r| {
            r.duration
                .is_some_and(|d| (d - expected).abs() <= DURATION_TOLERANCE_SECS)
        })
        .collect()
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn search(&self, query: &LyricsQuery) -> Result<Option<String>, CoreError> {
        info!(
            "Fetching lyrics from LRCLIB for: {} - {} (duration: {:?}s)",
            query.artist_name, query.track_name, query.duration_secs
        );

        if let Some(exact) = self.get_exact(query).await? {
            info!("LRCLIB found exact match with id: {}", exact.id);
            if let Some(synced) = exact.into_synced() {
                return Ok(Some(synced));
            }
        }

        if let Some(synced) = self.search_by_track_name(query).await? {
            return Ok(Some(synced));
        }

        self.search_fallback(query).await
    }
}

impl LrclibProvider {
    /// `/get` exact match on artist + track (+ duration). `None` on 404.
    async fn get_exact(&self, query: &LyricsQuery) -> Result<Option<LrclibResponse>, CoreError> {
        let mut url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(&query.artist_name),
            urlencoding::encode(&query.track_name)
        );
        if let Some(duration) = query.duration_secs {
            let _ = write!(url, "&duration={duration}");
        }

        debug!("LRCLIB GET (exact match): {}", url);
        let response = self.client.get(&url).send().await?;
        debug!("LRCLIB response status: {}", response.status());

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!("LRCLIB exact match not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            warn!("LRCLIB returned status: {}", response.status());
            return Err(CoreError::LyricsProviderFailed {
                provider: self.name().to_string(),
                reason: format!("LRCLIB returned status: {}", response.status()),
            });
        }

        Ok(Some(response.json().await?))
    }

    /// Search by track name only and match duration within ±2 seconds
    async fn search_by_track_name(&self, query: &LyricsQuery) -> Result<Option<String>, CoreError> {
        let url = format!(
            "{}/search?track_name={}",
            self.base_url,
            urlencoding::encode(&query.track_name)
        );

        debug!("LRCLIB GET (search by track): {}", url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            warn!("LRCLIB search returned status: {}", response.status());
            return Ok(None);
        }

        let results: Vec<LrclibResponse> = response.json().await?;
        let filtered = within_duration(results, query.duration_secs);

        match best_synced(filtered, query.duration_secs, 10.0) {
            Some(result) => {
                info!(
                    "LRCLIB found match by track name + duration (id: {}, artist: {}, duration: {:?})",
                    result.id, result.artist_name, result.duration
                );
                Ok(result.into_synced())
            }
            None => {
                info!("LRCLIB search by track name: no synced lyrics within duration tolerance");
                Ok(None)
            }
        }
    }

    /// Free-text search on artist + track as the last resort
    async fn search_fallback(&self, query: &LyricsQuery) -> Result<Option<String>, CoreError> {
        let search_query = format!("{} {}", query.artist_name, query.track_name);
        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(&search_query)
        );

        debug!("LRCLIB GET (full search): {}", url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(CoreError::LyricsProviderFailed {
                provider: self.name().to_string(),
                reason: format!("LRCLIB search returned status: {}", response.status()),
            });
        }

        let results: Vec<LrclibResponse> = response.json().await?;
        match best_synced(results, query.duration_secs, 1.0) {
            Some(result) => {
                info!(
                    "LRCLIB found match via full search (id: {}, artist: {})",
                    result.id, result.artist_name
                );
                Ok(result.into_synced())
            }
            None => {
                info!("LRCLIB has no synced lyrics for {} - {}", query.artist_name, query.track_name);
                Ok(None)
            }
        }
    }
}
