use crate::time::DurationExt;
use tokio::time::Instant;

/// Separator used by playback sources when joining several artist names.
pub const ARTIST_SEPARATOR: &str = ", ";

/// A single point-in-time read of playback state.
///
/// Snapshots are built fresh on every coarse poll and never mutated afterwards.
/// The sync engine keeps exactly one previous snapshot around for change
/// detection and position extrapolation.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    /// Opaque per-track identifier, `None` when nothing is playing
    pub track_id: Option<String>,
    /// Whether music is currently playing
    pub is_playing: bool,
    /// Elapsed position within the track in milliseconds
    pub progress_ms: u64,
    /// Total track length in milliseconds (0 when no track is loaded)
    pub duration_ms: u64,
    /// Track title, empty when unknown
    pub title: String,
    /// Display artist (all artists joined with [`ARTIST_SEPARATOR`]), empty when unknown
    pub artist: String,
    /// First credited artist as reported by the source, used for lyric lookups
    pub primary_artist: String,
    /// Four-digit release year, empty when unknown
    pub release_year: String,
    /// Cover art URL, empty when unknown
    pub cover_url: String,
    /// When this snapshot was read (for extrapolation)
    pub fetched_at: Instant,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

impl PlaybackSnapshot {
    /// Snapshot describing "nothing is playing".
    #[must_use]
    pub fn idle() -> Self {
        Self {
            track_id: None,
            is_playing: false,
            progress_ms: 0,
            duration_ms: 0,
            title: String::new(),
            artist: String::new(),
            primary_artist: String::new(),
            release_year: String::new(),
            cover_url: String::new(),
            fetched_at: Instant::now(),
        }
    }

    /// Create a snapshot for a loaded track.
    #[must_use]
    pub fn new(
        track_id: impl Into<String>,
        is_playing: bool,
        progress_ms: u64,
        duration_ms: u64,
    ) -> Self {
        Self {
            track_id: Some(track_id.into()),
            is_playing,
            progress_ms,
            duration_ms,
            ..Self::idle()
        }
    }

    /// Set title and display artist. The display artist doubles as the
    /// primary artist until [`with_primary_artist`](Self::with_primary_artist)
    /// overrides it.
    #[must_use]
    pub fn with_track(mut self, title: impl Into<String>, artist: impl Into<String>) -> Self {
        self.title = title.into();
        self.artist = artist.into();
        self.primary_artist.clone_from(&self.artist);
        self
    }

    /// Set the first credited artist when the display artist lists several
    #[must_use]
    pub fn with_primary_artist(mut self, artist: impl Into<String>) -> Self {
        self.primary_artist = artist.into();
        self
    }

    /// Set the release year from a release date such as `2019-03-01`.
    ///
    /// Only the leading four characters are kept; shorter values are ignored.
    #[must_use]
    pub fn with_release_date(mut self, release_date: &str) -> Self {
        self.release_year = release_date.get(..4).unwrap_or_default().to_string();
        self
    }

    /// Set the cover art URL
    #[must_use]
    pub fn with_cover_url(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = cover_url.into();
        self
    }

    /// Whether a track is loaded
    #[must_use]
    pub const fn has_track(&self) -> bool {
        self.track_id.is_some()
    }

    /// Artist used for lyric lookups
    #[must_use]
    pub fn primary_artist(&self) -> &str {
        self.primary_artist.trim()
    }

    /// Position extrapolated to `now`.
    ///
    /// While playing, the elapsed wall time since the snapshot was fetched is
    /// added to the reported progress and the result is clamped to the track
    /// duration. Paused snapshots report their progress unchanged.
    #[must_use]
    pub fn position_at(&self, now: Instant) -> u64 {
        if !self.is_playing {
            return self.progress_ms;
        }

        let elapsed = now.saturating_duration_since(self.fetched_at).as_millis_u64();
        let position = self.progress_ms.saturating_add(elapsed);

        if self.duration_ms > 0 {
            position.min(self.duration_ms)
        } else {
            position
        }
    }

    /// Playback progress as a raw fraction in `0.0..=1.0`.
    ///
    /// Returns `0.0` when no duration is known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_fraction(&self, position_ms: u64) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_idle_snapshot() {
        let snapshot = PlaybackSnapshot::idle();
        assert!(!snapshot.has_track());
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.progress_ms, 0);
        assert!(snapshot.title.is_empty());
        assert!(snapshot.cover_url.is_empty());
    }

    #[test]
    fn test_release_year_from_date() {
        let snapshot = PlaybackSnapshot::new("t1", true, 0, 1000).with_release_date("2019-03-01");
        assert_eq!(snapshot.release_year, "2019");

        let short = PlaybackSnapshot::new("t1", true, 0, 1000).with_release_date("19");
        assert_eq!(short.release_year, "");
    }

    #[test]
    fn test_primary_artist() {
        let snapshot = PlaybackSnapshot::new("t1", true, 0, 1000)
            .with_track("Song", "Daft Punk, Pharrell")
            .with_primary_artist("Daft Punk");
        assert_eq!(snapshot.primary_artist(), "Daft Punk");
        assert_eq!(snapshot.artist, "Daft Punk, Pharrell");

        let solo = PlaybackSnapshot::new("t1", true, 0, 1000).with_track("Song", "Solo");
        assert_eq!(solo.primary_artist(), "Solo");
    }

    #[test]
    fn test_primary_artist_with_separator_in_name() {
        let artists = ["Tyler, The Creator", "Kali Uchis"];
        let snapshot = PlaybackSnapshot::new("t1", true, 0, 1000)
            .with_track("See You Again", artists.join(ARTIST_SEPARATOR))
            .with_primary_artist(artists[0]);
        assert_eq!(snapshot.primary_artist(), "Tyler, The Creator");

        let solo = PlaybackSnapshot::new("t1", true, 0, 1000)
            .with_track("Boogie Wonderland", "Earth, Wind & Fire");
        assert_eq!(solo.primary_artist(), "Earth, Wind & Fire");
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_at_paused_does_not_advance() {
        let snapshot = PlaybackSnapshot::new("t1", false, 30_000, 180_000);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(snapshot.position_at(Instant::now()), 30_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_at_playing_advances() {
        let snapshot = PlaybackSnapshot::new("t1", true, 30_000, 180_000);
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(snapshot.position_at(Instant::now()), 31_500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_at_clamped_to_duration() {
        let snapshot = PlaybackSnapshot::new("t1", true, 178_000, 180_000);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(snapshot.position_at(Instant::now()), 180_000);
    }

    #[test]
    fn test_progress_fraction() {
        let snapshot = PlaybackSnapshot::new("t1", true, 0, 200_000);
        assert!((snapshot.progress_fraction(50_000) - 0.25).abs() < f64::EPSILON);
        assert!((snapshot.progress_fraction(400_000) - 1.0).abs() < f64::EPSILON);
        assert!(PlaybackSnapshot::idle().progress_fraction(10).abs() < f64::EPSILON);
    }
}
