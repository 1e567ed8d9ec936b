//! Spotify Web API as a [`PlaybackSource`].

use crate::auth::SpotifyAuth;
use crate::error::SpotifyError;
use async_trait::async_trait;
use rspotify::model::{CurrentPlaybackContext, PlayableItem, RepeatState};
use rspotify::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tunesync_core::{
    CoreError, DurationExt, PlaybackSnapshot, PlaybackSource, ARTIST_SEPARATOR,
};

/// Reads playback state from and sends control commands to Spotify.
pub struct SpotifyPlaybackSource {
    auth: Arc<SpotifyAuth>,
    device_id: Option<String>,
}

impl SpotifyPlaybackSource {
    /// `device_id` targets control commands at one device; `None` uses the
    /// active device.
    pub const fn new(auth: Arc<SpotifyAuth>, device_id: Option<String>) -> Self {
        Self { auth, device_id }
    }

    fn device(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Fetch the raw playback context, refreshing the token when needed.
    async fn playback_context(&self) -> Result<Option<CurrentPlaybackContext>, SpotifyError> {
        // Proactively refresh token if it expires within 60 seconds
        self.auth.ensure_token_fresh().await?;

        match self
            .auth
            .client()
            .current_playback(None, None::<Vec<_>>)
            .await
        {
            Ok(context) => Ok(context),
            Err(e) => {
                // Token may have been revoked or expired early
                if let Err(refresh_err) = self.auth.refresh_token().await {
                    warn!("Token refresh after API error failed: {}", refresh_err);
                }
                Err(e.into())
            }
        }
    }

    async fn current_snapshot(&self) -> Result<Option<PlaybackSnapshot>, SpotifyError> {
        let request_start = Instant::now();
        let context = self.playback_context().await?;
        let request_latency = request_start.elapsed();

        let snapshot = context.and_then(|context| snapshot_from_context(&context, request_latency / 2));
        debug!(
            "Polled Spotify: playing={:?}, track={:?}, progress={:?}ms",
            snapshot.as_ref().map(|s| s.is_playing),
            snapshot.as_ref().map(|s| s.title.as_str()),
            snapshot.as_ref().map(|s| s.progress_ms)
        );
        Ok(snapshot)
    }

    async fn toggle_repeat_state(&self) -> Result<(), SpotifyError> {
        let context = self
            .playback_context()
            .await?
            .ok_or(SpotifyError::NoActivePlayback)?;
        let next = next_repeat_state(context.repeat_state);
        self.auth.client().repeat(next, self.device()).await?;
        info!("Repeat mode set to {:?}", next);
        Ok(())
    }
}

/// Repeat-track toggle: anything but track repeat becomes track repeat
const fn next_repeat_state(current: RepeatState) -> RepeatState {
    match current {
        RepeatState::Track => RepeatState::Off,
        RepeatState::Off | RepeatState::Context => RepeatState::Track,
    }
}

/// Build a snapshot from a playback context.
///
/// `latency_compensation` is added to the reported progress, assuming the
/// position was sampled halfway through the request. Returns `None` when no
/// item is loaded.
fn snapshot_from_context(
    context: &CurrentPlaybackContext,
    latency_compensation: Duration,
) -> Option<PlaybackSnapshot> {
    let progress = context
        .progress
        .and_then(|p| p.to_std().ok())
        .map_or(Duration::ZERO, |p| p + latency_compensation);

    let snapshot = match context.item.as_ref()? {
        PlayableItem::Track(track) => {
            let artists = track
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(ARTIST_SEPARATOR);
            // Use just the ID part, not the full URI (spotify:track:xxx -> xxx)
            let track_id = track
                .id
                .as_ref()
                .map_or_else(|| track.name.clone(), |id| id.id().to_string());
            let duration = track.duration.to_std().unwrap_or(Duration::ZERO);

            let mut snapshot = PlaybackSnapshot::new(
                track_id,
                context.is_playing,
                progress.as_millis_u64(),
                duration.as_millis_u64(),
            )
            .with_track(track.name.clone(), artists);
            if let Some(primary) = track.artists.first() {
                snapshot = snapshot.with_primary_artist(primary.name.clone());
            }
            if let Some(release_date) = &track.album.release_date {
                snapshot = snapshot.with_release_date(release_date);
            }
            if let Some(image) = track.album.images.first() {
                snapshot = snapshot.with_cover_url(image.url.clone());
            }
            snapshot
        }
        PlayableItem::Episode(episode) => {
            let duration = episode.duration.to_std().unwrap_or(Duration::ZERO);
            let mut snapshot = PlaybackSnapshot::new(
                episode.id.id().to_string(),
                context.is_playing,
                progress.as_millis_u64(),
                duration.as_millis_u64(),
            )
            .with_track(episode.name.clone(), episode.show.name.clone())
            .with_release_date(&episode.release_date);
            if let Some(image) = episode.images.first() {
                snapshot = snapshot.with_cover_url(image.url.clone());
            }
            snapshot
        }
    };

    Some(snapshot)
}

#[async_trait]
impl PlaybackSource for SpotifyPlaybackSource {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn current_playback(&self) -> Result<Option<PlaybackSnapshot>, CoreError> {
        Ok(self.current_snapshot().await?)
    }

    async fn pause(&self) -> Result<(), CoreError> {
        self.auth
            .client()
            .pause_playback(self.device())
            .await
            .map_err(SpotifyError::from)?;
        Ok(())
    }

    async fn resume(&self) -> Result<(), CoreError> {
        self.auth
            .client()
            .resume_playback(self.device(), None)
            .await
            .map_err(SpotifyError::from)?;
        Ok(())
    }

    async fn next(&self) -> Result<(), CoreError> {
        self.auth
            .client()
            .next_track(self.device())
            .await
            .map_err(SpotifyError::from)?;
        Ok(())
    }

    async fn previous(&self) -> Result<(), CoreError> {
        self.auth
            .client()
            .previous_track(self.device())
            .await
            .map_err(SpotifyError::from)?;
        Ok(())
    }

    async fn set_shuffle(&self, enabled: bool) -> Result<(), CoreError> {
        self.auth
            .client()
            .shuffle(enabled, self.device())
            .await
            .map_err(SpotifyError::from)?;
        Ok(())
    }

    async fn set_volume(&self, percent: u8) -> Result<(), CoreError> {
        self.auth
            .client()
            .volume(percent, self.device())
            .await
            .map_err(SpotifyError::from)?;
        Ok(())
    }

    async fn toggle_repeat(&self) -> Result<(), CoreError> {
        Ok(self.toggle_repeat_state().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn artist(name: &str) -> Value {
        json!({
            "external_urls": {},
            "href": null,
            "id": null,
            "name": name
        })
    }

    fn track(id: Option<&str>, name: &str, artists: &[&str], release_date: Option<&str>) -> Value {
        json!({
            "album": {
                "album_type": "album",
                "artists": [],
                "available_markets": [],
                "external_urls": {},
                "href": null,
                "id": null,
                "images": [
                    { "height": 640, "url": "https://i.scdn.co/image/large", "width": 640 },
                    { "height": 64, "url": "https://i.scdn.co/image/small", "width": 64 }
                ],
                "name": "Album",
                "release_date": release_date,
                "release_date_precision": "day"
            },
            "artists": artists.iter().copied().map(artist).collect::<Vec<_>>(),
            "available_markets": [],
            "disc_number": 1,
            "duration_ms": 200_000,
            "explicit": false,
            "external_ids": {},
            "external_urls": {},
            "href": null,
            "id": id,
            "is_local": id.is_none(),
            "name": name,
            "popularity": 0,
            "preview_url": null,
            "track_number": 1
        })
    }

    fn episode() -> Value {
        json!({
            "audio_preview_url": null,
            "description": "An episode",
            "duration_ms": 1_800_000,
            "explicit": false,
            "external_urls": {},
            "href": "https://api.spotify.com/v1/episodes/512ojhOuo1ktJprKbVcKyQ",
            "id": "512ojhOuo1ktJprKbVcKyQ",
            "images": [{ "height": 300, "url": "https://i.scdn.co/image/episode", "width": 300 }],
            "is_externally_hosted": false,
            "is_playable": true,
            "language": "en",
            "languages": ["en"],
            "name": "Episode 12",
            "release_date": "2021-06-15",
            "release_date_precision": "day",
            "resume_point": null,
            "show": {
                "available_markets": [],
                "copyrights": [],
                "description": "A show",
                "explicit": false,
                "external_urls": {},
                "href": "https://api.spotify.com/v1/shows/38bS44xjbVVZ3No3ByF1dJ",
                "id": "38bS44xjbVVZ3No3ByF1dJ",
                "images": [],
                "is_externally_hosted": null,
                "languages": ["en"],
                "media_type": "audio",
                "name": "The Show",
                "publisher": "Publisher"
            }
        })
    }

    fn context(item: Option<Value>, is_playing: bool, progress_ms: u64) -> CurrentPlaybackContext {
        let playing_type = match &item {
            Some(item) if item.get("show").is_some() => "episode",
            Some(_) => "track",
            None => "unknown",
        };
        serde_json::from_value(json!({
            "device": {
                "id": "device-1",
                "is_active": true,
                "is_private_session": false,
                "is_restricted": false,
                "name": "Desktop",
                "type": "Computer",
                "volume_percent": 50
            },
            "repeat_state": "off",
            "shuffle_state": false,
            "context": null,
            "timestamp": 1_700_000_000_000_i64,
            "progress_ms": progress_ms,
            "is_playing": is_playing,
            "item": item,
            "currently_playing_type": playing_type,
            "actions": { "disallows": {} }
        }))
        .unwrap()
    }

    #[test]
    fn test_track_snapshot_fields() {
        let item = track(
            Some("4uLU6hMCjMI75M1A2tKUQC"),
            "See You Again",
            &["Tyler, The Creator", "Kali Uchis"],
            Some("2017-07-21"),
        );
        let snapshot = snapshot_from_context(&context(Some(item), true, 30_000), Duration::ZERO).unwrap();

        assert_eq!(snapshot.track_id.as_deref(), Some("4uLU6hMCjMI75M1A2tKUQC"));
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.progress_ms, 30_000);
        assert_eq!(snapshot.duration_ms, 200_000);
        assert_eq!(snapshot.title, "See You Again");
        assert_eq!(snapshot.artist, "Tyler, The Creator, Kali Uchis");
        assert_eq!(snapshot.primary_artist(), "Tyler, The Creator");
        assert_eq!(snapshot.release_year, "2017");
        assert_eq!(snapshot.cover_url, "https://i.scdn.co/image/large");
    }

    #[test]
    fn test_progress_includes_latency_compensation() {
        let item = track(Some("4uLU6hMCjMI75M1A2tKUQC"), "Song", &["Artist"], None);
        let ctx = context(Some(item), false, 10_000);

        let snapshot = snapshot_from_context(&ctx, Duration::from_millis(150)).unwrap();
        assert_eq!(snapshot.progress_ms, 10_150);
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.release_year, "");
    }

    #[test]
    fn test_local_file_falls_back_to_name_for_id() {
        let item = track(None, "Home Recording", &["Me"], Some("2020"));
        let snapshot = snapshot_from_context(&context(Some(item), true, 0), Duration::ZERO).unwrap();

        assert_eq!(snapshot.track_id.as_deref(), Some("Home Recording"));
        assert_eq!(snapshot.primary_artist(), "Me");
        assert_eq!(snapshot.release_year, "2020");
    }

    #[test]
    fn test_episode_snapshot_fields() {
        let snapshot = snapshot_from_context(&context(Some(episode()), true, 60_000), Duration::ZERO).unwrap();

        assert_eq!(snapshot.track_id.as_deref(), Some("512ojhOuo1ktJprKbVcKyQ"));
        assert_eq!(snapshot.title, "Episode 12");
        assert_eq!(snapshot.artist, "The Show");
        assert_eq!(snapshot.primary_artist(), "The Show");
        assert_eq!(snapshot.duration_ms, 1_800_000);
        assert_eq!(snapshot.release_year, "2021");
        assert_eq!(snapshot.cover_url, "https://i.scdn.co/image/episode");
    }

    #[test]
    fn test_no_item_is_no_snapshot() {
        assert!(snapshot_from_context(&context(None, false, 0), Duration::ZERO).is_none());
    }

    #[test]
    fn test_repeat_toggle() {
        assert_eq!(next_repeat_state(RepeatState::Off), RepeatState::Track);
        assert_eq!(next_repeat_state(RepeatState::Context), RepeatState::Track);
        assert_eq!(next_repeat_state(RepeatState::Track), RepeatState::Off);
    }

    #[test]
    fn test_source_name() {
        let auth = Arc::new(SpotifyAuth::with_token_path(
            "id",
            "secret",
            "http://127.0.0.1:8888/callback",
            "/nonexistent/token.json",
        ));
        let source = SpotifyPlaybackSource::new(auth, Some("device".to_string()));
        assert_eq!(source.name(), "spotify");
        assert_eq!(source.device(), Some("device"));
    }
}
