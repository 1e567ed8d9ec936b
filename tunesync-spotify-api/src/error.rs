use std::path::PathBuf;
use thiserror::Error;
use tunesync_core::CoreError;

/// Unified error type for all Spotify-related operations.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// Token refresh or token handling failed.
    #[error("Spotify authentication failed: {reason}")]
    AuthFailed { reason: String },

    /// No usable cached token; interactive login is not part of this app.
    #[error("No valid Spotify token cached at {path}. Authorize once with a Spotify OAuth tool and place the token cache there.")]
    NotAuthenticated { path: PathBuf },

    /// No active Spotify playback on any device.
    #[error("Spotify playback not active on any device")]
    NoActivePlayback,

    /// Error from the Spotify API client.
    #[error("Spotify API error: {0}")]
    Api(#[from] rspotify::ClientError),

    /// Failed to read the token cache file or perform I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or serialize JSON data.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results with `SpotifyError`.
pub type Result<T> = std::result::Result<T, SpotifyError>;

impl From<SpotifyError> for CoreError {
    fn from(error: SpotifyError) -> Self {
        Self::PlaybackSourceFailed {
            source_name: "spotify".to_string(),
            reason: error.to_string(),
        }
    }
}
