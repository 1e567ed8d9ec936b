//! Spotify client with a file-cached OAuth token.
//!
//! The token cache is read at startup and rewritten after every refresh.
//! Obtaining the first token is left to external tooling.

use crate::error::SpotifyError;
use rspotify::{prelude::*, scopes, AuthCodeSpotify, Credentials, OAuth, Token};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Refresh token proactively if it expires within this many seconds
const PROACTIVE_REFRESH_THRESHOLD_SECS: i64 = 60;

/// Persisted token data
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>, // Unix timestamp
    scopes: Vec<String>,
}

impl From<&Token> for PersistedToken {
    fn from(token: &Token) -> Self {
        Self {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token.expires_at.map(|d| d.timestamp()),
            scopes: token.scopes.iter().cloned().collect(),
        }
    }
}

impl From<PersistedToken> for Token {
    fn from(persisted: PersistedToken) -> Self {
        Self {
            access_token: persisted.access_token,
            refresh_token: persisted.refresh_token,
            expires_at: persisted
                .expires_at
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            expires_in: chrono::TimeDelta::zero(),
            scopes: persisted.scopes.into_iter().collect(),
        }
    }
}

/// Authenticated Spotify Web API client
pub struct SpotifyAuth {
    client: AuthCodeSpotify,
    token_path: PathBuf,
}

impl SpotifyAuth {
    /// Create a client using the default token cache location
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self::with_token_path(
            client_id,
            client_secret,
            redirect_uri,
            crate::paths::spotify_token_cache_path(),
        )
    }

    /// Create a client that caches its token at `token_path`
    pub fn with_token_path(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        token_path: impl Into<PathBuf>,
    ) -> Self {
        let creds = Credentials::new(&client_id.into(), &client_secret.into());

        let oauth = OAuth {
            redirect_uri: redirect_uri.into(),
            scopes: scopes!(
                "user-read-currently-playing",
                "user-read-playback-state",
                "user-modify-playback-state"
            ),
            ..Default::default()
        };

        Self {
            client: AuthCodeSpotify::new(creds, oauth),
            token_path: token_path.into(),
        }
    }

    #[must_use]
    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Acquire lock on token.
    async fn lock_token(
        &self,
    ) -> Result<futures::lock::MutexGuard<'_, Option<Token>>, SpotifyError> {
        self.client
            .token
            .lock()
            .await
            .map_err(|_| SpotifyError::AuthFailed {
                reason: "Failed to acquire token lock".to_string(),
            })
    }

    /// Try to load cached token
    ///
    /// Returns `Ok(false)` when there is no usable cached token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token file cannot be read, parsed, or the token cannot be refreshed.
    pub async fn load_cached_token(&self) -> Result<bool, SpotifyError> {
        if !self.token_path.exists() {
            info!("No cached token file found at {:?}", self.token_path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.token_path)?;
        let persisted: PersistedToken = serde_json::from_str(&content)?;
        let token = Token::from(persisted);

        if token.is_expired() {
            if token.refresh_token.is_some() {
                info!("Cached token is expired but has refresh token, attempting refresh...");
                *self.lock_token().await? = Some(token);
                return self.refresh_token().await.map(|()| true);
            }
            info!("Cached token is expired and has no refresh token");
            return Ok(false);
        }

        *self.lock_token().await? = Some(token);
        info!("Loaded valid cached Spotify token");
        Ok(true)
    }

    /// Load the cached token or fail with a message telling the user where it
    /// is expected.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` if no usable token is cached, or any error
    /// from loading it.
    pub async fn ensure_authenticated(&self) -> Result<(), SpotifyError> {
        info!("Checking for cached Spotify token...");
        if self.load_cached_token().await? {
            return Ok(());
        }
        Err(SpotifyError::NotAuthenticated {
            path: self.token_path.clone(),
        })
    }

    /// Save current token to file
    async fn save_token(&self) -> Result<(), SpotifyError> {
        let token_guard = self.lock_token().await?;
        if let Some(ref token) = *token_guard {
            let persisted = PersistedToken::from(token);

            if let Some(parent) = self.token_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let content = serde_json::to_string_pretty(&persisted)?;
            fs::write(&self.token_path, content)?;
            debug!("Saved Spotify token to {:?}", self.token_path);
        }
        Ok(())
    }

    /// Refresh the access token
    ///
    /// # Errors
    ///
    /// Returns an error if the token refresh fails or the token cannot be saved.
    pub async fn refresh_token(&self) -> Result<(), SpotifyError> {
        info!("Refreshing Spotify access token");

        self.client
            .refresh_token()
            .await
            .map_err(|e| SpotifyError::AuthFailed {
                reason: format!("Token refresh failed: {e}"),
            })?;

        self.save_token().await?;
        Ok(())
    }

    /// Proactively refresh the token if it will expire soon (within 60 seconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the token refresh fails.
    pub async fn ensure_token_fresh(&self) -> Result<(), SpotifyError> {
        let needs_refresh = {
            let token_guard = self.lock_token().await?;
            needs_refresh(token_guard.as_ref(), chrono::Utc::now())
        };

        if needs_refresh {
            self.refresh_token().await?;
        }

        Ok(())
    }

    /// Get the underlying Spotify client
    #[must_use]
    pub const fn client(&self) -> &AuthCodeSpotify {
        &self.client
    }
}

/// Check if token needs refresh (expires within threshold).
fn needs_refresh(token: Option<&Token>, now: chrono::DateTime<chrono::Utc>) -> bool {
    let Some(token) = token else {
        warn!("No token available for proactive refresh check");
        return false;
    };

    let Some(expires_at) = token.expires_at else {
        // No expiration time, assume it's fine
        return false;
    };

    let seconds_until_expiry = (expires_at - now).num_seconds();
    if seconds_until_expiry <= PROACTIVE_REFRESH_THRESHOLD_SECS {
        debug!(
            "Token expires in {}s (threshold: {}s), refreshing proactively",
            seconds_until_expiry, PROACTIVE_REFRESH_THRESHOLD_SECS
        );
        true
    } else {
        false
    }
}
