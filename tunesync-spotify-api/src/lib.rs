pub mod auth;
pub mod config;
pub mod error;
pub mod paths;
pub mod source;

pub use auth::SpotifyAuth;
pub use config::{SpotifyProviderConfig, CONFIG_TEMPLATE as SPOTIFY_CONFIG_TEMPLATE};
pub use error::SpotifyError;
pub use paths::SPOTIFY_TOKEN_CACHE_FILE_NAME;
pub use source::SpotifyPlaybackSource;
