pub mod change;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod local;
pub mod lrc;
pub mod lyrics;
pub mod paths;
pub mod playback;
pub mod provider;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod time;
pub mod view_model;

pub use change::{Change, ChangeDetector, ChangeSet};
pub use config::{
    build_config_template, LoggingConfig, LyricsConfig, ProvidersConfig, SyncConfig,
    TunesyncConfig,
};
pub use cursor::{LyricCursor, LyricView};
pub use engine::{EngineHandle, EngineState, PlaybackSyncEngine};
pub use error::{CoreError, Result};
pub use local::LocalLyricsStorage;
pub use lrc::{parse_synced, ParsedLyrics};
pub use lyrics::{LyricDocument, LyricLine, LyricProvenance, TrackKey};
pub use paths::{
    config_dir, config_path, log_file_path, lyrics_dir, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    LOG_FILE_NAME, LYRICS_DIR_NAME,
};
pub use playback::{PlaybackSnapshot, ARTIST_SEPARATOR};
pub use provider::{LyricsProvider, LyricsQuery};
pub use scheduler::{IntervalScheduler, ManualScheduler, ManualTicker, Scheduler, Tick};
pub use source::{PlaybackCommand, PlaybackSource, MAX_VOLUME};
pub use store::{LyricFetcher, LyricStore};
pub use time::DurationExt;
pub use view_model::{BroadcastSink, Field, FieldUpdate, FieldValue, ViewModel, ViewModelSink};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
