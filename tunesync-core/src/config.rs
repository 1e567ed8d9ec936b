use crate::cursor::{DEFAULT_LOADING_TEXT, DEFAULT_NO_LYRICS_TEXT};
use crate::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunesyncConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-provider tables, interpreted by the provider crates
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Engine cadences and throttling windows, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Coarse cadence: how often the playback source is polled
    #[serde(default = "default_info_interval")]
    pub info_interval_ms: u64,
    /// Fine cadence: how often progress and lyrics are re-resolved
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
    /// Wait after an interaction ends before polling resumes
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Window in which repeated lyric requests for one track are coalesced
    #[serde(default = "default_reload_coalesce")]
    pub reload_coalesce_ms: u64,
    /// Upper bound on one lyric lookup across all providers
    #[serde(default = "default_lyrics_timeout")]
    pub lyrics_timeout_ms: u64,
}

const fn default_info_interval() -> u64 {
    1000
}

const fn default_progress_interval() -> u64 {
    100
}

const fn default_settle_delay() -> u64 {
    100
}

const fn default_reload_coalesce() -> u64 {
    100
}

const fn default_lyrics_timeout() -> u64 {
    15_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            info_interval_ms: default_info_interval(),
            progress_interval_ms: default_progress_interval(),
            settle_delay_ms: default_settle_delay(),
            reload_coalesce_ms: default_reload_coalesce(),
            lyrics_timeout_ms: default_lyrics_timeout(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn info_interval(&self) -> Duration {
        Duration::from_millis(self.info_interval_ms)
    }

    #[must_use]
    pub const fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub const fn reload_coalesce(&self) -> Duration {
        Duration::from_millis(self.reload_coalesce_ms)
    }

    #[must_use]
    pub const fn lyrics_timeout(&self) -> Duration {
        Duration::from_millis(self.lyrics_timeout_ms)
    }

    /// Check that every duration is non-zero.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` naming the first zero field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("sync.info_interval_ms", self.info_interval_ms),
            ("sync.progress_interval_ms", self.progress_interval_ms),
            ("sync.settle_delay_ms", self.settle_delay_ms),
            ("sync.reload_coalesce_ms", self.reload_coalesce_ms),
            ("sync.lyrics_timeout_ms", self.lyrics_timeout_ms),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{name} must be greater than 0"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Override for the local lyrics directory
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
    /// Write remotely fetched lyrics to local storage automatically
    #[serde(default)]
    pub persist_fetched: bool,
    #[serde(default = "default_loading_text")]
    pub loading_text: String,
    #[serde(default = "default_no_lyrics_text")]
    pub no_lyrics_text: String,
}

fn default_loading_text() -> String {
    DEFAULT_LOADING_TEXT.to_string()
}

fn default_no_lyrics_text() -> String {
    DEFAULT_NO_LYRICS_TEXT.to_string()
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            local_dir: None,
            persist_fetched: false,
            loading_text: default_loading_text(),
            no_lyrics_text: default_no_lyrics_text(),
        }
    }
}

impl LyricsConfig {
    /// Directory local lyric documents live in
    #[must_use]
    pub fn local_dir(&self) -> PathBuf {
        self.local_dir
            .clone()
            .unwrap_or_else(crate::paths::lyrics_dir)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file in the config directory
    #[serde(default)]
    pub enabled: bool,
}

/// Raw `[providers.*]` tables.
///
/// Core does not know the provider schemas; each provider crate extracts its
/// own section with [`get`](Self::get).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvidersConfig(toml::Table);

impl ProvidersConfig {
    /// Deserialize the `[providers.<name>]` table, if present.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the table does not match `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.0
            .get(name)
            .map(|value| value.clone().try_into::<T>())
            .transpose()
            .map_err(CoreError::from)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

impl TunesyncConfig {
    /// Get the configuration directory path (~/.config/tunesync/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/tunesync/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path, writing a template on first run.
    ///
    /// `provider_templates` are appended to the base template so each provider
    /// crate documents its own section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after writing the template, or an error if
    /// the file cannot be read, parsed, or validated.
    pub fn load_or_create(provider_templates: &[&str]) -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, build_config_template(provider_templates))?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        Self::load_from(&config_path)
    }

    /// Load and validate config from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// Returns a parse error or `ConfigInvalid`.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.sync.validate()?;
        Ok(config)
    }
}

/// Base template plus the given provider fragments
#[must_use]
pub fn build_config_template(provider_templates: &[&str]) -> String {
    let mut template = String::from(CONFIG_TEMPLATE);
    for fragment in provider_templates {
        template.push('\n');
        template.push_str(fragment);
    }
    template
}

const CONFIG_TEMPLATE: &str = r#"# Tunesync Configuration
# ~/.config/tunesync/config.toml

[sync]
# Coarse cadence: how often playback state is fetched from the source
info_interval_ms = 1000
# Fine cadence: how often progress and the lyric cursor are updated
progress_interval_ms = 100
# Delay after an interaction (drag, seek) ends before polling resumes
settle_delay_ms = 100
# Repeated lyric requests for the same track within this window are merged
reload_coalesce_ms = 100
# A lyric lookup that takes longer than this is treated as "no lyrics"
lyrics_timeout_ms = 15000

[lyrics]
# Directory for locally stored lyrics (defaults to ~/.config/tunesync/lyrics)
# local_dir = ""
# Save every remotely fetched lyric document to the local directory
persist_fetched = false
loading_text = "Loading lyrics..."
no_lyrics_text = "No lyrics available"

[logging]
# Also write logs to ~/.config/tunesync/tunesync.log
enabled = false
"#;
