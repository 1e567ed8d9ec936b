//! Path constants for configuration, log, and lyric files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "tunesync";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the directory holding locally persisted lyric documents
pub const LYRICS_DIR_NAME: &str = "lyrics";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "tunesync.log";

/// Get the configuration directory path (~/.config/tunesync/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/tunesync/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the default local lyrics directory (~/.config/tunesync/lyrics/)
#[must_use]
pub fn lyrics_dir() -> PathBuf {
    config_dir().join(LYRICS_DIR_NAME)
}

/// Get the log file path (~/.config/tunesync/tunesync.log)
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}
