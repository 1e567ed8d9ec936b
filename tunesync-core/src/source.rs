//! Playback source abstraction and control commands.

use crate::error::{CoreError, Result};
use crate::playback::PlaybackSnapshot;
use async_trait::async_trait;
use std::fmt;

/// Highest accepted volume percentage
pub const MAX_VOLUME: u8 = 100;

/// Control actions a presentation layer can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Pause,
    Resume,
    Next,
    Previous,
    SetShuffle(bool),
    /// Volume percentage, `0..=100`
    SetVolume(u8),
    /// Toggle between repeating the current track and no repeat
    ToggleRepeat,
}

impl PlaybackCommand {
    /// Reject commands with out-of-range arguments.
    ///
    /// # Errors
    ///
    /// Returns `InvalidVolume` for a volume above [`MAX_VOLUME`].
    pub fn validate(self) -> Result<Self> {
        match self {
            Self::SetVolume(percent) if percent > MAX_VOLUME => {
                Err(CoreError::InvalidVolume(percent))
            }
            _ => Ok(self),
        }
    }
}

impl fmt::Display for PlaybackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => f.write_str("pause"),
            Self::Resume => f.write_str("resume"),
            Self::Next => f.write_str("next"),
            Self::Previous => f.write_str("previous"),
            Self::SetShuffle(enabled) => write!(f, "shuffle {}", if *enabled { "on" } else { "off" }),
            Self::SetVolume(percent) => write!(f, "volume {percent}%"),
            Self::ToggleRepeat => f.write_str("toggle repeat"),
        }
    }
}

/// External service that reports and controls playback.
///
/// Every call may hit the network and may fail; the sync engine logs failures
/// and carries on.
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &'static str;

    /// Read the current playback state. `Ok(None)` means nothing is playing.
    async fn current_playback(&self) -> Result<Option<PlaybackSnapshot>>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    async fn next(&self) -> Result<()>;

    async fn previous(&self) -> Result<()>;

    async fn set_shuffle(&self, enabled: bool) -> Result<()>;

    /// Set the volume percentage. Callers validate the range first.
    async fn set_volume(&self, percent: u8) -> Result<()>;

    async fn toggle_repeat(&self) -> Result<()>;

    /// Validate and run `command`.
    ///
    /// # Errors
    ///
    /// Returns the validation error or the source's own failure.
    async fn execute(&self, command: PlaybackCommand) -> Result<()> {
        match command.validate()? {
            PlaybackCommand::Pause => self.pause().await,
            PlaybackCommand::Resume => self.resume().await,
            PlaybackCommand::Next => self.next().await,
            PlaybackCommand::Previous => self.previous().await,
            PlaybackCommand::SetShuffle(enabled) => self.set_shuffle(enabled).await,
            PlaybackCommand::SetVolume(percent) => self.set_volume(percent).await,
            PlaybackCommand::ToggleRepeat => self.toggle_repeat().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_validation() {
        assert_eq!(
            PlaybackCommand::SetVolume(100).validate().unwrap(),
            PlaybackCommand::SetVolume(100)
        );
        assert!(matches!(
            PlaybackCommand::SetVolume(101).validate(),
            Err(CoreError::InvalidVolume(101))
        ));
        assert!(PlaybackCommand::Pause.validate().is_ok());
    }

    #[test]
    fn test_command_display() {
        assert_eq!(PlaybackCommand::SetShuffle(true).to_string(), "shuffle on");
        assert_eq!(PlaybackCommand::SetVolume(40).to_string(), "volume 40%");
    }
}
