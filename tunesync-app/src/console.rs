//! Line-based stdin console that drives an [`EngineHandle`].

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tunesync_core::{EngineHandle, PlaybackCommand};

const LOG_TARGET: &str = "tunesync::console";

pub const HELP: &str = "Commands: pause, resume, next, prev, shuffle on|off, vol <0-100>, \
repeat, save, reload, drag-start, drag-end, help, quit";

/// One parsed console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Control(PlaybackCommand),
    SaveLyrics,
    ReloadLyrics,
    InteractionStarted,
    InteractionEnded,
    Help,
    Quit,
}

/// Parse a console line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns a message describing the unrecognized input.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("pause", None) => ConsoleCommand::Control(PlaybackCommand::Pause),
        ("resume" | "play", None) => ConsoleCommand::Control(PlaybackCommand::Resume),
        ("next", None) => ConsoleCommand::Control(PlaybackCommand::Next),
        ("prev" | "previous", None) => ConsoleCommand::Control(PlaybackCommand::Previous),
        ("repeat", None) => ConsoleCommand::Control(PlaybackCommand::ToggleRepeat),
        ("shuffle", Some("on")) => ConsoleCommand::Control(PlaybackCommand::SetShuffle(true)),
        ("shuffle", Some("off")) => ConsoleCommand::Control(PlaybackCommand::SetShuffle(false)),
        ("vol" | "volume", Some(percent)) => {
            let percent = percent
                .parse::<u8>()
                .map_err(|_| format!("Invalid volume '{percent}'"))?;
            ConsoleCommand::Control(PlaybackCommand::SetVolume(percent))
        }
        ("save", None) => ConsoleCommand::SaveLyrics,
        ("reload", None) => ConsoleCommand::ReloadLyrics,
        ("drag-start", None) => ConsoleCommand::InteractionStarted,
        ("drag-end", None) => ConsoleCommand::InteractionEnded,
        ("help" | "?", None) => ConsoleCommand::Help,
        ("quit" | "exit", None) => ConsoleCommand::Quit,
        _ => return Err(format!("Unknown command '{}'", line.trim())),
    };

    if words.next().is_some() {
        return Err(format!("Too many arguments in '{}'", line.trim()));
    }
    Ok(Some(command))
}

/// Read commands from stdin until EOF, `quit`, or cancellation.
pub async fn run_console(handle: EngineHandle, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!(target: LOG_TARGET, "{HELP}");

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!(target: LOG_TARGET, "stdin closed, console stopped");
                break;
            }
            Err(e) => {
                error!(target: LOG_TARGET, "Failed to read stdin: {e}");
                break;
            }
        };

        match parse_command(&line) {
            Ok(Some(ConsoleCommand::Quit)) => {
                info!(target: LOG_TARGET, "Quit requested");
                cancel.cancel();
                break;
            }
            Ok(Some(command)) => execute(&handle, command).await,
            Ok(None) => {}
            Err(message) => warn!(target: LOG_TARGET, "{message}. {HELP}"),
        }
    }
}

async fn execute(handle: &EngineHandle, command: ConsoleCommand) {
    let result = match command {
        ConsoleCommand::Control(control) => handle
            .control(control)
            .await
            .map(|()| info!(target: LOG_TARGET, "Sent {control}")),
        ConsoleCommand::SaveLyrics => handle
            .save_lyrics()
            .await
            .map(|path| info!(target: LOG_TARGET, "Saved lyrics to {}", path.display())),
        ConsoleCommand::ReloadLyrics => handle.reload_lyrics().await,
        ConsoleCommand::InteractionStarted => handle.interaction_started().await,
        ConsoleCommand::InteractionEnded => handle.interaction_ended().await,
        ConsoleCommand::Help => {
            info!(target: LOG_TARGET, "{HELP}");
            Ok(())
        }
        ConsoleCommand::Quit => Ok(()),
    };

    if let Err(e) = result {
        error!(target: LOG_TARGET, "{e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_controls() {
        assert_eq!(
            parse_command("pause").unwrap(),
            Some(ConsoleCommand::Control(PlaybackCommand::Pause))
        );
        assert_eq!(
            parse_command("  PREV ").unwrap(),
            Some(ConsoleCommand::Control(PlaybackCommand::Previous))
        );
        assert_eq!(
            parse_command("shuffle on").unwrap(),
            Some(ConsoleCommand::Control(PlaybackCommand::SetShuffle(true)))
        );
        assert_eq!(
            parse_command("vol 40").unwrap(),
            Some(ConsoleCommand::Control(PlaybackCommand::SetVolume(40)))
        );
        assert_eq!(
            parse_command("repeat").unwrap(),
            Some(ConsoleCommand::Control(PlaybackCommand::ToggleRepeat))
        );
    }

    #[test]
    fn test_parse_engine_commands() {
        assert_eq!(parse_command("save").unwrap(), Some(ConsoleCommand::SaveLyrics));
        assert_eq!(parse_command("reload").unwrap(), Some(ConsoleCommand::ReloadLyrics));
        assert_eq!(
            parse_command("drag-start").unwrap(),
            Some(ConsoleCommand::InteractionStarted)
        );
        assert_eq!(
            parse_command("drag-end").unwrap(),
            Some(ConsoleCommand::InteractionEnded)
        );
        assert_eq!(parse_command("quit").unwrap(), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_blank_and_invalid() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert!(parse_command("dance").is_err());
        assert!(parse_command("shuffle maybe").is_err());
        assert!(parse_command("vol loud").is_err());
        assert!(parse_command("vol 300").is_err());
        assert!(parse_command("pause now").is_err());
    }

    #[test]
    fn test_out_of_range_volume_parses_but_fails_validation() {
        // Range checking happens in the engine handle
        let command = PlaybackCommand::SetVolume(150);
        assert_eq!(
            parse_command("vol 150").unwrap(),
            Some(ConsoleCommand::Control(command))
        );
        assert!(command.validate().is_err());
    }
}
