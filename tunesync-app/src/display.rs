//! Logs view-model field changes, standing in for a rendered widget.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tunesync_core::{Field, FieldUpdate, FieldValue};

const LOG_TARGET: &str = "tunesync::app";

/// Format one update for the log, or `None` for fields too chatty to log at
/// info level.
pub fn describe(update: &FieldUpdate) -> Option<String> {
    match (&update.field, &update.value) {
        (Field::ProgressFraction, _) => None,
        (Field::IsPlaying, FieldValue::Flag(playing)) => {
            Some(if *playing { "Playing" } else { "Paused" }.to_string())
        }
        (field, FieldValue::Text(text)) if text.is_empty() => Some(format!("{field}: -")),
        (field, FieldValue::Text(text)) => Some(format!("{field}: {text}")),
        (field, value) => Some(format!("{field}: {value}")),
    }
}

/// Log updates until the sink is dropped.
pub async fn log_field_updates(mut rx: broadcast::Receiver<FieldUpdate>) {
    loop {
        match rx.recv().await {
            Ok(update) => match describe(&update) {
                Some(line) => info!(target: LOG_TARGET, "{line}"),
                None => debug!(target: LOG_TARGET, "{}: {}", update.field, update.value),
            },
            Err(RecvError::Lagged(n)) => {
                warn!(target: LOG_TARGET, "Display lagged, skipped {} updates", n);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
