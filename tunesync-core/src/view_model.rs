//! Named view-model fields with change-only dispatch to presentation sinks.

use crate::cursor::LyricView;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the [`BroadcastSink`] channel
const BROADCAST_CAPACITY: usize = 64;

/// Fields exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SongTitle,
    SongArtist,
    ReleaseYear,
    CoverUrl,
    /// Raw playback fraction in `0.0..=1.0`
    ProgressFraction,
    IsPlaying,
    PreviousLyric,
    CurrentLyric,
    NextLyric,
}

impl Field {
    pub const ALL: [Self; 9] = [
        Self::SongTitle,
        Self::SongArtist,
        Self::ReleaseYear,
        Self::CoverUrl,
        Self::ProgressFraction,
        Self::IsPlaying,
        Self::PreviousLyric,
        Self::CurrentLyric,
        Self::NextLyric,
    ];

    /// Stable field name as seen by presentation layers
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SongTitle => "songTitle",
            Self::SongArtist => "songArtist",
            Self::ReleaseYear => "releaseYear",
            Self::CoverUrl => "coverUrl",
            Self::ProgressFraction => "progressFraction",
            Self::IsPlaying => "isPlaying",
            Self::PreviousLyric => "previousLyric",
            Self::CurrentLyric => "currentLyric",
            Self::NextLyric => "nextLyric",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value carried by a [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Fraction(f64),
    Flag(bool),
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_fraction(&self) -> Option<f64> {
        match self {
            Self::Fraction(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Fraction(value) => write!(f, "{value:.3}"),
            Self::Flag(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Fraction(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Receives field changes from the sync engine.
///
/// Called on the engine task; implementations must not block.
pub trait ViewModelSink: Send + Sync {
    fn field_changed(&self, field: Field, value: &FieldValue);
}

/// One field change as published by [`BroadcastSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: Field,
    pub value: FieldValue,
}

/// Sink that fans field changes out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<FieldUpdate>,
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastSink {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    /// Subscribe to field updates
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FieldUpdate> {
        self.tx.subscribe()
    }
}

impl ViewModelSink for BroadcastSink {
    fn field_changed(&self, field: Field, value: &FieldValue) {
        // No subscribers is fine
        let _ = self.tx.send(FieldUpdate {
            field,
            value: value.clone(),
        });
    }
}

/// Last dispatched value per field plus the sink to notify.
///
/// [`set`](Self::set) is the single "set if changed, then notify" helper;
/// an unchanged value is never pushed downstream.
pub struct ViewModel {
    values: HashMap<Field, FieldValue>,
    sink: Arc<dyn ViewModelSink>,
}

impl ViewModel {
    pub fn new(sink: Arc<dyn ViewModelSink>) -> Self {
        Self {
            values: HashMap::new(),
            sink,
        }
    }

    /// Store `value` and notify the sink if it differs from the last one.
    ///
    /// Returns whether the sink was notified.
    pub fn set(&mut self, field: Field, value: impl Into<FieldValue>) -> bool {
        let value = value.into();
        if self.values.get(&field) == Some(&value) {
            return false;
        }
        self.sink.field_changed(field, &value);
        self.values.insert(field, value);
        true
    }

    /// Dispatch the three lyric fields
    pub fn set_lyrics(&mut self, view: LyricView) {
        self.set(Field::PreviousLyric, view.previous);
        self.set(Field::CurrentLyric, view.current);
        self.set(Field::NextLyric, view.next);
    }

    /// Last dispatched value for `field`
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }
}
