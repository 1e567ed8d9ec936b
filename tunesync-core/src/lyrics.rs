//! Lyric data model: lines, documents, and the normalized track key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single timed lyric line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Line start in milliseconds from the start of the track
    pub time_ms: u64,
    /// Line text; empty marks an instrumental gap
    pub text: String,
}

impl LyricLine {
    pub fn new(time_ms: u64, text: impl Into<String>) -> Self {
        Self {
            time_ms,
            text: text.into(),
        }
    }
}

/// Where a lyric document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricProvenance {
    /// Fetched from a remote synced-lyrics provider
    Remote,
    /// Loaded from local persisted storage
    Local,
    /// No lyrics were found anywhere
    None,
}

impl LyricProvenance {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
            Self::None => "none",
        }
    }
}

impl fmt::Display for LyricProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized `"artist - title"` key identifying a lyric document.
///
/// Both parts are trimmed, lowercased, and have inner whitespace collapsed so
/// that cosmetic differences between sources map to the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackKey(String);

impl TrackKey {
    #[must_use]
    pub fn new(artist: &str, title: &str) -> Self {
        Self(format!("{} - {}", normalize(artist), normalize(title)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name used for local persistence (`artist - title.json`).
    ///
    /// Path separators are replaced so the key can never escape the lyrics
    /// directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        let sanitized: String = self
            .0
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '\0' => '_',
                other => other,
            })
            .collect();
        format!("{sanitized}.json")
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(part: &str) -> String {
    part.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// All lyric lines known for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricDocument {
    pub track_key: TrackKey,
    /// Lines sorted by `time_ms`; empty means "no lyrics available"
    pub lines: Vec<LyricLine>,
    pub provider: LyricProvenance,
    pub fetched_at: DateTime<Utc>,
}

impl LyricDocument {
    /// Build a document, sorting the lines by time.
    #[must_use]
    pub fn new(track_key: TrackKey, mut lines: Vec<LyricLine>, provider: LyricProvenance) -> Self {
        lines.sort_by_key(|line| line.time_ms);
        Self {
            track_key,
            lines,
            provider,
            fetched_at: Utc::now(),
        }
    }

    /// Document recording that no lyrics exist for `track_key`.
    #[must_use]
    pub fn empty(track_key: TrackKey) -> Self {
        Self::new(track_key, Vec::new(), LyricProvenance::None)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_key_normalization() {
        let a = TrackKey::new("  Daft   Punk ", "One More Time");
        let b = TrackKey::new("daft punk", "one more  time");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "daft punk - one more time");
    }

    #[test]
    fn test_track_key_file_name_sanitized() {
        let key = TrackKey::new("AC/DC", "Back: In Black");
        assert_eq!(key.file_name(), "ac_dc - back_ in black.json");
    }

    #[test]
    fn test_document_sorts_lines() {
        let doc = LyricDocument::new(
            TrackKey::new("a", "b"),
            vec![LyricLine::new(2000, "C"), LyricLine::new(0, "A"), LyricLine::new(1000, "B")],
            LyricProvenance::Remote,
        );
        let times: Vec<_> = doc.lines.iter().map(|l| l.time_ms).collect();
        assert_eq!(times, vec![0, 1000, 2000]);
    }

    #[test]
    fn test_empty_document() {
        let doc = LyricDocument::empty(TrackKey::new("a", "b"));
        assert!(doc.is_empty());
        assert_eq!(doc.provider, LyricProvenance::None);
    }

    #[test]
    fn test_provenance_serde_tag() {
        let json = serde_json::to_string(&LyricProvenance::Remote).unwrap();
        assert_eq!(json, "\"remote\"");
    }
}
