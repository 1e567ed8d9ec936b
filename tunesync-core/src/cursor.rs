//! Maps a playback position onto the previous/current/next lyric lines.

use crate::lyrics::LyricLine;

/// Default text shown while lyrics for the current track are being fetched
pub const DEFAULT_LOADING_TEXT: &str = "Loading lyrics...";

/// Default text shown when a track has no lyrics
pub const DEFAULT_NO_LYRICS_TEXT: &str = "No lyrics available";

/// The three lyric lines a presentation layer displays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricView {
    pub previous: String,
    pub current: String,
    pub next: String,
}

impl LyricView {
    fn only_current(text: &str) -> Self {
        Self {
            current: text.to_string(),
            ..Self::default()
        }
    }
}

/// Resolves positions against a sorted lyric line sequence.
///
/// Resolution is a pure function of `(lines, position)`: the cursor only
/// carries the sentinel texts.
#[derive(Debug, Clone)]
pub struct LyricCursor {
    loading_text: String,
    no_lyrics_text: String,
}

impl Default for LyricCursor {
    fn default() -> Self {
        Self::new(DEFAULT_LOADING_TEXT, DEFAULT_NO_LYRICS_TEXT)
    }
}

impl LyricCursor {
    pub fn new(loading_text: impl Into<String>, no_lyrics_text: impl Into<String>) -> Self {
        Self {
            loading_text: loading_text.into(),
            no_lyrics_text: no_lyrics_text.into(),
        }
    }

    /// Index of the greatest line with `time_ms <= position_ms`.
    ///
    /// `None` means the position is before the first line (or there are no
    /// lines). Runs in O(log n).
    #[must_use]
    pub fn active_index(lines: &[LyricLine], position_ms: i64) -> Option<usize> {
        debug_assert!(
            lines.windows(2).all(|w| w[0].time_ms <= w[1].time_ms),
            "lyric lines must be sorted by time"
        );

        let position = u64::try_from(position_ms).ok()?;
        lines
            .partition_point(|line| line.time_ms <= position)
            .checked_sub(1)
    }

    /// Resolve previous/current/next text at `position_ms`.
    ///
    /// Before the first line, the first line is shown as a lookahead and
    /// `previous` is empty. An empty sequence yields the no-lyrics sentinel.
    #[must_use]
    pub fn resolve(&self, lines: &[LyricLine], position_ms: i64) -> LyricView {
        if lines.is_empty() {
            return LyricView::only_current(&self.no_lyrics_text);
        }

        let text_at = |index: usize| {
            lines
                .get(index)
                .map(|line| line.text.clone())
                .unwrap_or_default()
        };

        match Self::active_index(lines, position_ms) {
            Some(active) => LyricView {
                previous: active.checked_sub(1).map(text_at).unwrap_or_default(),
                current: text_at(active),
                next: text_at(active + 1),
            },
            None => LyricView {
                previous: String::new(),
                current: text_at(0),
                next: text_at(1),
            },
        }
    }

    /// View shown while the document for the current track is in flight
    #[must_use]
    pub fn loading(&self) -> LyricView {
        LyricView::only_current(&self.loading_text)
    }

    /// View shown when nothing is playing
    #[must_use]
    pub fn empty() -> LyricView {
        LyricView::default()
    }
}
