//! Classification of what changed between two playback snapshots.
//!
//! Polling sources return the full state on every tick, so instead of relying
//! on discrete events the engine re-derives "what changed" from the previous
//! and current snapshot. Missed or duplicate polls are therefore harmless.

use crate::playback::PlaybackSnapshot;

/// A single kind of change between snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// Different track (including start-up and nothing <-> something)
    TrackChanged,
    /// Playing <-> paused
    PlayStateChanged,
    /// Reported progress differs
    ProgressChanged,
}

impl Change {
    const ALL: [Self; 3] = [
        Self::TrackChanged,
        Self::PlayStateChanged,
        Self::ProgressChanged,
    ];

    const fn bit(self) -> u8 {
        match self {
            Self::TrackChanged => 1,
            Self::PlayStateChanged => 1 << 1,
            Self::ProgressChanged => 1 << 2,
        }
    }
}

/// Set of [`Change`]s produced by one classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet(u8);

impl ChangeSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, change: Change) {
        self.0 |= change.bit();
    }

    #[must_use]
    pub const fn contains(self, change: Change) -> bool {
        self.0 & change.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Change> {
        Change::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Change> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        let mut set = Self::empty();
        for change in iter {
            set.insert(change);
        }
        set
    }
}

/// Stateless snapshot comparator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    /// Classify the delta from `previous` to `current`.
    ///
    /// A missing `previous` (start-up) always counts as a track change. The
    /// three flags are evaluated independently and may fire together.
    #[must_use]
    pub fn classify(previous: Option<&PlaybackSnapshot>, current: &PlaybackSnapshot) -> ChangeSet {
        let mut changes = ChangeSet::empty();

        let Some(previous) = previous else {
            changes.insert(Change::TrackChanged);
            return changes;
        };

        if previous.track_id != current.track_id {
            changes.insert(Change::TrackChanged);
        }
        if previous.is_playing != current.is_playing {
            changes.insert(Change::PlayStateChanged);
        }
        if previous.progress_ms != current.progress_ms {
            changes.insert(Change::ProgressChanged);
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(track: Option<&str>, playing: bool, progress: u64) -> PlaybackSnapshot {
        match track {
            Some(id) => PlaybackSnapshot::new(id, playing, progress, 200_000),
            None => PlaybackSnapshot {
                is_playing: playing,
                progress_ms: progress,
                ..PlaybackSnapshot::idle()
            },
        }
    }

    #[test]
    fn test_startup_is_track_change() {
        let changes = ChangeDetector::classify(None, &snapshot(Some("a"), true, 0));
        assert!(changes.contains(Change::TrackChanged));
    }

    #[test]
    fn test_identical_snapshots_are_empty() {
        let a = snapshot(Some("a"), true, 1000);
        let b = snapshot(Some("a"), true, 1000);
        assert!(ChangeDetector::classify(Some(&a), &b).is_empty());
    }

    #[test]
    fn test_different_track_ids() {
        let pairs = [
            (snapshot(Some("a"), true, 0), snapshot(Some("b"), true, 0)),
            (snapshot(None, false, 0), snapshot(Some("b"), true, 0)),
            (snapshot(Some("a"), true, 0), snapshot(None, false, 0)),
        ];
        for (previous, current) in &pairs {
            let changes = ChangeDetector::classify(Some(previous), current);
            assert!(changes.contains(Change::TrackChanged));
        }
    }

    #[test]
    fn test_both_idle_is_not_track_change() {
        let changes =
            ChangeDetector::classify(Some(&snapshot(None, false, 0)), &snapshot(None, false, 0));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_play_state_only() {
        let changes = ChangeDetector::classify(
            Some(&snapshot(Some("a"), true, 500)),
            &snapshot(Some("a"), false, 500),
        );
        assert_eq!(changes.iter().collect::<Vec<_>>(), vec![Change::PlayStateChanged]);
    }

    #[test]
    fn test_progress_only() {
        let changes = ChangeDetector::classify(
            Some(&snapshot(Some("a"), true, 500)),
            &snapshot(Some("a"), true, 1500),
        );
        assert_eq!(changes.iter().collect::<Vec<_>>(), vec![Change::ProgressChanged]);
    }

    #[test]
    fn test_multiple_flags_together() {
        let changes = ChangeDetector::classify(
            Some(&snapshot(Some("a"), true, 500)),
            &snapshot(Some("b"), false, 0),
        );
        let expected: ChangeSet = Change::ALL.into_iter().collect();
        assert_eq!(changes, expected);
    }
}
