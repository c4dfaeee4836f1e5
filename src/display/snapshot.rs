//! Immutable display snapshots of decoded values.
//!
//! Every analysed frame produces a new snapshot from the previous one; the
//! display layer is only notified when the diff between the two is non-empty.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::perception::types::{ScanResult, ValueKind};

/// What the display shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// A single value: the last one decoded from the newest frame that had
    /// any detection.
    Latest,
    /// Every distinct value seen since startup, in first-seen order.
    #[default]
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub kind: ValueKind,
    pub value: String,
    pub first_seen: DateTime<Utc>,
}

impl ScanEntry {
    fn from_result(result: &ScanResult, now: DateTime<Utc>) -> Self {
        Self {
            kind: result.kind,
            value: result.value.clone(),
            first_seen: now,
        }
    }

    fn same_value(&self, other: &ScanEntry) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub added: Vec<ScanEntry>,
    pub removed: Vec<ScanEntry>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Ordered, immutable list of entries. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSnapshot {
    entries: Arc<[ScanEntry]>,
}

impl Default for ScanSnapshot {
    fn default() -> Self {
        Self::from_entries(Vec::new())
    }
}

impl ScanSnapshot {
    pub fn from_entries(entries: Vec<ScanEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[ScanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScanEntry> {
        self.entries.get(index)
    }

    fn contains(&self, entry: &ScanEntry) -> bool {
        self.entries.iter().any(|e| e.same_value(entry))
    }

    /// Snapshot after merging one frame's results.
    pub fn next(
        &self,
        results: &[ScanResult],
        mode: DisplayMode,
        max_entries: usize,
        now: DateTime<Utc>,
    ) -> ScanSnapshot {
        match mode {
            DisplayMode::Latest => {
                let Some(last) = results.last() else {
                    return self.clone();
                };
                let entry = ScanEntry::from_result(last, now);
                if self.len() == 1 && self.entries[0].same_value(&entry) {
                    return self.clone();
                }
                ScanSnapshot::from_entries(vec![entry])
            }
            DisplayMode::List => {
                let mut entries: Vec<ScanEntry> = self.entries.to_vec();
                for result in results {
                    let entry = ScanEntry::from_result(result, now);
                    if !entries.iter().any(|e| e.same_value(&entry)) {
                        entries.push(entry);
                    }
                }
                if entries.len() == self.len() {
                    return self.clone();
                }
                let cap = max_entries.max(1);
                if entries.len() > cap {
                    let excess = entries.len() - cap;
                    entries.drain(..excess);
                }
                ScanSnapshot::from_entries(entries)
            }
        }
    }

    /// Entries present in `newer` but not here, and the reverse.
    pub fn diff(&self, newer: &ScanSnapshot) -> SnapshotDiff {
        SnapshotDiff {
            added: newer
                .entries
                .iter()
                .filter(|e| !self.contains(e))
                .cloned()
                .collect(),
            removed: self
                .entries
                .iter()
                .filter(|e| !newer.contains(e))
                .cloned()
                .collect(),
        }
    }
}

/// Current display projection plus the rules that evolve it.
#[derive(Debug, Clone)]
pub struct DisplayState {
    mode: DisplayMode,
    max_entries: usize,
    current: ScanSnapshot,
}

impl DisplayState {
    pub fn new(mode: DisplayMode, max_entries: usize) -> Self {
        Self {
            mode,
            max_entries,
            current: ScanSnapshot::default(),
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn snapshot(&self) -> &ScanSnapshot {
        &self.current
    }

    /// Merge one frame's results. Returns the diff only if the snapshot
    /// actually changed.
    pub fn apply(&mut self, results: &[ScanResult]) -> Option<SnapshotDiff> {
        let next = self
            .current
            .next(results, self.mode, self.max_entries, Utc::now());
        let diff = self.current.diff(&next);
        if diff.is_empty() {
            return None;
        }
        self.current = next;
        Some(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(values: &[&str]) -> Vec<ScanResult> {
        values.iter().map(|v| ScanResult::new(*v, None)).collect()
    }

    fn values(snapshot: &ScanSnapshot) -> Vec<&str> {
        snapshot.entries().iter().map(|e| e.value.as_str()).collect()
    }

    #[test]
    fn latest_mode_keeps_last_value_of_newest_frame() {
        let mut state = DisplayState::new(DisplayMode::Latest, 50);
        let diff = state.apply(&results(&["a", "b"])).unwrap();
        assert_eq!(values(state.snapshot()), vec!["b"]);
        assert_eq!(diff.added.len(), 1);

        // empty frame leaves the text in place
        assert!(state.apply(&[]).is_none());
        assert_eq!(values(state.snapshot()), vec!["b"]);

        // same value again is not a change
        assert!(state.apply(&results(&["b"])).is_none());

        let diff = state.apply(&results(&["https://x.org"])).unwrap();
        assert_eq!(diff.removed[0].value, "b");
        assert_eq!(diff.added[0].kind, ValueKind::Url);
    }

    #[test]
    fn list_mode_accumulates_distinct_values_in_order() {
        let mut state = DisplayState::new(DisplayMode::List, 50);
        state.apply(&results(&["one", "two"])).unwrap();
        assert!(state.apply(&results(&["two", "one"])).is_none());
        assert!(state.apply(&[]).is_none());

        let diff = state.apply(&results(&["three", "one"])).unwrap();
        assert_eq!(values(state.snapshot()), vec!["one", "two", "three"]);
        assert_eq!(diff.added.len(), 1);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn list_mode_drops_oldest_over_capacity() {
        let mut state = DisplayState::new(DisplayMode::List, 2);
        state.apply(&results(&["a", "b"])).unwrap();
        let diff = state.apply(&results(&["c"])).unwrap();
        assert_eq!(values(state.snapshot()), vec!["b", "c"]);
        assert_eq!(diff.removed[0].value, "a");
    }

    #[test]
    fn unchanged_snapshot_keeps_first_seen_time() {
        let snapshot = ScanSnapshot::default();
        let t0 = Utc::now();
        let first = snapshot.next(&results(&["v"]), DisplayMode::List, 10, t0);
        let later = first.next(
            &results(&["v"]),
            DisplayMode::List,
            10,
            t0 + chrono::Duration::seconds(5),
        );
        assert_eq!(later.entries()[0].first_seen, t0);
        assert!(first.diff(&later).is_empty());
    }
}
