//! Conversion history shown in the side panel.
//!
//! The backend keeps the authoritative list; this is the client's copy plus
//! the selection state of the panel.

use crate::api::{ConversionResult, HistoryEntry};
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum number of entries requested from the backend and kept locally.
pub const MAX_HISTORY_ENTRIES: usize = 32;

/// Newest-first list of past conversions.
#[derive(Debug, Default)]
pub struct HistoryList {
    /// Entries, most recent first.
    entries: Vec<HistoryEntry>,

    /// Index of the highlighted entry.
    selected: usize,

    /// First visible row in the panel.
    scroll: usize,
}

impl HistoryList {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(MAX_HISTORY_ENTRIES),
            selected: 0,
            scroll: 0,
        }
    }

    /// Replaces the list with entries loaded from the backend.
    ///
    /// Keeps the selection on the same timestamp when it is still present.
    pub fn replace(&mut self, mut entries: Vec<HistoryEntry>) {
        let selected_ts = self.selected().map(|e| e.timestamp);
        entries.truncate(MAX_HISTORY_ENTRIES);
        self.entries = entries;

        self.selected = selected_ts
            .and_then(|ts| self.position(ts))
            .unwrap_or(0);
        self.clamp_selection();
    }

    /// Adds a just-finished conversion to the front of the list.
    ///
    /// An existing entry with the same timestamp is replaced, and the oldest
    /// entry is dropped once the list is full.
    pub fn record(&mut self, entry: HistoryEntry) {
        if let Some(pos) = self.position(entry.timestamp) {
            self.entries.remove(pos);
        }
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_HISTORY_ENTRIES);
        self.selected = 0;
        self.scroll = 0;
    }

    /// Removes the entry with the given timestamp.
    ///
    /// # Returns
    ///
    /// The removed entry, or None if no entry matched
    pub fn remove(&mut self, timestamp: f64) -> Option<HistoryEntry> {
        let pos = self.position(timestamp)?;
        let removed = self.entries.remove(pos);
        self.clamp_selection();
        Some(removed)
    }

    fn position(&self, timestamp: f64) -> Option<usize> {
        self.entries.iter().position(|e| e.timestamp == timestamp)
    }

    fn clamp_selection(&mut self) {
        if self.entries.is_empty() {
            self.selected = 0;
            self.scroll = 0;
            return;
        }
        if self.selected >= self.entries.len() {
            self.selected = self.entries.len() - 1;
        }
        if self.scroll > self.selected {
            self.scroll = self.selected;
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.selected)
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Moves the highlight up one entry.
    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            if self.selected < self.scroll {
                self.scroll = self.selected;
            }
        }
    }

    /// Moves the highlight down one entry.
    ///
    /// # Arguments
    ///
    /// * `visible_rows` - How many entries fit in the panel
    pub fn select_next(&mut self, visible_rows: usize) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
            let visible_rows = visible_rows.max(1);
            if self.selected >= self.scroll + visible_rows {
                self.scroll = self.selected + 1 - visible_rows;
            }
        }
    }
}

/// Builds a history entry for a conversion that just finished locally.
pub fn entry_for_result(result: ConversionResult) -> HistoryEntry {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    HistoryEntry {
        timestamp,
        time_str: None,
        mp3_name: None,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: f64, name: &str) -> HistoryEntry {
        HistoryEntry {
            timestamp: ts,
            time_str: None,
            mp3_name: None,
            result: ConversionResult {
                midi_name: Some(name.to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_record_inserts_newest_first() {
        let mut history = HistoryList::new();
        history.record(entry(1.0, "a.mid"));
        history.record(entry(2.0, "b.mid"));
        let names: Vec<_> = history
            .entries()
            .iter()
            .map(|e| e.result.title().to_string())
            .collect();
        assert_eq!(names, vec!["b.mid", "a.mid"]);
    }

    #[test]
    fn test_history_capped() {
        let mut history = HistoryList::new();
        for i in 0..40 {
            history.record(entry(i as f64, &format!("{}.mid", i)));
        }
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.entries()[0].timestamp, 39.0);
        assert_eq!(
            history.entries()[MAX_HISTORY_ENTRIES - 1].timestamp,
            (40 - MAX_HISTORY_ENTRIES) as f64
        );

        let many: Vec<_> = (0..50).map(|i| entry(i as f64, "x.mid")).collect();
        history.replace(many);
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
    }

    #[test]
    fn test_record_replaces_same_timestamp() {
        let mut history = HistoryList::new();
        history.record(entry(5.0, "old.mid"));
        history.record(entry(5.0, "new.mid"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].result.title(), "new.mid");
    }

    #[test]
    fn test_remove_by_timestamp() {
        let mut history = HistoryList::new();
        history.replace(vec![entry(3.0, "c"), entry(2.0, "b"), entry(1.0, "a")]);
        history.select_next(10);
        history.select_next(10);
        assert_eq!(history.selected_index(), 2);

        let removed = history.remove(1.0).unwrap();
        assert_eq!(removed.result.title(), "a");
        // Selection clamps to the new last entry
        assert_eq!(history.selected_index(), 1);
        assert!(history.remove(42.0).is_none());
    }

    #[test]
    fn test_replace_keeps_selected_timestamp() {
        let mut history = HistoryList::new();
        history.replace(vec![entry(3.0, "c"), entry(2.0, "b")]);
        history.select_next(10);
        history.replace(vec![entry(4.0, "d"), entry(3.0, "c"), entry(2.0, "b")]);
        assert_eq!(history.selected().map(|e| e.timestamp), Some(2.0));
    }

    #[test]
    fn test_selection_scrolls() {
        let mut history = HistoryList::new();
        history.replace((0..10).map(|i| entry(i as f64, "x")).collect());
        for _ in 0..5 {
            history.select_next(3);
        }
        assert_eq!(history.selected_index(), 5);
        assert_eq!(history.scroll(), 3);
        for _ in 0..5 {
            history.select_prev();
        }
        assert_eq!(history.selected_index(), 0);
        assert_eq!(history.scroll(), 0);
    }

    #[test]
    fn test_empty_history() {
        let mut history = HistoryList::new();
        history.select_next(5);
        history.select_prev();
        assert!(history.selected().is_none());
        assert!(history.is_empty());
    }
}
