//! Local history list and the transformations applied to it after each
//! confirmed remote operation.
//!
//! The list is ordered newest-first by local insertion, not by timestamp.
//! Soft-deleted entries stay in the list with `hidden` set.

use crate::types::{now_timestamp, EntryId, HistoryEntry};

#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Replace the whole list with a server snapshot, every entry visible
    pub fn replace_all(&mut self, entries: Vec<HistoryEntry>) {
        self.entries = entries
            .into_iter()
            .map(|entry| HistoryEntry {
                hidden: false,
                ..entry
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Insert a confirmed entry at the head of the list
    pub fn prepend(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
    }

    /// Every entry, hidden ones included
    pub fn raw(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn visible(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(|e| !e.hidden)
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a visible entry by id
    pub fn get_visible(&self, id: &EntryId) -> Option<&HistoryEntry> {
        self.visible().find(|e| &e.id == id)
    }

    /// Resolve an id typed by the user against the visible entries
    pub fn find_visible_id(&self, label: &str) -> Option<EntryId> {
        self.visible()
            .find(|e| e.id.to_string() == label)
            .map(|e| e.id.clone())
    }

    /// Mark every entry with this id as hidden. Returns how many changed.
    pub fn hide(&mut self, id: &EntryId) -> usize {
        let mut changed = 0;
        for entry in self.entries.iter_mut().filter(|e| &e.id == id && !e.hidden) {
            entry.hidden = true;
            changed += 1;
        }
        changed
    }

    /// Rewrite the matching entry in place, stamping the edit time.
    /// All other entries are left untouched.
    pub fn update(&mut self, id: &EntryId, action: &str, obs: Option<&str>) -> bool {
        let mut found = false;
        for entry in self.entries.iter_mut().filter(|e| &e.id == id) {
            entry.action = action.to_string();
            entry.obs = obs.map(str::to_string);
            entry.timestamp = now_timestamp();
            found = true;
        }
        found
    }

    /// Hide the original and put its replacement at the head of the list
    pub fn replace_with(&mut self, original: &EntryId, replacement: HistoryEntry) {
        self.hide(original);
        self.prepend(replacement);
    }

    /// Drop the entry with this id. Returns whether anything was removed.
    pub fn remove(&mut self, id: &EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.id != id);
        self.entries.len() != before
    }
}
