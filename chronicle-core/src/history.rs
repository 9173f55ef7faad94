//! Undo/redo over whole-game snapshots.
//!
//! A linear list of snapshots with a cursor. Committing after an undo drops
//! everything past the cursor, so there is never more than one future.

use crate::progression::LevelUp;
use crate::world::{Character, ChatMessage, LocationState};
use serde::{Deserialize, Serialize};

/// A point-in-time copy of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub character: Character,
    pub location: LocationState,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    /// The level-up this snapshot was waiting on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_up: Option<LevelUp>,
}

/// Snapshot list plus the index of the live snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from saved entries and a saved index (`-1` when empty).
    ///
    /// An index outside the entries points at the newest entry.
    pub fn from_saved(entries: Vec<HistoryEntry>, index: i64) -> Self {
        let cursor = if entries.is_empty() {
            None
        } else if index >= 0 && (index as usize) < entries.len() {
            Some(index as usize)
        } else {
            tracing::warn!(index, len = entries.len(), "saved history index out of range");
            Some(entries.len() - 1)
        };
        Self { entries, cursor }
    }

    /// Drop any redo future, append `entry`, and make it current.
    pub fn commit(&mut self, entry: HistoryEntry) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        let discarded = self.entries.len() - keep;
        if discarded > 0 {
            tracing::debug!(discarded, "discarding redo future");
        }
        self.entries.truncate(keep);
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Step back one snapshot and return it.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                self.entries.get(c - 1)
            }
            _ => None,
        }
    }

    /// Step forward one snapshot and return it.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        match self.cursor {
            Some(c) if c + 1 < self.entries.len() => {
                self.cursor = Some(c + 1);
                self.entries.get(c + 1)
            }
            _ => None,
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.entries.len())
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    /// Cursor as stored in save files: `-1` when there are no entries.
    pub fn index(&self) -> i64 {
        self.cursor.map_or(-1, |c| c as i64)
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
}
