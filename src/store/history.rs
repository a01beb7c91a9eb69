//! Recent search keywords, newest first.

use crate::store::{load_json, now_ms, save_json};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Entries kept.
pub const MAX_HISTORY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub keyword: String,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<usize>,
}

#[derive(Debug, Default)]
pub struct SearchHistory {
    path: Option<PathBuf>,
    entries: Vec<HistoryEntry>,
}

impl SearchHistory {
    /// Opens the history file, sorting and bounding whatever it holds.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries: Vec<HistoryEntry> = load_json(&path)?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(MAX_HISTORY);
        Ok(Self { path: Some(path), entries })
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Records a search. Blank keywords are ignored; repeats move to the front.
    pub fn add(&mut self, keyword: &str, result_count: Option<usize>) {
        self.add_at(keyword, result_count, now_ms());
    }

    pub fn add_at(&mut self, keyword: &str, result_count: Option<usize>, now: i64) {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return;
        }

        self.entries.retain(|e| e.keyword != keyword);
        self.entries.insert(0, HistoryEntry { keyword: keyword.to_string(), timestamp: now, result_count });
        self.entries.truncate(MAX_HISTORY);
    }

    /// Removes a keyword. Returns false if it was not present.
    pub fn remove(&mut self, keyword: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.keyword != keyword.trim());
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => save_json(path, &self.entries),
            None => Ok(()),
        }
    }
}
