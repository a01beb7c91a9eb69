//! Client-local bookkeeping: search history, favorites and the viewed ledger.
//!
//! Each store is a plain JSON file under the data directory. Stores are
//! last-write-wins; nothing coordinates concurrent writers.

pub mod favorites;
pub mod history;
pub mod viewed;

pub use favorites::{FavoriteItem, Favorites};
pub use history::{HistoryEntry, SearchHistory};
pub use viewed::{MaxReward, RewardPoint, ViewedItem, ViewedLedger, ViewedStats};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Deterministic id of a logical offer.
pub fn item_id(site: &str, title: &str, original_url: &str) -> String {
    let digest = Sha256::digest(format!("{}-{}-{}", site, title, original_url).as_bytes());
    format!("item_{}", hex::encode(&digest[..12]))
}

/// Milliseconds since the epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// File layout of the data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> PathBuf {
        self.root.join("cache.json")
    }

    pub fn history(&self) -> PathBuf {
        self.root.join("history.json")
    }

    pub fn favorites(&self) -> PathBuf {
        self.root.join("favorites.json")
    }

    pub fn viewed(&self) -> PathBuf {
        self.root.join("viewed.json")
    }
}

/// Reads a JSON file, treating a missing file as empty.
pub fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        debug!("{} does not exist yet", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Writes a JSON file via a temporary sibling, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(value).context("Failed to serialize")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
