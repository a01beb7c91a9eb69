//! Saved offers keyed by their deterministic id.

use crate::dokotoku::Offer;
use crate::store::{item_id, load_json, now_ms, save_json};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteItem {
    pub id: String,
    pub result: Offer,
    /// Keyword the offer was found with
    pub keyword: String,
    /// Milliseconds since the epoch
    pub added_at: i64,
}

#[derive(Debug, Default)]
pub struct Favorites {
    path: Option<PathBuf>,
    items: Vec<FavoriteItem>,
}

impl Favorites {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut items: Vec<FavoriteItem> = load_json(&path)?;
        items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(Self { path: Some(path), items })
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Favorites, newest first.
    pub fn items(&self) -> &[FavoriteItem] {
        &self.items
    }

    pub fn id_for(offer: &Offer) -> String {
        item_id(&offer.site, &offer.title, &offer.original_url)
    }

    pub fn contains(&self, offer: &Offer) -> bool {
        let id = Self::id_for(offer);
        self.items.iter().any(|f| f.id == id)
    }

    /// Adds an offer. Returns false if it was already a favorite.
    pub fn add(&mut self, offer: &Offer, keyword: &str) -> bool {
        self.add_at(offer, keyword, now_ms())
    }

    pub fn add_at(&mut self, offer: &Offer, keyword: &str, now: i64) -> bool {
        if self.contains(offer) {
            return false;
        }
        self.items.insert(
            0,
            FavoriteItem { id: Self::id_for(offer), result: offer.clone(), keyword: keyword.trim().to_string(), added_at: now },
        );
        true
    }

    /// Removes by id. Returns false if nothing matched.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|f| f.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => save_json(path, &self.items),
            None => Ok(()),
        }
    }
}
