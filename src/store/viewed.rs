//! Ledger of every offer seen in search results.
//!
//! Repeated sightings of the same offer grow its record: the view count goes
//! up by one, the best rate and amount ever seen only increase, and a bounded
//! reward history keeps the most recent points.

use crate::dokotoku::reward::{truncate_display, DISPLAY_LIMIT};
use crate::dokotoku::Offer;
use crate::store::{item_id, load_json, now_ms, save_json};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reward points kept per offer.
pub const MAX_HISTORY_PER_ITEM: usize = 50;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<f64>,
    pub viewed_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedItem {
    pub id: String,
    pub site: String,
    pub title: String,
    pub original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<f64>,
    pub reward: String,
    pub first_viewed_at: i64,
    pub last_viewed_at: i64,
    pub view_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reward_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reward_amount: Option<f64>,
    #[serde(default)]
    pub history: Vec<RewardPoint>,
}

/// Best rewards seen so far, and whether a new sighting beats them.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxReward {
    pub max_reward_rate: Option<f64>,
    pub max_reward_amount: Option<f64>,
    pub is_new_max: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedStats {
    pub total_items: usize,
    pub total_views: u64,
    pub items_with_max_reward: usize,
}

fn max_option(current: Option<f64>, seen: Option<f64>) -> Option<f64> {
    match (current, seen) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[derive(Debug, Default)]
pub struct ViewedLedger {
    path: Option<PathBuf>,
    items: Vec<ViewedItem>,
}

impl ViewedLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = load_json(&path)?;
        Ok(Self { path: Some(path), items })
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Items, most recently viewed first.
    pub fn items(&self) -> Vec<&ViewedItem> {
        let mut items: Vec<&ViewedItem> = self.items.iter().collect();
        items.sort_by(|a, b| b.last_viewed_at.cmp(&a.last_viewed_at));
        items
    }

    pub fn get(&self, offer: &Offer) -> Option<&ViewedItem> {
        let id = item_id(&offer.site, &offer.title, &offer.original_url);
        self.items.iter().find(|item| item.id == id)
    }

    /// Records one sighting of an offer.
    pub fn upsert(&mut self, offer: &Offer) -> &ViewedItem {
        self.upsert_at(offer, now_ms())
    }

    pub fn upsert_at(&mut self, offer: &Offer, now: i64) -> &ViewedItem {
        let id = item_id(&offer.site, &offer.title, &offer.original_url);
        let point = RewardPoint { reward_rate: offer.reward_rate, reward_amount: offer.reward_amount, viewed_at: now };
        let reward = truncate_display(&offer.reward, DISPLAY_LIMIT);

        let index = match self.items.iter().position(|item| item.id == id) {
            Some(index) => {
                let item = &mut self.items[index];
                item.last_viewed_at = now;
                item.view_count += 1;
                item.reward_rate = offer.reward_rate;
                item.reward_amount = offer.reward_amount;
                item.reward = reward;
                item.max_reward_rate = max_option(item.max_reward_rate, offer.reward_rate);
                item.max_reward_amount = max_option(item.max_reward_amount, offer.reward_amount);
                item.history.push(point);
                if item.history.len() > MAX_HISTORY_PER_ITEM {
                    let excess = item.history.len() - MAX_HISTORY_PER_ITEM;
                    item.history.drain(..excess);
                }
                index
            }
            None => {
                self.items.push(ViewedItem {
                    id,
                    site: offer.site.clone(),
                    title: offer.title.clone(),
                    original_url: offer.original_url.clone(),
                    reward_rate: offer.reward_rate,
                    reward_amount: offer.reward_amount,
                    reward,
                    first_viewed_at: now,
                    last_viewed_at: now,
                    view_count: 1,
                    max_reward_rate: offer.reward_rate,
                    max_reward_amount: offer.reward_amount,
                    history: vec![point],
                });
                self.items.len() - 1
            }
        };

        &self.items[index]
    }

    /// Records every offer of a result list. Returns how many were recorded.
    pub fn upsert_all(&mut self, offers: &[Offer]) -> usize {
        let now = now_ms();
        for offer in offers {
            self.upsert_at(offer, now);
        }
        offers.len()
    }

    /// Compares an offer with the best rewards recorded for it.
    pub fn max_reward(&self, offer: &Offer) -> MaxReward {
        let Some(item) = self.get(offer) else {
            return MaxReward {
                max_reward_rate: offer.reward_rate,
                max_reward_amount: offer.reward_amount,
                is_new_max: true,
            };
        };

        let beats = |seen: Option<f64>, best: Option<f64>| match (seen, best) {
            (Some(s), Some(b)) => s > b,
            (Some(_), None) => true,
            (None, _) => false,
        };

        MaxReward {
            max_reward_rate: item.max_reward_rate,
            max_reward_amount: item.max_reward_amount,
            is_new_max: beats(offer.reward_rate, item.max_reward_rate)
                || beats(offer.reward_amount, item.max_reward_amount),
        }
    }

    pub fn stats(&self) -> ViewedStats {
        ViewedStats {
            total_items: self.items.len(),
            total_views: self.items.iter().map(|i| u64::from(i.view_count)).sum(),
            items_with_max_reward: self
                .items
                .iter()
                .filter(|i| i.max_reward_rate.is_some() || i.max_reward_amount.is_some())
                .count(),
        }
    }

    /// Drops items not viewed within `days` and prunes older history points.
    /// Returns the number of items removed.
    pub fn cleanup(&mut self, days: u32) -> usize {
        self.cleanup_at(days, now_ms())
    }

    pub fn cleanup_at(&mut self, days: u32, now: i64) -> usize {
        let cutoff = now - i64::from(days) * DAY_MS;
        let before = self.items.len();
        self.items.retain(|item| item.last_viewed_at >= cutoff);
        for item in &mut self.items {
            item.history.retain(|point| point.viewed_at >= cutoff);
        }
        before - self.items.len()
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
