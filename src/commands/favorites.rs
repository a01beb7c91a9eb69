//! Favorites command.
//!
//! Offers are added from the cached results of an earlier search, picked by
//! their 1-based position in that result list.

use crate::commands::{data_dir, persisted_cache};
use crate::config::Config;
use crate::format::Formatter;
use crate::store::{DataDir, Favorites};
use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoritesAction {
    List,
    Add { keyword: String, position: usize },
    Remove(String),
    Clear,
}

pub struct FavoritesCommand {
    config: Config,
}

impl FavoritesCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn execute(&self, action: FavoritesAction) -> Result<String> {
        let data = data_dir(&self.config)?;
        self.execute_in(&data, action)
    }

    pub fn execute_in(&self, data: &DataDir, action: FavoritesAction) -> Result<String> {
        let mut favorites = Favorites::open(data.favorites())?;

        match action {
            FavoritesAction::List => Ok(Formatter::new(self.config.format).format_favorites(favorites.items())),
            FavoritesAction::Add { keyword, position } => {
                let cache = persisted_cache(&self.config, data);
                let response = cache
                    .lookup(&keyword)
                    .with_context(|| format!("No cached results for \"{}\"; search for it first", keyword.trim()))?;

                let Some(offer) = position.checked_sub(1).and_then(|i| response.results.get(i)) else {
                    bail!("No offer #{} in the {} results for \"{}\"", position, response.count(), response.keyword);
                };

                if favorites.add(offer, &response.keyword) {
                    favorites.save()?;
                    Ok(format!("Added {} ({} / {}).", Favorites::id_for(offer), offer.site, offer.title))
                } else {
                    Ok(format!("{} is already a favorite.", offer.title))
                }
            }
            FavoritesAction::Remove(id) => {
                if favorites.remove(id.trim()) {
                    favorites.save()?;
                    Ok(format!("Removed {}.", id.trim()))
                } else {
                    Ok(format!("No favorite with id {}.", id.trim()))
                }
            }
            FavoritesAction::Clear => {
                favorites.clear();
                favorites.save()?;
                Ok("Favorites cleared.".to_string())
            }
        }
    }
}
