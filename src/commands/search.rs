//! Search command implementation.

use crate::commands::{data_dir, orchestrator, persisted_cache, site_client};
use crate::config::Config;
use crate::dokotoku::PageSource;
use crate::filters::{sort_offers, FilterChainBuilder, SortBy};
use crate::format::Formatter;
use crate::store::{save_json, DataDir, SearchHistory, ViewedLedger};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Display and bookkeeping options of one search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub sort: SortBy,
    pub sites: Vec<String>,
    pub min_rate: Option<f64>,
    pub min_amount: Option<f64>,
    pub keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    /// Append to history and the viewed ledger
    pub record: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            sort: SortBy::None,
            sites: Vec::new(),
            min_rate: None,
            min_amount: None,
            keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            record: true,
        }
    }
}

/// Executes a keyword search.
pub struct SearchCommand {
    config: Config,
    options: SearchOptions,
}

impl SearchCommand {
    pub fn new(config: Config, options: SearchOptions) -> Self {
        Self { config, options }
    }

    /// Executes the search and returns formatted output.
    pub async fn execute(&self, keyword: &str) -> Result<String> {
        let data = data_dir(&self.config)?;
        self.execute_with_source(site_client(&self.config), &data, keyword).await
    }

    /// Executes the search with a provided page source (for testing).
    ///
    /// The stored result is the unfiltered response; filters and sorting
    /// only shape what is printed.
    pub async fn execute_with_source(
        &self,
        source: Arc<dyn PageSource>,
        data: &DataDir,
        keyword: &str,
    ) -> Result<String> {
        let cache = persisted_cache(&self.config, data);
        let orchestrator = orchestrator(&self.config, source, cache.clone());

        let response = orchestrator.search(keyword).await?;
        save_json(&data.cache(), &cache.snapshot()).context("Failed to save result cache")?;

        if self.options.record && response.success {
            self.record(data, &response.keyword, &response.results)?;
        }

        let filters = FilterChainBuilder::new()
            .sites(self.options.sites.clone())
            .min_rate(self.options.min_rate)
            .min_amount(self.options.min_amount)
            .keywords(self.options.keywords.clone())
            .exclude_keywords(self.options.exclude_keywords.clone())
            .build();

        if !filters.is_empty() {
            debug!("Active filters: {}", filters.descriptions().join(", "));
        }

        let mut shown = response;
        let total = shown.count();
        shown.results = filters.apply(shown.results);
        sort_offers(&mut shown.results, self.options.sort);

        info!("Showing {} of {} offers", shown.count(), total);

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_response(&shown))
    }

    fn record(&self, data: &DataDir, keyword: &str, offers: &[crate::dokotoku::Offer]) -> Result<()> {
        let mut history = SearchHistory::open(data.history())?;
        history.add(keyword, Some(offers.len()));
        history.save()?;

        let mut viewed = ViewedLedger::open(data.viewed())?;
        let recorded = viewed.upsert_all(offers);
        viewed.save()?;

        debug!("Recorded search '{}' and {} viewed offers", keyword, recorded);
        Ok(())
    }
}
