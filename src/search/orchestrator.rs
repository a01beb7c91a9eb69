//! Keyword search behind a cache and an overall deadline.

use crate::dokotoku::{Extractor, Offer, PageSource, SearchResponse};
use crate::error::{SearchError, SessionError};
use crate::search::cache::SearchCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default overall deadline for one search.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(25);

/// Error text of a search that hit the deadline.
pub const TIMEOUT_ERROR: &str = "timeout";

/// Composes page rendering, extraction and the cache.
pub struct SearchOrchestrator {
    source: Arc<dyn PageSource>,
    cache: Arc<SearchCache>,
    extractor: Arc<Extractor>,
    deadline: Duration,
    debug_dump: bool,
}

impl SearchOrchestrator {
    pub fn new(source: Arc<dyn PageSource>, cache: Arc<SearchCache>) -> Self {
        Self {
            source,
            cache,
            extractor: Arc::new(Extractor::new()),
            deadline: DEFAULT_DEADLINE,
            debug_dump: false,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Logs page structure when a search extracts nothing.
    pub fn with_debug_dump(mut self, enabled: bool) -> Self {
        self.debug_dump = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    /// Searches for a keyword.
    ///
    /// Only an empty keyword is an error. Every other failure comes back as
    /// a response with `success == false`. Timeouts are not cached, so the
    /// next call tries again.
    pub async fn search(&self, keyword: &str) -> Result<SearchResponse, SearchError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(SearchError::EmptyKeyword);
        }

        if let Some(mut cached) = self.cache.lookup(keyword) {
            info!("Returning cached results for '{}'", keyword);
            cached.keyword = keyword.to_string();
            return Ok(cached);
        }

        // The scrape runs as its own task so an abandoned search still
        // finishes and releases its browser session.
        let task = tokio::spawn(scrape(
            self.source.clone(),
            self.extractor.clone(),
            keyword.to_string(),
            self.debug_dump,
        ));

        match tokio::time::timeout(self.deadline, task).await {
            Ok(Ok(Scraped { response, cacheable })) => {
                if cacheable {
                    self.cache.store(keyword, response.clone());
                }
                Ok(response)
            }
            Ok(Err(e)) => {
                warn!("Search task for '{}' failed: {}", keyword, e);
                Ok(SearchResponse::failure(keyword, "search failed"))
            }
            Err(_) => {
                warn!("Search for '{}' exceeded {}s deadline", keyword, self.deadline.as_secs());
                Ok(SearchResponse::failure(keyword, TIMEOUT_ERROR))
            }
        }
    }
}

/// Outcome of one scrape and whether it may be cached.
struct Scraped {
    response: SearchResponse,
    cacheable: bool,
}

impl From<SearchResponse> for Scraped {
    fn from(response: SearchResponse) -> Self {
        Self { response, cacheable: true }
    }
}

/// Renders, extracts and normalizes. Never fails; failures become responses.
async fn scrape(
    source: Arc<dyn PageSource>,
    extractor: Arc<Extractor>,
    keyword: String,
    debug_dump: bool,
) -> Scraped {
    let html = match source.render_search(&keyword).await {
        Ok(html) => html,
        Err(SessionError::NavigationTimeout { url, secs }) => {
            // Transient; the next search retries the page.
            info!("Navigation to {} timed out after {}s, reporting no results", url, secs);
            return Scraped { response: SearchResponse::success(keyword, Vec::new()), cacheable: false };
        }
        Err(e) => {
            warn!("Rendering search page failed: {}", e);
            return SearchResponse::failure(keyword, e.to_string()).into();
        }
    };

    let extraction = match extractor.extract(&html) {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!("Extraction failed: {}", e);
            return SearchResponse::failure(keyword, e.to_string()).into();
        }
    };

    match extraction.strategy {
        Some(strategy) => debug!("Extracted {} offers with '{}' strategy", extraction.offers.len(), strategy),
        None if debug_dump => {
            let structure = Extractor::describe_structure(&html);
            info!(
                "No offers for '{}': {} tables, {} rows, {} cells, {} links, classes {:?}",
                keyword, structure.tables, structure.rows, structure.cells, structure.links, structure.class_names
            );
        }
        None => debug!("No offers for '{}'", keyword),
    }

    let offers: Vec<Offer> = extraction.offers.into_iter().map(Offer::from_raw).collect();
    SearchResponse::success(keyword, offers).into()
}
