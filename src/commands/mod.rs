//! CLI command implementations.

pub mod favorites;
pub mod history;
pub mod partners;
pub mod resolve;
pub mod search;
pub mod serve;
pub mod viewed;

pub use favorites::FavoritesCommand;
pub use history::HistoryCommand;
pub use partners::PartnersCommand;
pub use resolve::ResolveCommand;
pub use search::{SearchCommand, SearchOptions};
pub use serve::ServeCommand;
pub use viewed::ViewedCommand;

use crate::affiliate::{AffiliateResolver, AffiliateRules};
use crate::browser::{SessionConfig, SessionManager, SystemEnv};
use crate::config::Config;
use crate::dokotoku::{DokotokuClient, PageSource, RedirectFollower};
use crate::search::{CacheEntry, SearchCache, SearchOrchestrator};
use crate::store::{load_json, DataDir};
use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

/// Browser-backed site client for the current process environment.
pub(crate) fn site_client(config: &Config) -> Arc<DokotokuClient> {
    let sessions = SessionManager::new(SessionConfig::resolve(&SystemEnv, &config.browser));
    Arc::new(DokotokuClient::new(sessions))
}

pub(crate) fn orchestrator(config: &Config, source: Arc<dyn PageSource>, cache: Arc<SearchCache>) -> SearchOrchestrator {
    SearchOrchestrator::new(source, cache)
        .with_deadline(config.search_deadline())
        .with_debug_dump(config.debug_dump)
}

pub(crate) fn resolver(config: &Config, follower: Arc<dyn RedirectFollower>) -> AffiliateResolver {
    let rules = AffiliateRules::from_ids(&config.affiliate.ids);
    AffiliateResolver::from_settings(rules, follower, &config.affiliate)
}

pub(crate) fn data_dir(config: &Config) -> Result<DataDir> {
    Ok(DataDir::new(config.data_dir()?))
}

/// Result cache seeded from the data directory. An unreadable cache file
/// starts the cache empty rather than failing the command.
pub(crate) fn persisted_cache(config: &Config, data: &DataDir) -> Arc<SearchCache> {
    let cache = Arc::new(SearchCache::new(config.cache_ttl(), config.cache_max_entries));
    match load_json::<Vec<CacheEntry>>(&data.cache()) {
        Ok(saved) => cache.restore(saved),
        Err(e) => warn!("Ignoring result cache: {:#}", e),
    }
    cache
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::{Config, OutputFormat};
    use crate::dokotoku::{PageSource, RedirectFollower};
    use crate::error::SessionError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    pub const RESULTS_HTML: &str = r#"<html><body><table>
        <tr>
          <td class="cashback">8,000円</td>
          <td class="site-name"><a href="/site/1">モッピー</a></td>
          <td class="article"><a href="/link/100">楽天カード新規発行</a></td>
        </tr>
        <tr>
          <td class="cashback">1.5%</td>
          <td class="site-name"><a href="/site/2">ハピタス</a></td>
          <td class="article"><a href="/link/200">楽天市場でお買い物</a></td>
        </tr>
        <tr>
          <td class="cashback">12%</td>
          <td class="site-name"><a href="/site/3">げん玉</a></td>
          <td class="article"><a href="/link/300">楽天トラベル予約</a></td>
        </tr>
        </table></body></html>"#;

    /// Mock page source for testing.
    pub struct MockSource {
        pub html: Result<String, SessionError>,
        pub calls: AtomicU32,
    }

    impl MockSource {
        pub fn new(html: &str) -> Self {
            Self { html: Ok(html.to_string()), calls: AtomicU32::new(0) }
        }

        pub fn failing(error: SessionError) -> Self {
            Self { html: Err(error), calls: AtomicU32::new(0) }
        }

        pub fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for MockSource {
        async fn render_search(&self, _keyword: &str) -> Result<String, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.html.clone()
        }
    }

    /// Mock follower landing every redirect on one partner page.
    pub struct MockFollower {
        pub landing: Option<String>,
        pub calls: AtomicU32,
    }

    impl MockFollower {
        pub fn landing(url: &str) -> Self {
            Self { landing: Some(url.to_string()), calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl RedirectFollower for MockFollower {
        async fn follow(&self, url: &str) -> Result<Option<String>, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.landing.as_ref().map(|l| format!("{}?from={}", l, url.rsplit('/').next().unwrap_or(""))))
        }
    }

    pub fn make_test_config(dir: &TempDir, format: OutputFormat) -> Config {
        let mut config = Config::new();
        config.format = format;
        config.data_dir = Some(dir.path().to_path_buf());
        config.affiliate.batch_pause_ms = 0;
        config
            .affiliate
            .ids
            .insert("moppy".to_string(), "ref123".to_string());
        config
    }
}
