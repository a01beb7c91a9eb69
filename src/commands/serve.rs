//! Runs the HTTP service.

use crate::commands::{orchestrator, resolver, site_client};
use crate::config::Config;
use crate::search::SearchCache;
use crate::server::{self, AppState};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub struct ServeCommand {
    config: Config,
}

impl ServeCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Builds the service state. The server's cache lives in memory only.
    pub fn state(&self) -> AppState {
        let client = site_client(&self.config);
        let cache = Arc::new(SearchCache::new(self.config.cache_ttl(), self.config.cache_max_entries));
        AppState::new(orchestrator(&self.config, client.clone(), cache), resolver(&self.config, client))
    }

    pub async fn execute(&self) -> Result<()> {
        let state = self.state();
        info!(
            "Affiliate rules configured for {} partners",
            state.resolver.rules().len()
        );
        server::serve(state, &self.config.listen_addr).await
    }
}
