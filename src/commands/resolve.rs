//! Referral link resolution commands.

use crate::affiliate::{AffiliateResolver, BatchItem};
use crate::commands::{resolver, site_client};
use crate::config::{Config, OutputFormat};
use crate::dokotoku::{RedirectFollower, SearchResponse};
use crate::format::Formatter;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Accepted batch files: a saved search response or a bare list of links.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchInput {
    Response(SearchResponse),
    Items(Vec<BatchItem>),
}

impl BatchInput {
    fn into_items(self) -> Vec<BatchItem> {
        match self {
            BatchInput::Response(response) => response.results.iter().map(BatchItem::from).collect(),
            BatchInput::Items(items) => items,
        }
    }
}

/// Reads batch items from a JSON file.
pub fn load_batch(path: &Path) -> Result<Vec<BatchItem>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let input: BatchInput = serde_json::from_str(&content).with_context(|| {
        format!("{} is neither a search response nor a list of {{site, originalUrl}}", path.display())
    })?;
    Ok(input.into_items())
}

/// Rewrites offer links with configured referral values.
pub struct ResolveCommand {
    config: Config,
}

impl ResolveCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn resolver(&self, follower: Arc<dyn RedirectFollower>) -> AffiliateResolver {
        resolver(&self.config, follower)
    }

    /// Resolves one link. Prints the original when it cannot be rewritten.
    pub async fn execute(&self, url: &str, site: &str) -> Result<String> {
        self.execute_with_follower(site_client(&self.config), url, site).await
    }

    /// Resolves one link with a provided follower (for testing).
    pub async fn execute_with_follower(
        &self,
        follower: Arc<dyn RedirectFollower>,
        url: &str,
        site: &str,
    ) -> Result<String> {
        if url.trim().is_empty() || site.trim().is_empty() {
            bail!("Both a URL and a site name are required");
        }

        let resolved = self.resolver(follower).resolve_or_original(url.trim(), site).await;

        Ok(match self.config.format {
            OutputFormat::Json => {
                let mut map = BTreeMap::new();
                map.insert(url.trim().to_string(), resolved);
                Formatter::new(self.config.format).format_resolved(&map)
            }
            _ => resolved,
        })
    }

    /// Resolves every link in a batch file.
    pub async fn execute_batch(&self, path: &Path) -> Result<String> {
        self.execute_batch_with_follower(site_client(&self.config), path).await
    }

    /// Resolves a batch file with a provided follower (for testing).
    pub async fn execute_batch_with_follower(
        &self,
        follower: Arc<dyn RedirectFollower>,
        path: &Path,
    ) -> Result<String> {
        let items = load_batch(path)?;
        info!("Resolving {} links from {}", items.len(), path.display());

        let resolved: BTreeMap<String, String> =
            self.resolver(follower).resolve_batch(&items).await.into_iter().collect();

        Ok(Formatter::new(self.config.format).format_resolved(&resolved))
    }
}
