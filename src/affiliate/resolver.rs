//! Referral link resolution, one link at a time or in throttled batches.

use crate::affiliate::rules::AffiliateRules;
use crate::config::AffiliateSettings;
use crate::dokotoku::client::{is_redirector, is_source_site};
use crate::dokotoku::{Offer, RedirectFollower};
use crate::error::{SessionError, Unresolved};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on links resolved concurrently.
pub const MAX_BATCH_SIZE: usize = 10;

/// A link to resolve in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub site: String,
    pub original_url: String,
}

impl From<&Offer> for BatchItem {
    fn from(offer: &Offer) -> Self {
        Self { site: offer.site.clone(), original_url: offer.original_url.clone() }
    }
}

/// Rewrites offer links so they carry the operator's referral values.
pub struct AffiliateResolver {
    rules: AffiliateRules,
    follower: Arc<dyn RedirectFollower>,
    redirect_timeout: Duration,
    batch_size: usize,
    batch_pause: Duration,
    batch_jitter_ms: u64,
}

impl AffiliateResolver {
    pub fn new(rules: AffiliateRules, follower: Arc<dyn RedirectFollower>) -> Self {
        Self::from_settings(rules, follower, &AffiliateSettings::default())
    }

    pub fn from_settings(
        rules: AffiliateRules,
        follower: Arc<dyn RedirectFollower>,
        settings: &AffiliateSettings,
    ) -> Self {
        Self {
            rules,
            follower,
            redirect_timeout: Duration::from_secs(settings.redirect_timeout_secs),
            batch_size: settings.batch_size.clamp(1, MAX_BATCH_SIZE),
            batch_pause: Duration::from_millis(settings.batch_pause_ms),
            batch_jitter_ms: settings.batch_jitter_ms,
        }
    }

    pub fn with_redirect_timeout(mut self, timeout: Duration) -> Self {
        self.redirect_timeout = timeout;
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub fn rules(&self) -> &AffiliateRules {
        &self.rules
    }

    /// Resolves one link.
    ///
    /// Redirector links on the comparison site are followed first; the
    /// partner's parameter is then injected into wherever they landed.
    /// Every `Err` means "use the original link".
    pub async fn resolve(&self, original_url: &str, site: &str) -> Result<String, Unresolved> {
        let rule = self.rules.for_site(site)?;

        let target = if is_redirector(original_url) {
            self.follow(original_url).await?
        } else {
            original_url.to_string()
        };

        let rewritten = rule.apply(&target)?;
        debug!("Rewrote {} -> {}", original_url, rewritten);
        Ok(rewritten)
    }

    /// Resolves one link, falling back to the original on any failure.
    pub async fn resolve_or_original(&self, original_url: &str, site: &str) -> String {
        match self.resolve(original_url, site).await {
            Ok(url) => url,
            Err(reason @ Unresolved::RuleMissing(_)) => {
                info!("{}", reason);
                original_url.to_string()
            }
            Err(reason) => {
                warn!("Using original link {}: {}", original_url, reason);
                original_url.to_string()
            }
        }
    }

    async fn follow(&self, url: &str) -> Result<String, Unresolved> {
        // Spawned so that hitting the cap abandons the task instead of
        // dropping it, and the browser session still closes.
        let follower = self.follower.clone();
        let target = url.to_string();
        let task = tokio::spawn(async move { follower.follow(&target).await });

        let landed = match tokio::time::timeout(self.redirect_timeout, task).await {
            Err(_) | Ok(Ok(Err(SessionError::NavigationTimeout { .. }))) => {
                return Err(Unresolved::Timeout(url.to_string()))
            }
            Ok(Err(e)) => {
                warn!("Redirect task for {} failed: {}", url, e);
                return Err(Unresolved::RedirectUnresolved(url.to_string()));
            }
            Ok(Ok(Err(e))) => return Err(e.into()),
            Ok(Ok(Ok(landed))) => landed,
        };

        match landed {
            Some(final_url) if !is_source_site(&final_url) => Ok(final_url),
            _ => Err(Unresolved::RedirectUnresolved(url.to_string())),
        }
    }

    /// Resolves many links in fixed-size groups.
    ///
    /// A group fully settles before the next one starts, with a pause in
    /// between. Links that fail to resolve are absent from the result.
    pub async fn resolve_batch(&self, items: &[BatchItem]) -> HashMap<String, String> {
        let mut resolved = HashMap::new();
        let groups = items.len().div_ceil(self.batch_size);

        for (index, group) in items.chunks(self.batch_size).enumerate() {
            debug!("Resolving group {}/{} ({} links)", index + 1, groups, group.len());

            let futures: Vec<_> = group
                .iter()
                .map(|item| async move { (item, self.resolve(&item.original_url, &item.site).await) })
                .collect();

            for (item, result) in futures::future::join_all(futures).await {
                match result {
                    Ok(url) => {
                        resolved.insert(item.original_url.clone(), url);
                    }
                    Err(reason) => debug!("Skipping {}: {}", item.original_url, reason),
                }
            }

            if index + 1 < groups {
                self.pause().await;
            }
        }

        info!("Resolved {}/{} links", resolved.len(), items.len());
        resolved
    }

    async fn pause(&self) {
        let jitter = if self.batch_jitter_ms > 0 {
            rand::rng().random_range(0..=self.batch_jitter_ms)
        } else {
            0
        };
        let total = self.batch_pause + Duration::from_millis(jitter);
        if !total.is_zero() {
            tokio::time::sleep(total).await;
        }
    }
}
