//! Offer filtering and ordering with composable filters.

pub mod keyword;
pub mod reward;
pub mod site;
pub mod sort;

use crate::dokotoku::Offer;

pub use keyword::KeywordFilter;
pub use reward::RewardFilter;
pub use site::SiteFilter;
pub use sort::{sort_offers, SortBy};

/// Trait for filtering offers.
pub trait Filter: Send + Sync {
    /// Returns true if the offer passes the filter.
    fn matches(&self, offer: &Offer) -> bool;

    /// Returns a description of this filter.
    fn description(&self) -> String;
}

/// A chain of filters that must all pass.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Creates an empty filter chain.
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Adds a filter to the chain.
    pub fn add(&mut self, filter: impl Filter + 'static) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Checks if an offer passes all filters.
    pub fn matches(&self, offer: &Offer) -> bool {
        self.filters.iter().all(|f| f.matches(offer))
    }

    /// Filters a collection of offers, keeping their order.
    pub fn apply(&self, offers: Vec<Offer>) -> Vec<Offer> {
        offers.into_iter().filter(|o| self.matches(o)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns descriptions of all filters.
    pub fn descriptions(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.description()).collect()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing a FilterChain from command-line options.
pub struct FilterChainBuilder {
    chain: FilterChain,
}

impl FilterChainBuilder {
    pub fn new() -> Self {
        Self { chain: FilterChain::new() }
    }

    /// Keeps only offers from the given partner sites.
    pub fn sites(mut self, sites: Vec<String>) -> Self {
        if sites.iter().any(|s| !s.trim().is_empty()) {
            self.chain.add(SiteFilter::new(sites));
        }
        self
    }

    /// Adds a minimum percentage reward filter.
    pub fn min_rate(mut self, min: Option<f64>) -> Self {
        if let Some(min) = min {
            self.chain.add(RewardFilter::min_rate(min));
        }
        self
    }

    /// Adds a minimum yen reward filter.
    pub fn min_amount(mut self, min: Option<f64>) -> Self {
        if let Some(min) = min {
            self.chain.add(RewardFilter::min_amount(min));
        }
        self
    }

    /// Adds required keywords filter.
    pub fn keywords(mut self, keywords: Vec<String>) -> Self {
        if !keywords.is_empty() {
            self.chain.add(KeywordFilter::required(keywords));
        }
        self
    }

    /// Adds excluded keywords filter.
    pub fn exclude_keywords(mut self, keywords: Vec<String>) -> Self {
        if !keywords.is_empty() {
            self.chain.add(KeywordFilter::excluded(keywords));
        }
        self
    }

    pub fn build(self) -> FilterChain {
        self.chain
    }
}

impl Default for FilterChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::dokotoku::Offer;

    pub fn offer(site: &str, title: &str, rate: Option<f64>, amount: Option<f64>) -> Offer {
        Offer {
            site: site.to_string(),
            title: title.to_string(),
            reward: String::new(),
            reward_rate: rate,
            reward_amount: amount,
            original_url: format!("https://dokotoku.jp/link/{}", title.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::offer;
    use super::*;

    #[test]
    fn test_filter_chain_new() {
        let chain = FilterChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn test_filter_chain_empty_matches_all() {
        let chain = FilterChain::default();
        assert!(chain.matches(&offer("unknown", "何でも", None, None)));
    }

    #[test]
    fn test_filter_chain_all_must_pass() {
        let mut chain = FilterChain::new();
        chain.add(SiteFilter::new(vec!["モッピー".to_string()]));
        chain.add(RewardFilter::min_rate(1.0));

        assert_eq!(chain.len(), 2);
        assert!(chain.matches(&offer("モッピー", "楽天市場", Some(1.5), None)));
        assert!(!chain.matches(&offer("モッピー", "楽天市場", Some(0.5), None)));
        assert!(!chain.matches(&offer("ハピタス", "楽天市場", Some(1.5), None)));
    }

    #[test]
    fn test_filter_chain_apply_keeps_order() {
        let mut chain = FilterChain::new();
        chain.add(RewardFilter::min_amount(1000.0));

        let offers = vec![
            offer("a", "first", None, Some(3000.0)),
            offer("b", "second", None, Some(500.0)),
            offer("c", "third", None, Some(1000.0)),
        ];

        let titles: Vec<String> = chain.apply(offers).into_iter().map(|o| o.title).collect();
        assert_eq!(titles, vec!["first", "third"]);
    }

    #[test]
    fn test_filter_chain_descriptions() {
        let chain = FilterChainBuilder::new()
            .sites(vec!["モッピー".to_string()])
            .min_rate(Some(2.0))
            .keywords(vec!["カード".to_string()])
            .build();

        let descriptions = chain.descriptions();
        assert_eq!(descriptions.len(), 3);
        assert!(descriptions[0].contains("Sites"));
        assert!(descriptions[1].contains("Rate"));
        assert!(descriptions[2].contains("Must contain"));
    }

    #[test]
    fn test_filter_chain_builder_no_filters_when_disabled() {
        let chain = FilterChainBuilder::new()
            .sites(Vec::new())
            .sites(vec!["  ".to_string()])
            .min_rate(None)
            .min_amount(None)
            .keywords(Vec::new())
            .exclude_keywords(Vec::new())
            .build();

        assert!(chain.is_empty());
    }

    #[test]
    fn test_all_filters_combined() {
        let chain = FilterChainBuilder::new()
            .sites(vec!["moppy".to_string(), "ハピタス".to_string()])
            .min_amount(Some(1000.0))
            .keywords(vec!["カード".to_string()])
            .exclude_keywords(vec!["法人".to_string()])
            .build();

        assert_eq!(chain.len(), 4);
        assert!(chain.matches(&offer("モッピー", "楽天カード", None, Some(8000.0))));
        assert!(!chain.matches(&offer("モッピー", "法人カード", None, Some(8000.0))));
        assert!(!chain.matches(&offer("げん玉", "楽天カード", None, Some(8000.0))));
        assert!(!chain.matches(&offer("ハピタス", "楽天カード", None, Some(800.0))));
    }
}
