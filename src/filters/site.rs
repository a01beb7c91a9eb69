//! Partner site filter.

use super::Filter;
use crate::affiliate::{normalize_site_name, Partner};
use crate::dokotoku::Offer;

/// Keeps offers whose site is one of a set of names.
///
/// A name matches either verbatim or by resolving to the same partner, so
/// `moppy` selects offers listed as `モッピー`.
pub struct SiteFilter {
    names: Vec<String>,
    partners: Vec<Partner>,
}

impl SiteFilter {
    pub fn new(sites: Vec<String>) -> Self {
        let names: Vec<String> =
            sites.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        let mut partners: Vec<Partner> = names.iter().filter_map(|s| normalize_site_name(s)).collect();
        partners.dedup();
        Self { names, partners }
    }
}

impl Filter for SiteFilter {
    fn matches(&self, offer: &Offer) -> bool {
        if self.names.is_empty() {
            return true;
        }

        let site = offer.site.trim();
        if self.names.iter().any(|n| n == site) {
            return true;
        }

        normalize_site_name(site).is_some_and(|p| self.partners.contains(&p))
    }

    fn description(&self) -> String {
        if self.names.is_empty() {
            "Sites: any".to_string()
        } else {
            format!("Sites: {}", self.names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::testing::offer;

    fn from(site: &str) -> Offer {
        offer(site, "楽天市場", Some(1.0), None)
    }

    #[test]
    fn test_exact_name() {
        let filter = SiteFilter::new(vec!["モッピー".to_string()]);
        assert!(filter.matches(&from("モッピー")));
        assert!(filter.matches(&from(" モッピー ")));
        assert!(!filter.matches(&from("ハピタス")));
    }

    #[test]
    fn test_alias_matches_partner() {
        let filter = SiteFilter::new(vec!["moppy".to_string()]);
        assert!(filter.matches(&from("モッピー")));
        assert!(!filter.matches(&from("ポイントインカム")));
    }

    #[test]
    fn test_unrecognized_site_needs_exact_match() {
        let filter = SiteFilter::new(vec!["unknown".to_string()]);
        assert!(filter.matches(&from("unknown")));
        assert!(!filter.matches(&from("モッピー")));
    }

    #[test]
    fn test_empty_set_matches_all() {
        let filter = SiteFilter::new(vec![" ".to_string()]);
        assert!(filter.matches(&from("どこでも")));
        assert_eq!(filter.description(), "Sites: any");
    }
}
