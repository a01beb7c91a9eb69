//! Display ordering of offers.

use crate::dokotoku::Offer;
use std::cmp::Ordering;

/// Sort key for offer lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Page order
    #[default]
    None,
    /// Highest percentage first
    Rate,
    /// Highest yen amount first
    Amount,
    Site,
    Title,
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "page" => Ok(SortBy::None),
            "rate" | "reward-rate" => Ok(SortBy::Rate),
            "amount" | "reward-amount" => Ok(SortBy::Amount),
            "site" => Ok(SortBy::Site),
            "title" => Ok(SortBy::Title),
            _ => Err(format!("Unknown sort key: {}. Use: none, rate, amount, site, title", s)),
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortBy::None => write!(f, "none"),
            SortBy::Rate => write!(f, "rate"),
            SortBy::Amount => write!(f, "amount"),
            SortBy::Site => write!(f, "site"),
            SortBy::Title => write!(f, "title"),
        }
    }
}

/// Sorts in place. Stable; offers missing the numeric key go last.
pub fn sort_offers(offers: &mut [Offer], by: SortBy) {
    match by {
        SortBy::None => {}
        SortBy::Rate => offers.sort_by(|a, b| descending_present_first(a.reward_rate, b.reward_rate)),
        SortBy::Amount => offers.sort_by(|a, b| descending_present_first(a.reward_amount, b.reward_amount)),
        SortBy::Site => offers.sort_by(|a, b| a.site.cmp(&b.site)),
        SortBy::Title => offers.sort_by(|a, b| a.title.cmp(&b.title)),
    }
}

fn descending_present_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
