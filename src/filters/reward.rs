//! Minimum reward filter.

use super::Filter;
use crate::dokotoku::reward::format_yen;
use crate::dokotoku::Offer;

/// Filters offers by a minimum percentage or yen reward.
///
/// Offers that carry no value of the filtered kind are excluded; an offer
/// paying a flat amount says nothing about a minimum rate.
pub struct RewardFilter {
    min_rate: Option<f64>,
    min_amount: Option<f64>,
}

impl RewardFilter {
    pub fn new(min_rate: Option<f64>, min_amount: Option<f64>) -> Self {
        Self { min_rate, min_amount }
    }

    pub fn min_rate(rate: f64) -> Self {
        Self::new(Some(rate), None)
    }

    pub fn min_amount(amount: f64) -> Self {
        Self::new(None, Some(amount))
    }
}

impl Filter for RewardFilter {
    fn matches(&self, offer: &Offer) -> bool {
        if let Some(min) = self.min_rate {
            match offer.reward_rate {
                Some(rate) if rate >= min => {}
                _ => return false,
            }
        }

        if let Some(min) = self.min_amount {
            match offer.reward_amount {
                Some(amount) if amount >= min => {}
                _ => return false,
            }
        }

        true
    }

    fn description(&self) -> String {
        match (self.min_rate, self.min_amount) {
            (Some(rate), Some(amount)) => format!("Rate: >= {}%; Amount: >= {}円", rate, format_yen(amount)),
            (Some(rate), None) => format!("Rate: >= {}%", rate),
            (None, Some(amount)) => format!("Amount: >= {}円", format_yen(amount)),
            (None, None) => "Reward: any".to_string(),
        }
    }
}
