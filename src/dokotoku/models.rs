//! Data models for extracted offers and search responses.

use crate::dokotoku::reward::{parse_reward, ParsedReward};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed identifier of the comparison site results come from.
pub const SOURCE_ID: &str = "dokotoku";

/// Site name used when the partner cell could not be read.
pub const UNKNOWN_SITE: &str = "unknown";

/// An offer as it appears in the page, before reward normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOffer {
    /// Partner display name
    pub site: String,
    /// Offer headline
    pub title: String,
    /// Reward cell text, verbatim
    pub reward_text: String,
    /// Absolute URL on the comparison site
    pub original_url: String,
}

/// A normalized point-back offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// Partner display name ("unknown" when unparseable)
    pub site: String,
    /// Offer headline
    pub title: String,
    /// Human-readable reward
    pub reward: String,
    /// Reward as a percentage (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_rate: Option<f64>,
    /// Reward as a yen amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<f64>,
    /// Link on the comparison site (often a redirector)
    pub original_url: String,
}

impl Offer {
    /// Runs the reward parser over the raw reward text.
    pub fn from_raw(raw: RawOffer) -> Self {
        let ParsedReward { reward_rate, reward_amount, reward } = parse_reward(&raw.reward_text);
        Self {
            site: raw.site,
            title: raw.title,
            reward,
            reward_rate,
            reward_amount,
            original_url: raw.original_url,
        }
    }

    /// Returns true if neither numeric reward field was parsed.
    pub fn is_informational(&self) -> bool {
        self.reward_rate.is_none() && self.reward_amount.is_none()
    }
}

/// Response of a keyword search, as served by the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub keyword: String,
    pub source: String,
    pub results: Vec<Offer>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SearchResponse {
    /// Creates a successful response.
    pub fn success(keyword: impl Into<String>, results: Vec<Offer>) -> Self {
        Self {
            keyword: keyword.into(),
            source: SOURCE_ID.to_string(),
            results,
            success: true,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a failed response. Failed responses never carry results.
    pub fn failure(keyword: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            source: SOURCE_ID.to_string(),
            results: Vec::new(),
            success: false,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    /// Returns the number of offers.
    pub fn count(&self) -> usize {
        self.results.len()
    }

    /// Returns true if there are no offers.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(reward_text: &str) -> RawOffer {
        RawOffer {
            site: "モッピー".to_string(),
            title: "楽天カード新規発行".to_string(),
            reward_text: reward_text.to_string(),
            original_url: "https://dokotoku.jp/link/123".to_string(),
        }
    }

    #[test]
    fn test_offer_from_raw_rate() {
        let offer = Offer::from_raw(raw("1.5%"));
        assert_eq!(offer.reward_rate, Some(1.5));
        assert_eq!(offer.reward_amount, None);
        assert_eq!(offer.reward, "1.5%");
        assert!(!offer.is_informational());
    }

    #[test]
    fn test_offer_from_raw_informational() {
        let offer = Offer::from_raw(raw("  要確認  "));
        assert!(offer.is_informational());
        assert_eq!(offer.reward, "要確認");
    }

    #[test]
    fn test_offer_json_is_camel_case() {
        let offer = Offer::from_raw(raw("3,000円"));
        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["rewardAmount"], 3000.0);
        assert_eq!(json["originalUrl"], "https://dokotoku.jp/link/123");
        assert!(json.get("rewardRate").is_none());
    }

    #[test]
    fn test_failure_response_has_no_results() {
        let response = SearchResponse::failure("カード", "browser launch failed");
        assert!(!response.success);
        assert!(response.is_empty());
        assert_eq!(response.source, "dokotoku");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "browser launch failed");
        assert_eq!(json["results"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_success_response_omits_error() {
        let response = SearchResponse::success("カード", vec![Offer::from_raw(raw("50"))]);
        assert_eq!(response.count(), 1);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["success"], true);
    }
}
