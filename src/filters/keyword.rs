//! Keyword-based title filtering.

use super::Filter;
use crate::dokotoku::Offer;

/// Filters offers by keywords in the title.
pub struct KeywordFilter {
    /// Keywords that must appear in the title.
    required: Vec<String>,
    /// Keywords that must NOT appear in the title.
    excluded: Vec<String>,
}

impl KeywordFilter {
    /// Creates a new keyword filter. Blank keywords are dropped.
    pub fn new(required: Vec<String>, excluded: Vec<String>) -> Self {
        Self { required: normalize(required), excluded: normalize(excluded) }
    }

    /// Creates a filter with only required keywords.
    pub fn required(keywords: Vec<String>) -> Self {
        Self::new(keywords, Vec::new())
    }

    /// Creates a filter with only excluded keywords.
    pub fn excluded(keywords: Vec<String>) -> Self {
        Self::new(Vec::new(), keywords)
    }
}

fn normalize(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl Filter for KeywordFilter {
    fn matches(&self, offer: &Offer) -> bool {
        let title = offer.title.to_lowercase();

        if !self.required.iter().all(|k| title.contains(k.as_str())) {
            return false;
        }

        !self.excluded.iter().any(|k| title.contains(k.as_str()))
    }

    fn description(&self) -> String {
        let mut parts = Vec::new();

        if !self.required.is_empty() {
            parts.push(format!("Must contain: {}", self.required.join(", ")));
        }

        if !self.excluded.is_empty() {
            parts.push(format!("Must not contain: {}", self.excluded.join(", ")));
        }

        if parts.is_empty() {
            "Keywords: any".to_string()
        } else {
            parts.join("; ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::testing::offer;

    fn titled(title: &str) -> Offer {
        offer("モッピー", title, Some(1.0), None)
    }

    #[test]
    fn test_required_keywords() {
        let filter = KeywordFilter::required(vec!["楽天".to_string(), "カード".to_string()]);

        assert!(filter.matches(&titled("楽天カード 新規発行")));
        assert!(!filter.matches(&titled("楽天市場")));
        assert!(!filter.matches(&titled("三井住友カード")));
    }

    #[test]
    fn test_excluded_keywords() {
        let filter = KeywordFilter::excluded(vec!["法人".to_string(), "ゴールド".to_string()]);

        assert!(filter.matches(&titled("楽天カード")));
        assert!(!filter.matches(&titled("法人カード")));
        assert!(!filter.matches(&titled("ゴールドカード")));
    }

    #[test]
    fn test_both_required_and_excluded() {
        let filter = KeywordFilter::new(vec!["card".to_string()], vec!["gold".to_string()]);

        assert!(filter.matches(&titled("Rakuten Card")));
        assert!(!filter.matches(&titled("Rakuten Travel")));
        assert!(!filter.matches(&titled("Rakuten Gold Card")));
    }

    #[test]
    fn test_case_insensitivity() {
        let filter = KeywordFilter::required(vec!["VISA".to_string()]);
        assert!(filter.matches(&titled("visa カード")));
        assert!(filter.matches(&titled("Visa カード")));
    }

    #[test]
    fn test_blank_keywords_ignored() {
        let filter = KeywordFilter::new(vec!["  ".to_string()], vec![String::new()]);
        assert!(filter.matches(&titled("Anything at all")));
        assert_eq!(filter.description(), "Keywords: any");
    }

    #[test]
    fn test_description_both() {
        let filter = KeywordFilter::new(vec!["Card".to_string()], vec!["gold".to_string()]);
        assert_eq!(filter.description(), "Must contain: card; Must not contain: gold");
    }
}
