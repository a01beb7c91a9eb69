//! Supported partners and their referral parameter rules.

use crate::error::Unresolved;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use url::Url;

/// Point-back programs whose links can carry the operator's referral id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partner {
    Moppy,
    PointIncome,
    Hapitas,
    Ecnavi,
    Chobirich,
    Gendama,
    Warau,
    Fruitmail,
}

/// Separator of Hapitas' composite referral value ("<id>&route=<hint>").
const HAPITAS_ROUTE_SEPARATOR: &str = "&route=";

impl Partner {
    pub const ALL: [Partner; 8] = [
        Partner::Moppy,
        Partner::PointIncome,
        Partner::Hapitas,
        Partner::Ecnavi,
        Partner::Chobirich,
        Partner::Gendama,
        Partner::Warau,
        Partner::Fruitmail,
    ];

    /// Display name as the comparison site writes it.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Partner::Moppy => "モッピー",
            Partner::PointIncome => "ポイントインカム",
            Partner::Hapitas => "ハピタス",
            Partner::Ecnavi => "ECナビ",
            Partner::Chobirich => "ちょびリッチ",
            Partner::Gendama => "げん玉",
            Partner::Warau => "ワラウ",
            Partner::Fruitmail => "フルーツメール",
        }
    }

    /// Key used in `[affiliate.ids]`.
    pub fn key(&self) -> &'static str {
        match self {
            Partner::Moppy => "moppy",
            Partner::PointIncome => "pointincome",
            Partner::Hapitas => "hapitas",
            Partner::Ecnavi => "ecnavi",
            Partner::Chobirich => "chobirich",
            Partner::Gendama => "gendama",
            Partner::Warau => "warau",
            Partner::Fruitmail => "fruitmail",
        }
    }

    /// Environment variable holding the referral value.
    pub fn env_var(&self) -> String {
        format!("POIKATSU_{}_ID", self.key().to_uppercase())
    }

    /// Query parameter carrying the referral value.
    pub fn param_name(&self) -> &'static str {
        match self {
            Partner::PointIncome => "r",
            _ => "af",
        }
    }

    /// Lowercase spellings seen in the wild besides the canonical name.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Partner::Moppy => &["moppy"],
            Partner::PointIncome => &["pointincome", "point income", "pointi"],
            Partner::Hapitas => &["hapitas"],
            Partner::Ecnavi => &["ecnavi", "ec-navi"],
            Partner::Chobirich => &["chobirich"],
            Partner::Gendama => &["gendama"],
            Partner::Warau => &["warau"],
            Partner::Fruitmail => &["fruitmail", "fruit mail"],
        }
    }
}

impl fmt::Display for Partner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

/// Maps a free-form site name onto a partner, ignoring case and surrounding text.
pub fn normalize_site_name(site: &str) -> Option<Partner> {
    let lower = site.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    Partner::ALL.into_iter().find(|partner| {
        partner.aliases().iter().any(|alias| lower.contains(alias))
            || lower.contains(&partner.canonical_name().to_lowercase())
    })
}

/// How to inject one partner's referral value into a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliateRule {
    pub partner: Partner,
    pub param_name: &'static str,
    pub referral_value: String,
}

impl AffiliateRule {
    pub fn new(partner: Partner, referral_value: impl Into<String>) -> Self {
        Self { partner, param_name: partner.param_name(), referral_value: referral_value.into() }
    }

    /// Sets the referral parameter on `url`, replacing any existing value.
    pub fn apply(&self, url: &str) -> Result<String, Unresolved> {
        let mut parsed = Url::parse(url).map_err(|_| Unresolved::InvalidUrl(url.to_string()))?;

        match (self.partner, self.referral_value.split_once(HAPITAS_ROUTE_SEPARATOR)) {
            (Partner::Hapitas, Some((id, route))) => {
                set_query_param(&mut parsed, self.param_name, id);
                set_query_param(&mut parsed, "route", route);
            }
            _ => set_query_param(&mut parsed, self.param_name, &self.referral_value),
        }

        Ok(parsed.to_string())
    }
}

/// Replaces the first `name` pair in place (dropping duplicates) or appends one.
fn set_query_param(url: &mut Url, name: &str, value: &str) {
    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if k != name {
                Some((k.into_owned(), v.into_owned()))
            } else if !replaced {
                replaced = true;
                Some((k.into_owned(), value.to_string()))
            } else {
                None
            }
        })
        .collect();

    let mut query = url.query_pairs_mut();
    query.clear();
    for (k, v) in &pairs {
        query.append_pair(k, v);
    }
    if !replaced {
        query.append_pair(name, value);
    }
}

/// Configured rules, one per partner with a non-empty referral value.
#[derive(Debug, Clone, Default)]
pub struct AffiliateRules {
    rules: HashMap<Partner, AffiliateRule>,
}

impl AffiliateRules {
    /// Builds rules from partner-key to referral-value pairs. Blank values are skipped.
    pub fn from_ids(ids: &BTreeMap<String, String>) -> Self {
        let rules = Partner::ALL
            .into_iter()
            .filter_map(|partner| {
                let value = ids.get(partner.key())?.trim();
                (!value.is_empty()).then(|| (partner, AffiliateRule::new(partner, value)))
            })
            .collect();
        Self { rules }
    }

    pub fn get(&self, partner: Partner) -> Option<&AffiliateRule> {
        self.rules.get(&partner)
    }

    /// Finds the rule for a free-form site name.
    pub fn for_site(&self, site: &str) -> Result<&AffiliateRule, Unresolved> {
        normalize_site_name(site)
            .and_then(|partner| self.get(partner))
            .ok_or_else(|| Unresolved::RuleMissing(site.trim().to_string()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_normalize_site_name() {
        assert_eq!(normalize_site_name("モッピー"), Some(Partner::Moppy));
        assert_eq!(normalize_site_name("  MOPPY "), Some(Partner::Moppy));
        assert_eq!(normalize_site_name("ポイントインカム"), Some(Partner::PointIncome));
        assert_eq!(normalize_site_name("Hapitas（ハピタス）"), Some(Partner::Hapitas));
        assert_eq!(normalize_site_name("ecナビ"), Some(Partner::Ecnavi));
        assert_eq!(normalize_site_name("げん玉"), Some(Partner::Gendama));
        assert_eq!(normalize_site_name("フルーツメール"), Some(Partner::Fruitmail));
        assert_eq!(normalize_site_name("未知サイト"), None);
        assert_eq!(normalize_site_name(""), None);
    }

    #[test]
    fn test_partner_metadata() {
        assert_eq!(Partner::Moppy.env_var(), "POIKATSU_MOPPY_ID");
        assert_eq!(Partner::PointIncome.env_var(), "POIKATSU_POINTINCOME_ID");
        assert_eq!(Partner::PointIncome.param_name(), "r");
        assert_eq!(Partner::Warau.param_name(), "af");
        assert_eq!(Partner::Chobirich.to_string(), "ちょびリッチ");
    }

    #[test]
    fn test_apply_sets_parameter() {
        let rule = AffiliateRule::new(Partner::Moppy, "abc");
        assert_eq!(
            rule.apply("https://pc.moppy.jp/ad/detail.php?site_id=42").unwrap(),
            "https://pc.moppy.jp/ad/detail.php?site_id=42&af=abc"
        );
    }

    #[test]
    fn test_apply_replaces_existing_parameter() {
        let rule = AffiliateRule::new(Partner::PointIncome, "mine");
        assert_eq!(
            rule.apply("https://pointi.jp/ad/1/?r=theirs&x=1&r=dup").unwrap(),
            "https://pointi.jp/ad/1/?r=mine&x=1"
        );
    }

    #[test]
    fn test_apply_hapitas_composite_value() {
        let rule = AffiliateRule::new(Partner::Hapitas, "h123&route=pcText");
        assert_eq!(
            rule.apply("https://hapitas.jp/item/detail/itemid/1").unwrap(),
            "https://hapitas.jp/item/detail/itemid/1?af=h123&route=pcText"
        );

        let rule = AffiliateRule::new(Partner::Hapitas, "h123");
        assert_eq!(rule.apply("https://hapitas.jp/").unwrap(), "https://hapitas.jp/?af=h123");
    }

    #[test]
    fn test_route_split_only_for_hapitas() {
        let rule = AffiliateRule::new(Partner::Moppy, "m1&route=x");
        let url = rule.apply("https://pc.moppy.jp/").unwrap();
        assert_eq!(url, "https://pc.moppy.jp/?af=m1%26route%3Dx");
    }

    #[test]
    fn test_apply_invalid_url() {
        let rule = AffiliateRule::new(Partner::Moppy, "abc");
        assert_eq!(rule.apply("/relative/path"), Err(Unresolved::InvalidUrl("/relative/path".to_string())));
    }

    #[test]
    fn test_rules_from_ids() {
        let rules = AffiliateRules::from_ids(&ids(&[("moppy", "m1"), ("warau", "  "), ("unknown", "x")]));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.for_site("モッピー").unwrap().referral_value, "m1");
        assert_eq!(rules.for_site("ワラウ"), Err(Unresolved::RuleMissing("ワラウ".to_string())));
        assert!(matches!(rules.for_site("未知サイト"), Err(Unresolved::RuleMissing(_))));
    }
}
