//! Referral link rewriting for partner offers.

pub mod resolver;
pub mod rules;

pub use resolver::{AffiliateResolver, BatchItem};
pub use rules::{normalize_site_name, AffiliateRule, AffiliateRules, Partner};
