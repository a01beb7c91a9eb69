//! poikatsu-crawler - Point-back deal search across partner programs
//!
//! Renders the comparison site's search results in a headless browser,
//! extracts and normalizes the offers, and rewrites offer links so they
//! carry configured referral values.

pub mod affiliate;
pub mod browser;
pub mod commands;
pub mod config;
pub mod dokotoku;
pub mod error;
pub mod filters;
pub mod format;
pub mod search;
pub mod server;
pub mod store;

pub use affiliate::{AffiliateResolver, Partner};
pub use config::Config;
pub use dokotoku::{Extractor, Offer, SearchResponse};
pub use error::{ExtractError, SearchError, SessionError, Unresolved};
pub use search::SearchOrchestrator;
