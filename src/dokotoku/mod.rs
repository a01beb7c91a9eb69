//! Comparison-site specific modules for rendering, extraction and data models.

pub mod client;
pub mod extractor;
pub mod models;
pub mod reward;
pub mod selectors;

pub use client::{DokotokuClient, PageSource, RedirectFollower};
pub use extractor::{Extraction, Extractor, Strategy};
pub use models::{Offer, RawOffer, SearchResponse};
pub use reward::{parse_reward, ParsedReward};
