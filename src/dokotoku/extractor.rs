//! Offer extraction from rendered result pages.
//!
//! Strategies are tried in a fixed order and the first one that yields any
//! offer wins; later strategies never add to an earlier one's output. The
//! table strategy matches the site's current layout exactly. The card
//! strategy is a looser scan that keeps searches working when the layout
//! drifts, at the cost of precision.

use crate::dokotoku::models::{Offer, RawOffer, UNKNOWN_SITE};
use crate::dokotoku::selectors::{card, diagnostics, table};
use crate::error::ExtractError;
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, trace};
use url::Url;

/// Origin relative links are resolved against.
pub const BASE_URL: &str = "https://dokotoku.jp/";

/// Titles this short are navigation chrome, not offers.
const MIN_TITLE_CHARS: usize = 4;

static BASE: LazyLock<Url> = LazyLock::new(|| Url::parse(BASE_URL).unwrap());

static YEN_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}(?:,\d{3})*\s*円").unwrap());

/// Extraction strategy that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Classed cells of the results table
    Table,
    /// Heuristic scan of list items and cards
    Cards,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Table => write!(f, "table"),
            Strategy::Cards => write!(f, "cards"),
        }
    }
}

/// Output of one extraction run.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Strategy whose output was used; `None` when nothing matched.
    pub strategy: Option<Strategy>,
    pub offers: Vec<RawOffer>,
}

/// Rough structure counts, logged when nothing could be extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageStructure {
    pub tables: usize,
    pub rows: usize,
    pub cells: usize,
    pub links: usize,
    pub class_names: Vec<String>,
}

type StrategyFn = fn(&Extractor, &Html) -> Vec<RawOffer>;

/// Extracts offers from the comparison site's rendered HTML.
pub struct Extractor {
    base: Url,
}

impl Extractor {
    /// Creates an extractor resolving links against the live site.
    pub fn new() -> Self {
        Self { base: BASE.clone() }
    }

    /// Creates an extractor resolving links against a custom origin (for testing).
    pub fn with_base(base: Url) -> Self {
        Self { base }
    }

    /// Strategies in evaluation order.
    fn strategies() -> [(Strategy, StrategyFn); 2] {
        [(Strategy::Table, Self::table_offers), (Strategy::Cards, Self::card_offers)]
    }

    /// Runs the strategy cascade over a rendered page.
    ///
    /// Zero offers is a normal outcome. Only input that is not a document
    /// at all is an error.
    pub fn extract(&self, html: &str) -> Result<Extraction, ExtractError> {
        if html.trim().is_empty() {
            return Err(ExtractError::MalformedHtml("empty document".to_string()));
        }
        if html.contains('\0') {
            return Err(ExtractError::MalformedHtml("document contains NUL bytes".to_string()));
        }

        let document = Html::parse_document(html);

        for (strategy, run) in Self::strategies() {
            let offers = run(self, &document);
            debug!("Strategy '{}' found {} offers", strategy, offers.len());
            if !offers.is_empty() {
                return Ok(Extraction { strategy: Some(strategy), offers });
            }
        }

        Ok(Extraction::default())
    }

    /// Extracts and normalizes rewards in one step.
    pub fn extract_offers(&self, html: &str) -> Result<Vec<Offer>, ExtractError> {
        Ok(self.extract(html)?.offers.into_iter().map(Offer::from_raw).collect())
    }

    /// Primary strategy: rows with reward, partner and offer cells.
    fn table_offers(&self, document: &Html) -> Vec<RawOffer> {
        let mut offers = Vec::new();

        for row in document.select(&table::ROW) {
            let (Some(reward_cell), Some(site_cell), Some(article_cell)) = (
                row.select(&table::REWARD_CELL).next(),
                row.select(&table::SITE_CELL).next(),
                row.select(&table::ARTICLE_CELL).next(),
            ) else {
                continue;
            };

            let Some(link) = article_cell.select(&table::LINK).next() else {
                trace!("Skipping row without offer link");
                continue;
            };

            let title = element_text(link);
            if title.chars().count() < MIN_TITLE_CHARS {
                continue;
            }

            let Some(original_url) = link.value().attr("href").and_then(|h| self.resolve_link(h))
            else {
                continue;
            };

            let site = site_cell
                .select(&table::LINK)
                .next()
                .map(element_text)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| element_text(site_cell));

            offers.push(RawOffer {
                site: non_empty_or_unknown(site),
                title,
                reward_text: element_text(reward_cell),
                original_url,
            });
        }

        offers
    }

    /// Fallback strategy: any list item or card with a link, a title and a reward.
    fn card_offers(&self, document: &Html) -> Vec<RawOffer> {
        let mut offers = Vec::new();
        let mut seen = HashSet::new();

        for element in document.select(&card::CONTAINER) {
            let Some(link) = element.select(&card::LINK).next() else {
                continue;
            };
            let Some(original_url) = link.value().attr("href").and_then(|h| self.resolve_link(h))
            else {
                continue;
            };

            let title = element
                .select(&card::TITLE)
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| element_text(link));
            if title.is_empty() {
                continue;
            }

            let Some(reward_text) = card_reward(element) else {
                continue;
            };

            if !seen.insert((title.clone(), original_url.clone())) {
                continue;
            }

            offers.push(RawOffer { site: card_site(element), title, reward_text, original_url });
        }

        offers
    }

    /// Resolves an href against the site origin. Empty and script links are rejected.
    fn resolve_link(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        let url = self.base.join(href).ok()?;
        matches!(url.scheme(), "http" | "https").then(|| url.to_string())
    }

    /// Counts the page's structural elements.
    pub fn describe_structure(html: &str) -> PageStructure {
        let document = Html::parse_document(html);
        let mut class_names: Vec<String> = Vec::new();
        for element in document.select(&diagnostics::CLASSED).take(30) {
            if let Some(class) = element.value().attr("class") {
                if !class_names.iter().any(|c| c == class) {
                    class_names.push(class.to_string());
                }
            }
        }
        class_names.truncate(15);

        PageStructure {
            tables: document.select(&diagnostics::TABLES).count(),
            rows: document.select(&diagnostics::ROWS).count(),
            cells: document.select(&diagnostics::CELLS).count(),
            links: document.select(&diagnostics::LINKS).count(),
            class_names,
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Reward text from class hints, else the first yen fragment in the element.
fn card_reward(element: ElementRef) -> Option<String> {
    let hinted: String = element.select(&card::REWARD_HINT).map(element_text).collect::<Vec<_>>().join(" ");
    let hinted = hinted.trim();
    if !hinted.is_empty() {
        return Some(hinted.to_string());
    }

    let text = element.text().collect::<String>();
    YEN_FRAGMENT.find(&text).map(|m| m.as_str().to_string())
}

fn card_site(element: ElementRef) -> String {
    let from_logo = element
        .select(&card::SITE_LOGO)
        .next()
        .and_then(|img| img.value().attr("alt"))
        .map(|alt| alt.trim().to_string())
        .filter(|alt| !alt.is_empty());

    let site = from_logo
        .or_else(|| element.select(&card::SITE_HINT).next().map(element_text))
        .unwrap_or_default();

    non_empty_or_unknown(site)
}

/// Element text with whitespace runs collapsed.
fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty_or_unknown(site: String) -> String {
    if site.is_empty() {
        UNKNOWN_SITE.to_string()
    } else {
        site
    }
}
