//! CSS selectors for the comparison site's result pages.
//!
//! This file contains all CSS selectors used for extracting offers.
//! Update this file when the site changes its HTML structure.
//!
//! **Update process**: When extraction comes back empty for a keyword that
//! has results in a real browser, capture the rendered HTML (set
//! `DEBUG_POIKATSU=1`), update the selectors, and add a test fixture.

use scraper::Selector;
use std::sync::LazyLock;

/// Selectors for the results table (primary strategy).
pub mod table {
    use super::*;

    /// Every table row; rows without the three classed cells are skipped.
    pub static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table tr").unwrap());

    /// Reward cell ("1.5%", "3,000円").
    pub static REWARD_CELL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("td.cashback").unwrap());

    /// Partner name cell.
    pub static SITE_CELL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("td.site-name").unwrap());

    /// Offer cell holding the title link.
    pub static ARTICLE_CELL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("td.article").unwrap());

    /// Any link inside a cell.
    pub static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
}

/// Selectors for list/card layouts (fallback strategy).
pub mod card {
    use super::*;

    /// Candidate containers.
    pub static CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "li, \
             div[class*='item'], \
             div[class*='result'], \
             [class*='card']",
        )
        .unwrap()
    });

    /// Title-like children, first match wins.
    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "a, \
             .title, \
             h2, h3, h4, \
             [class*='title']",
        )
        .unwrap()
    });

    /// Link carrying the offer URL.
    pub static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

    /// Elements hinting at a reward by class name.
    pub static REWARD_HINT: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[class*='reward'], \
             [class*='point'], \
             [class*='amount']",
        )
        .unwrap()
    });

    /// Partner name by class hint.
    pub static SITE_HINT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[class*='site']").unwrap());

    /// Partner logo carrying the name in `alt`.
    pub static SITE_LOGO: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[class*='site'] img[alt], img[alt]").unwrap());
}

/// Selectors for driving the page's own search form.
pub mod form {
    /// Presence check for a rendered results table.
    pub static RESULTS_TABLE: &str = "table";

    /// Keyword input.
    pub static KEYWORD_INPUT: &str = "input[name='q'], input.keyword";

    /// Submit button.
    pub static SUBMIT: &str = "input[type='submit'], input.submit";
}

/// Selectors used only for structure diagnostics.
pub mod diagnostics {
    use super::*;

    pub static TABLES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
    pub static ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
    pub static CELLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
    pub static LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
    pub static CLASSED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[class]").unwrap());
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Forces every lazy selector so a typo fails here instead of at runtime.
    #[test]
    fn test_all_selectors_parse() {
        let _ = &*table::ROW;
        let _ = &*table::REWARD_CELL;
        let _ = &*table::SITE_CELL;
        let _ = &*table::ARTICLE_CELL;
        let _ = &*table::LINK;
        let _ = &*card::CONTAINER;
        let _ = &*card::TITLE;
        let _ = &*card::LINK;
        let _ = &*card::REWARD_HINT;
        let _ = &*card::SITE_HINT;
        let _ = &*card::SITE_LOGO;
        let _ = &*diagnostics::TABLES;
        let _ = &*diagnostics::CLASSED;

        for css in [form::RESULTS_TABLE, form::KEYWORD_INPUT, form::SUBMIT] {
            assert!(Selector::parse(css).is_ok(), "{}", css);
        }
    }
}
