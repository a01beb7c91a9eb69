//! Output formatting for offers and local stores (table, JSON, markdown, CSV).

use crate::affiliate::Partner;
use crate::config::OutputFormat;
use crate::dokotoku::{Offer, SearchResponse};
use crate::store::{FavoriteItem, HistoryEntry, ViewedItem, ViewedStats};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Characters of a title shown in table output.
const TABLE_TITLE_CHARS: usize = 40;
/// Characters of a title shown in markdown output.
const MARKDOWN_TITLE_CHARS: usize = 30;

/// One line of the partners listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerRow {
    pub key: &'static str,
    pub name: &'static str,
    pub param_name: &'static str,
    pub configured: bool,
}

impl PartnerRow {
    pub fn new(partner: Partner, configured: bool) -> Self {
        Self {
            key: partner.key(),
            name: partner.canonical_name(),
            param_name: partner.param_name(),
            configured,
        }
    }
}

/// Formats offers and store contents for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a search response. JSON keeps the full envelope.
    pub fn format_response(&self, response: &SearchResponse) -> String {
        match self.format {
            OutputFormat::Json => to_json(response),
            OutputFormat::Csv => self.csv_offers(&response.results),
            _ if !response.success => format!(
                "Search for \"{}\" failed: {}",
                response.keyword,
                response.error.as_deref().unwrap_or("unknown error")
            ),
            _ => self.format_offers(&response.results),
        }
    }

    /// Formats multiple offers.
    pub fn format_offers(&self, offers: &[Offer]) -> String {
        if offers.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(),
                _ => "No offers found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => to_json(offers),
            OutputFormat::Table => self.table_offers(offers),
            OutputFormat::Markdown => self.markdown_offers(offers),
            OutputFormat::Csv => self.csv_offers(offers),
        }
    }

    // Offer tables

    fn table_offers(&self, offers: &[Offer]) -> String {
        let site_width = 14;
        let reward_width = 12;

        let mut lines = Vec::new();
        lines.push(format!("{:<site_width$}  {:>reward_width$}  {}", "Site", "Reward", "Title"));
        lines.push(format!("{:-<site_width$}  {:-<reward_width$}  {:-<40}", "", "", ""));

        for offer in offers {
            lines.push(format!(
                "{:<site_width$}  {:>reward_width$}  {}",
                offer.site,
                offer.reward,
                shorten(&offer.title, TABLE_TITLE_CHARS)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} offers", offers.len()));

        lines.join("\n")
    }

    fn markdown_offers(&self, offers: &[Offer]) -> String {
        let mut lines = Vec::new();

        lines.push("| Site | Reward | Title |".to_string());
        lines.push("|------|--------|-------|".to_string());

        for offer in offers {
            lines.push(format!(
                "| {} | {} | [{}]({}) |",
                markdown_escape(&offer.site),
                markdown_escape(&offer.reward),
                markdown_escape(&shorten(&offer.title, MARKDOWN_TITLE_CHARS)),
                offer.original_url
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} offers found*", offers.len()));

        lines.join("\n")
    }

    fn csv_header(&self) -> String {
        "site,title,reward,reward_rate,reward_amount,original_url".to_string()
    }

    fn csv_offers(&self, offers: &[Offer]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for offer in offers {
            lines.push(format!(
                "{},{},{},{},{},{}",
                csv_escape(&offer.site),
                csv_escape(&offer.title),
                csv_escape(&offer.reward),
                offer.reward_rate.map(|r| r.to_string()).unwrap_or_default(),
                offer.reward_amount.map(|a| a.to_string()).unwrap_or_default(),
                csv_escape(&offer.original_url)
            ));
        }

        lines.join("\n")
    }

    // Local stores

    pub fn format_history(&self, entries: &[HistoryEntry]) -> String {
        if entries.is_empty() && self.format != OutputFormat::Json {
            return "No search history.".to_string();
        }

        match self.format {
            OutputFormat::Json => to_json(entries),
            OutputFormat::Csv => {
                let mut lines = vec!["keyword,timestamp,result_count".to_string()];
                for e in entries {
                    lines.push(format!(
                        "{},{},{}",
                        csv_escape(&e.keyword),
                        e.timestamp,
                        e.result_count.map(|c| c.to_string()).unwrap_or_default()
                    ));
                }
                lines.join("\n")
            }
            _ => entries
                .iter()
                .map(|e| {
                    let count = e.result_count.map(|c| format!(" ({} offers)", c)).unwrap_or_default();
                    format!("{}  {}{}", timestamp(e.timestamp), e.keyword, count)
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn format_favorites(&self, items: &[FavoriteItem]) -> String {
        if items.is_empty() && self.format != OutputFormat::Json {
            return "No favorites.".to_string();
        }

        match self.format {
            OutputFormat::Json => to_json(items),
            OutputFormat::Csv => {
                let mut lines = vec!["id,keyword,added_at,site,title,reward,original_url".to_string()];
                for f in items {
                    lines.push(format!(
                        "{},{},{},{},{},{},{}",
                        f.id,
                        csv_escape(&f.keyword),
                        f.added_at,
                        csv_escape(&f.result.site),
                        csv_escape(&f.result.title),
                        csv_escape(&f.result.reward),
                        csv_escape(&f.result.original_url)
                    ));
                }
                lines.join("\n")
            }
            _ => items
                .iter()
                .map(|f| {
                    format!(
                        "{}  {}  {} / {}  [{}]",
                        f.id,
                        f.result.reward,
                        f.result.site,
                        shorten(&f.result.title, TABLE_TITLE_CHARS),
                        f.keyword
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn format_viewed(&self, items: &[&ViewedItem]) -> String {
        if items.is_empty() && self.format != OutputFormat::Json {
            return "No viewed offers.".to_string();
        }

        match self.format {
            OutputFormat::Json => to_json(items),
            OutputFormat::Csv => {
                let mut lines = vec![
                    "id,site,title,reward,max_reward_rate,max_reward_amount,view_count,last_viewed_at".to_string(),
                ];
                for v in items {
                    lines.push(format!(
                        "{},{},{},{},{},{},{},{}",
                        v.id,
                        csv_escape(&v.site),
                        csv_escape(&v.title),
                        csv_escape(&v.reward),
                        v.max_reward_rate.map(|r| r.to_string()).unwrap_or_default(),
                        v.max_reward_amount.map(|a| a.to_string()).unwrap_or_default(),
                        v.view_count,
                        v.last_viewed_at
                    ));
                }
                lines.join("\n")
            }
            _ => items
                .iter()
                .map(|v| {
                    format!(
                        "{}  {:>10}  (best {})  x{}  {} / {}",
                        timestamp(v.last_viewed_at),
                        v.reward,
                        best_reward(v),
                        v.view_count,
                        v.site,
                        shorten(&v.title, TABLE_TITLE_CHARS)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn format_stats(&self, stats: &ViewedStats) -> String {
        match self.format {
            OutputFormat::Json => to_json(stats),
            _ => format!(
                "Items:              {}\nViews:              {}\nWith a best reward: {}",
                stats.total_items, stats.total_views, stats.items_with_max_reward
            ),
        }
    }

    pub fn format_partners(&self, rows: &[PartnerRow]) -> String {
        match self.format {
            OutputFormat::Json => to_json(rows),
            OutputFormat::Csv => {
                let mut lines = vec!["key,name,param_name,configured".to_string()];
                for r in rows {
                    lines.push(format!("{},{},{},{}", r.key, r.name, r.param_name, r.configured));
                }
                lines.join("\n")
            }
            OutputFormat::Markdown => {
                let mut lines = vec!["| Key | Partner | Param | Configured |".to_string()];
                lines.push("|-----|---------|-------|------------|".to_string());
                for r in rows {
                    lines.push(format!(
                        "| {} | {} | {} | {} |",
                        r.key,
                        r.name,
                        r.param_name,
                        if r.configured { "yes" } else { "no" }
                    ));
                }
                lines.join("\n")
            }
            OutputFormat::Table => {
                let mut lines = vec![format!("{:<12} {:<16} {:<6} {}", "Key", "Partner", "Param", "Configured")];
                lines.push(format!("{:-<12} {:-<16} {:-<6} {:-<10}", "", "", "", ""));
                for r in rows {
                    lines.push(format!(
                        "{:<12} {:<16} {:<6} {}",
                        r.key,
                        r.name,
                        r.param_name,
                        if r.configured { "yes" } else { "no" }
                    ));
                }
                lines.join("\n")
            }
        }
    }

    /// Resolved links are always JSON so the output can be piped.
    pub fn format_resolved(&self, resolved: &BTreeMap<String, String>) -> String {
        to_json(resolved)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

fn best_reward(item: &ViewedItem) -> String {
    match (item.max_reward_rate, item.max_reward_amount) {
        (Some(rate), _) => format!("{}%", rate),
        (None, Some(amount)) => format!("{}円", crate::dokotoku::reward::format_yen(amount)),
        (None, None) => "-".to_string(),
    }
}

fn timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Truncates on character boundaries, marking the cut with "...".
fn shorten(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn markdown_escape(s: &str) -> String {
    s.replace('|', "\\|")
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
