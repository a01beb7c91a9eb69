//! Free-text reward parsing.
//!
//! Reward cells mix percentages ("12.5%"), yen amounts ("3,000円") and bare
//! numbers. Patterns are tried in order and the first one that yields a
//! well-formed number decides the interpretation:
//!
//! 1. `<number>%` is a rate
//! 2. `<number>円` is an amount
//! 3. a bare number is an amount when `>= 100`, otherwise a rate
//!
//! The magnitude threshold in step 3 mirrors how the comparison site writes
//! its cells. It misreads "150% bonus" style text without a percent sign and
//! tiny yen amounts without a currency suffix.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Bare numbers at or above this value are read as yen amounts.
pub const AMOUNT_THRESHOLD: f64 = 100.0;

/// Maximum characters of unparsed reward text kept in client-local records.
pub const DISPLAY_LIMIT: usize = 50;

/// Result of parsing a reward cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedReward {
    pub reward_rate: Option<f64>,
    pub reward_amount: Option<f64>,
    /// Rendering of whichever value was found, or the trimmed input.
    pub reward: String,
}

impl ParsedReward {
    fn rate(rate: f64) -> Self {
        Self { reward_rate: Some(rate), reward_amount: None, reward: format!("{}%", rate) }
    }

    fn amount(amount: f64) -> Self {
        Self { reward_rate: None, reward_amount: Some(amount), reward: format!("{}円", format_yen(amount)) }
    }
}

struct RewardRule {
    name: &'static str,
    pattern: Regex,
    classify: fn(f64) -> ParsedReward,
}

impl RewardRule {
    fn new(name: &'static str, pattern: &str, classify: fn(f64) -> ParsedReward) -> Self {
        Self { name, pattern: Regex::new(pattern).unwrap(), classify }
    }
}

const NUMBER: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)";

static CASCADE: LazyLock<Vec<RewardRule>> = LazyLock::new(|| {
    vec![
        RewardRule::new("percent", &format!(r"{}\s*[%％]", NUMBER), ParsedReward::rate),
        RewardRule::new("yen", &format!(r"{}\s*円", NUMBER), ParsedReward::amount),
        RewardRule::new("bare", NUMBER, |n| {
            if n >= AMOUNT_THRESHOLD {
                ParsedReward::amount(n)
            } else {
                ParsedReward::rate(n)
            }
        }),
    ]
});

/// Parses a reward cell into a rate, an amount, or raw text.
pub fn parse_reward(text: &str) -> ParsedReward {
    let text = text.trim();

    for rule in CASCADE.iter() {
        let Some(number) = rule.pattern.captures(text).and_then(|c| c.get(1)) else {
            continue;
        };

        match parse_number(number.as_str()) {
            Some(n) => {
                tracing::trace!("Reward '{}' matched rule '{}'", text, rule.name);
                return (rule.classify)(n);
            }
            None => continue,
        }
    }

    ParsedReward { reward_rate: None, reward_amount: None, reward: text.to_string() }
}

/// Strips thousands separators and parses. Non-finite values are rejected.
fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0)
}

/// Formats a yen amount with thousands separators ("3,000", "1,234.5").
pub fn format_yen(amount: f64) -> String {
    let text = amount.to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    match frac_part {
        Some(f) => format!("{}.{}", grouped, f),
        None => grouped,
    }
}

/// Caps free text to a display-safe length.
pub fn truncate_display(text: &str, limit: usize) -> String {
    text.trim().chars().take(limit).collect()
}
