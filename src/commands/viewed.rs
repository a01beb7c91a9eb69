//! Viewed ledger command.

use crate::commands::data_dir;
use crate::config::Config;
use crate::format::Formatter;
use crate::store::{DataDir, ViewedLedger};
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewedAction {
    List,
    Stats,
    /// Drop items not seen within this many days
    Cleanup(u32),
    Clear,
}

pub struct ViewedCommand {
    config: Config,
}

impl ViewedCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn execute(&self, action: ViewedAction) -> Result<String> {
        let data = data_dir(&self.config)?;
        self.execute_in(&data, action)
    }

    pub fn execute_in(&self, data: &DataDir, action: ViewedAction) -> Result<String> {
        let mut ledger = ViewedLedger::open(data.viewed())?;
        let formatter = Formatter::new(self.config.format);

        match action {
            ViewedAction::List => Ok(formatter.format_viewed(&ledger.items())),
            ViewedAction::Stats => Ok(formatter.format_stats(&ledger.stats())),
            ViewedAction::Cleanup(days) => {
                let removed = ledger.cleanup(days);
                ledger.save()?;
                Ok(format!("Removed {} offers not seen in {} days.", removed, days))
            }
            ViewedAction::Clear => {
                ledger.clear();
                ledger.save()?;
                Ok("Viewed ledger cleared.".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::make_test_config;
    use crate::config::OutputFormat;
    use crate::dokotoku::Offer;
    use crate::store::now_ms;
    use tempfile::TempDir;

    fn offer(title: &str, rate: f64) -> Offer {
        Offer {
            site: "ハピタス".to_string(),
            title: title.to_string(),
            reward: format!("{}%", rate),
            reward_rate: Some(rate),
            reward_amount: None,
            original_url: format!("https://dokotoku.jp/link/{}", title.len()),
        }
    }

    fn seeded(dir: &TempDir) -> DataDir {
        let data = DataDir::new(dir.path());
        let mut ledger = ViewedLedger::open(data.viewed()).unwrap();
        let now = now_ms();
        ledger.upsert_at(&offer("楽天市場", 1.0), now);
        ledger.upsert_at(&offer("楽天市場", 2.0), now);
        ledger.upsert_at(&offer("古い案件です", 3.0), now - 40 * 24 * 60 * 60 * 1000);
        ledger.save().unwrap();
        data
    }

    #[test]
    fn test_stats() {
        let dir = TempDir::new().unwrap();
        let data = seeded(&dir);
        let cmd = ViewedCommand::new(make_test_config(&dir, OutputFormat::Json));

        let stats: serde_json::Value =
            serde_json::from_str(&cmd.execute_in(&data, ViewedAction::Stats).unwrap()).unwrap();
        assert_eq!(stats["totalItems"], 2);
        assert_eq!(stats["totalViews"], 3);
    }

    #[test]
    fn test_list_shows_best_reward() {
        let dir = TempDir::new().unwrap();
        let data = seeded(&dir);
        let cmd = ViewedCommand::new(make_test_config(&dir, OutputFormat::Table));

        let output = cmd.execute_in(&data, ViewedAction::List).unwrap();
        let first = output.lines().next().unwrap();
        assert!(first.contains("楽天市場"));
        assert!(first.contains("(best 2%)"));
        assert!(first.contains("x2"));
    }

    #[test]
    fn test_cleanup_and_clear() {
        let dir = TempDir::new().unwrap();
        let data = seeded(&dir);
        let cmd = ViewedCommand::new(make_test_config(&dir, OutputFormat::Table));

        let output = cmd.execute_in(&data, ViewedAction::Cleanup(30)).unwrap();
        assert_eq!(output, "Removed 1 offers not seen in 30 days.");
        assert_eq!(ViewedLedger::open(data.viewed()).unwrap().stats().total_items, 1);

        cmd.execute_in(&data, ViewedAction::Clear).unwrap();
        assert_eq!(cmd.execute_in(&data, ViewedAction::List).unwrap(), "No viewed offers.");
    }
}
