//! Search history command.

use crate::commands::data_dir;
use crate::config::Config;
use crate::format::Formatter;
use crate::store::{DataDir, SearchHistory};
use anyhow::Result;

/// What to do with the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryAction {
    List,
    Remove(String),
    Clear,
}

pub struct HistoryCommand {
    config: Config,
}

impl HistoryCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn execute(&self, action: HistoryAction) -> Result<String> {
        let data = data_dir(&self.config)?;
        self.execute_in(&data, action)
    }

    pub fn execute_in(&self, data: &DataDir, action: HistoryAction) -> Result<String> {
        let mut history = SearchHistory::open(data.history())?;

        match action {
            HistoryAction::List => Ok(Formatter::new(self.config.format).format_history(history.entries())),
            HistoryAction::Remove(keyword) => {
                if history.remove(&keyword) {
                    history.save()?;
                    Ok(format!("Removed \"{}\" from history.", keyword.trim()))
                } else {
                    Ok(format!("\"{}\" is not in history.", keyword.trim()))
                }
            }
            HistoryAction::Clear => {
                history.clear();
                history.save()?;
                Ok("Search history cleared.".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::make_test_config;
    use crate::config::OutputFormat;
    use tempfile::TempDir;

    fn seeded(dir: &TempDir) -> DataDir {
        let data = DataDir::new(dir.path());
        let mut history = SearchHistory::open(data.history()).unwrap();
        history.add_at("カード", Some(3), 1);
        history.add_at("旅行", Some(1), 2);
        history.save().unwrap();
        data
    }

    #[test]
    fn test_list_json() {
        let dir = TempDir::new().unwrap();
        let data = seeded(&dir);
        let cmd = HistoryCommand::new(make_test_config(&dir, OutputFormat::Json));

        let output = cmd.execute_in(&data, HistoryAction::List).unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(entries[0]["keyword"], "旅行");
        assert_eq!(entries[1]["resultCount"], 3);
    }

    #[test]
    fn test_remove_then_clear() {
        let dir = TempDir::new().unwrap();
        let data = seeded(&dir);
        let cmd = HistoryCommand::new(make_test_config(&dir, OutputFormat::Table));

        let output = cmd.execute_in(&data, HistoryAction::Remove("カード".to_string())).unwrap();
        assert!(output.starts_with("Removed"));
        let output = cmd.execute_in(&data, HistoryAction::Remove("カード".to_string())).unwrap();
        assert!(output.contains("not in history"));
        assert_eq!(SearchHistory::open(data.history()).unwrap().entries().len(), 1);

        cmd.execute_in(&data, HistoryAction::Clear).unwrap();
        assert_eq!(cmd.execute_in(&data, HistoryAction::List).unwrap(), "No search history.");
    }
}
