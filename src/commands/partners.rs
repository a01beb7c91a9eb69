//! Lists supported partners and whether a referral value is configured.

use crate::affiliate::{AffiliateRules, Partner};
use crate::config::Config;
use crate::format::{Formatter, PartnerRow};

pub struct PartnersCommand {
    config: Config,
}

impl PartnersCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> String {
        let rules = AffiliateRules::from_ids(&self.config.affiliate.ids);
        let rows: Vec<PartnerRow> =
            Partner::ALL.into_iter().map(|p| PartnerRow::new(p, rules.get(p).is_some())).collect();
        Formatter::new(self.config.format).format_partners(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::make_test_config;
    use crate::config::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn test_lists_every_partner() {
        let dir = TempDir::new().unwrap();
        let output = PartnersCommand::new(make_test_config(&dir, OutputFormat::Json)).execute();

        let rows: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(rows.len(), Partner::ALL.len());

        let moppy = rows.iter().find(|r| r["key"] == "moppy").unwrap();
        assert_eq!(moppy["configured"], true);
        assert_eq!(moppy["paramName"], "af");

        let income = rows.iter().find(|r| r["key"] == "pointincome").unwrap();
        assert_eq!(income["configured"], false);
        assert_eq!(income["paramName"], "r");
    }
}
