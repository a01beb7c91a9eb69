//! Configuration management with TOML, environment variables, and CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Desktop Chrome user agent set on every session before navigating.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// How long a cached search stays fresh, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached keywords
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Overall deadline for one search, in seconds
    #[serde(default = "default_search_deadline_secs")]
    pub search_deadline_secs: u64,

    /// Log page structure when a search extracts nothing
    #[serde(default)]
    pub debug_dump: bool,

    /// Directory for cache, history, favorites and the viewed ledger
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub affiliate: AffiliateSettings,
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Chrome/Chromium executable for local runs
    #[serde(default)]
    pub executable_path: Option<PathBuf>,

    /// Bundled Chromium used in hosted runtimes
    #[serde(default)]
    pub bundled_executable_path: Option<PathBuf>,

    /// DevTools endpoint of an already running browser (http:// or ws://)
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Time allowed for a page to load, in seconds
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Wait after load for client-side rendering, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra command-line arguments passed to the browser
    #[serde(default)]
    pub args: Vec<String>,
}

/// Referral ids and resolution pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateSettings {
    /// Partner key ("moppy", "hapitas", ...) to referral value
    #[serde(default)]
    pub ids: BTreeMap<String, String>,

    /// Cap on following one redirector link, in seconds
    #[serde(default = "default_redirect_timeout_secs")]
    pub redirect_timeout_secs: u64,

    /// Links resolved concurrently per group, capped at 10
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between groups, in milliseconds
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Random jitter added to the pause (0 to this value)
    #[serde(default)]
    pub batch_jitter_ms: u64,
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_cache_max_entries() -> usize {
    10
}

fn default_search_deadline_secs() -> u64 {
    25
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    15
}

fn default_settle_delay_ms() -> u64 {
    2500
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_redirect_timeout_secs() -> u64 {
    8
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_pause_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            search_deadline_secs: default_search_deadline_secs(),
            debug_dump: false,
            data_dir: None,
            listen_addr: default_listen_addr(),
            browser: BrowserSettings::default(),
            affiliate: AffiliateSettings::default(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable_path: None,
            bundled_executable_path: None,
            remote_url: None,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            user_agent: default_user_agent(),
            args: Vec::new(),
        }
    }
}

impl Default for AffiliateSettings {
    fn default() -> Self {
        Self {
            ids: BTreeMap::new(),
            redirect_timeout_secs: default_redirect_timeout_secs(),
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
            batch_jitter_ms: 0,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("poikatsu-crawler").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable source.
    pub fn with_env_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        for partner in crate::affiliate::Partner::ALL {
            if let Some(id) = var(&partner.env_var()).filter(|v| !v.trim().is_empty()) {
                self.affiliate.ids.insert(partner.key().to_string(), id.trim().to_string());
            }
        }

        if let Some(addr) = var("POIKATSU_LISTEN").filter(|v| !v.is_empty()) {
            self.listen_addr = addr;
        }

        if let Some(ttl) = var("POIKATSU_CACHE_TTL") {
            if let Ok(t) = ttl.parse() {
                self.cache_ttl_secs = t;
            }
        }

        if let Some(flag) = var("DEBUG_POIKATSU") {
            self.debug_dump = flag == "1" || flag.eq_ignore_ascii_case("true");
        }

        if let Some(remote) = var("CHROME_REMOTE_URL").filter(|v| !v.is_empty()) {
            self.browser.remote_url = Some(remote);
        }

        self
    }

    /// Resolves the data directory, falling back to the platform data dir.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("poikatsu-crawler"))
            .context("Could not determine a data directory; set data_dir in config.toml")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn search_deadline(&self) -> Duration {
        Duration::from_secs(self.search_deadline_secs)
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
