//! Runtime-dependent browser configuration.
//!
//! The environment is probed exactly once, when the [`SessionConfig`] is
//! resolved at startup. Nothing downstream branches on the runtime again.

use crate::config::BrowserSettings;
use crate::error::SessionError;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for a local or developer machine.
pub const LOCAL_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

/// Arguments for the serverless sandbox, where the bundled Chromium runs
/// without a GPU, a writable home or a zygote process.
pub const HOSTED_ARGS: &[&str] = &[
    "--allow-pre-commit-input",
    "--disable-background-networking",
    "--disable-component-update",
    "--disable-domain-reliability",
    "--disable-print-preview",
    "--disable-setuid-sandbox",
    "--disable-site-isolation-trials",
    "--disable-speech-api",
    "--disk-cache-size=33554432",
    "--hide-scrollbars",
    "--ignore-gpu-blocklist",
    "--in-process-gpu",
    "--mute-audio",
    "--no-default-browser-check",
    "--no-pings",
    "--no-sandbox",
    "--no-zygote",
    "--single-process",
    "--use-gl=angle",
    "--use-angle=swiftshader",
];

/// Fixed viewport of the hosted runtime.
pub const HOSTED_VIEWPORT: (u32, u32) = (1920, 1080);

/// Variables whose presence marks a hosted (serverless) runtime.
const HOSTED_MARKERS: &[&str] = &["VERCEL", "VERCEL_ENV", "POIKATSU_HOSTED"];

const BUNDLED_EXECUTABLE_VAR: &str = "CHROMIUM_BUNDLED_PATH";
const LOCAL_EXECUTABLE_VARS: &[&str] = &["PUPPETEER_EXECUTABLE_PATH", "CHROME_EXECUTABLE_PATH"];

/// Source of environment variables, injectable for tests.
pub trait EnvProbe: Send + Sync {
    fn var_os(&self, key: &str) -> Option<OsString>;
}

/// The real process environment.
pub struct SystemEnv;

impl EnvProbe for SystemEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

/// Where the browser comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Serverless sandbox with a bundled Chromium
    Hosted,
    /// Developer machine with an externally supplied executable
    Local,
    /// Existing browser reachable over the DevTools protocol
    Remote,
}

impl std::fmt::Display for RuntimeEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeEnvironment::Hosted => write!(f, "hosted"),
            RuntimeEnvironment::Local => write!(f, "local"),
            RuntimeEnvironment::Remote => write!(f, "remote"),
        }
    }
}

/// Everything needed to start one browser session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub runtime: RuntimeEnvironment,
    /// Executable to launch; `None` only for remote sessions.
    pub executable: Option<PathBuf>,
    /// DevTools endpoint for remote sessions.
    pub remote_url: Option<String>,
    pub args: Vec<String>,
    pub viewport: Option<(u32, u32)>,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    pub user_agent: String,
}

impl SessionConfig {
    /// Resolves the configuration for the current runtime.
    ///
    /// An unset, empty or non-UTF-8 executable path is a launch failure.
    /// Callers keep the error and report it on every session request instead
    /// of probing again.
    pub fn resolve(env: &dyn EnvProbe, settings: &BrowserSettings) -> Result<Self, SessionError> {
        let mut config = Self {
            runtime: RuntimeEnvironment::Local,
            executable: None,
            remote_url: None,
            args: Vec::new(),
            viewport: None,
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
            user_agent: settings.user_agent.clone(),
        };

        if let Some(remote) = settings.remote_url.as_deref().filter(|r| !r.trim().is_empty()) {
            config.runtime = RuntimeEnvironment::Remote;
            config.remote_url = Some(remote.trim().to_string());
            return Ok(config);
        }

        let hosted = HOSTED_MARKERS
            .iter()
            .any(|key| env.var_os(key).is_some_and(|v| !v.is_empty()));

        if hosted {
            config.runtime = RuntimeEnvironment::Hosted;
            config.executable = Some(executable_path(
                env.var_os(BUNDLED_EXECUTABLE_VAR)
                    .or_else(|| settings.bundled_executable_path.clone().map(OsString::from)),
                "bundled Chromium",
            )?);
            config.args = HOSTED_ARGS.iter().map(|a| a.to_string()).collect();
            config.viewport = Some(HOSTED_VIEWPORT);
        } else {
            let from_env = LOCAL_EXECUTABLE_VARS.iter().find_map(|key| env.var_os(key));
            config.executable = Some(executable_path(
                from_env.or_else(|| settings.executable_path.clone().map(OsString::from)),
                "browser",
            )?);
            config.args = LOCAL_ARGS.iter().map(|a| a.to_string()).collect();
        }

        config.args.extend(settings.args.iter().cloned());
        Ok(config)
    }
}

fn executable_path(raw: Option<OsString>, what: &str) -> Result<PathBuf, SessionError> {
    let raw = raw.ok_or_else(|| {
        SessionError::LaunchFailure(format!("{} executable path is not configured", what))
    })?;

    let path = raw.into_string().map_err(|raw| {
        SessionError::LaunchFailure(format!(
            "{} executable path is not valid UTF-8: {}",
            what,
            raw.to_string_lossy()
        ))
    })?;

    if path.trim().is_empty() {
        return Err(SessionError::LaunchFailure(format!("{} executable path is empty", what)));
    }

    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapEnv(HashMap<String, OsString>);

    impl MapEnv {
        fn with(mut self, key: &str, value: impl Into<OsString>) -> Self {
            self.0.insert(key.to_string(), value.into());
            self
        }
    }

    impl EnvProbe for MapEnv {
        fn var_os(&self, key: &str) -> Option<OsString> {
            self.0.get(key).cloned()
        }
    }

    #[test]
    fn test_local_from_env() {
        let env = MapEnv::default().with("PUPPETEER_EXECUTABLE_PATH", "/usr/bin/chromium");
        let config = SessionConfig::resolve(&env, &BrowserSettings::default()).unwrap();

        assert_eq!(config.runtime, RuntimeEnvironment::Local);
        assert_eq!(config.executable, Some(PathBuf::from("/usr/bin/chromium")));
        assert!(config.args.contains(&"--no-sandbox".to_string()));
        assert!(config.args.contains(&"--disable-gpu".to_string()));
        assert_eq!(config.viewport, None);
        assert_eq!(config.navigation_timeout, Duration::from_secs(15));
        assert_eq!(config.settle_delay, Duration::from_millis(2500));
    }

    #[test]
    fn test_local_from_settings() {
        let settings = BrowserSettings {
            executable_path: Some(PathBuf::from("/opt/chrome/chrome")),
            args: vec!["--lang=ja-JP".to_string()],
            ..BrowserSettings::default()
        };
        let config = SessionConfig::resolve(&MapEnv::default(), &settings).unwrap();
        assert_eq!(config.executable, Some(PathBuf::from("/opt/chrome/chrome")));
        assert_eq!(config.args.last().map(String::as_str), Some("--lang=ja-JP"));
    }

    #[test]
    fn test_env_wins_over_settings() {
        let env = MapEnv::default().with("CHROME_EXECUTABLE_PATH", "/from/env");
        let settings = BrowserSettings {
            executable_path: Some(PathBuf::from("/from/settings")),
            ..BrowserSettings::default()
        };
        let config = SessionConfig::resolve(&env, &settings).unwrap();
        assert_eq!(config.executable, Some(PathBuf::from("/from/env")));
    }

    #[test]
    fn test_hosted_runtime() {
        let env = MapEnv::default()
            .with("VERCEL", "1")
            .with("CHROMIUM_BUNDLED_PATH", "/tmp/chromium")
            .with("PUPPETEER_EXECUTABLE_PATH", "/ignored");
        let config = SessionConfig::resolve(&env, &BrowserSettings::default()).unwrap();

        assert_eq!(config.runtime, RuntimeEnvironment::Hosted);
        assert_eq!(config.executable, Some(PathBuf::from("/tmp/chromium")));
        assert_eq!(config.viewport, Some((1920, 1080)));
        assert!(config.args.contains(&"--single-process".to_string()));
    }

    #[test]
    fn test_hosted_marker_must_be_non_empty() {
        let env = MapEnv::default()
            .with("VERCEL_ENV", "")
            .with("PUPPETEER_EXECUTABLE_PATH", "/usr/bin/chromium");
        let config = SessionConfig::resolve(&env, &BrowserSettings::default()).unwrap();
        assert_eq!(config.runtime, RuntimeEnvironment::Local);
    }

    #[test]
    fn test_missing_executable_is_launch_failure() {
        let err = SessionConfig::resolve(&MapEnv::default(), &BrowserSettings::default()).unwrap_err();
        assert!(matches!(err, SessionError::LaunchFailure(ref m) if m.contains("not configured")));

        let env = MapEnv::default().with("VERCEL", "1");
        let err = SessionConfig::resolve(&env, &BrowserSettings::default()).unwrap_err();
        assert!(matches!(err, SessionError::LaunchFailure(ref m) if m.contains("bundled Chromium")));
    }

    #[test]
    fn test_empty_executable_is_launch_failure() {
        let env = MapEnv::default().with("PUPPETEER_EXECUTABLE_PATH", "  ");
        let err = SessionConfig::resolve(&env, &BrowserSettings::default()).unwrap_err();
        assert!(matches!(err, SessionError::LaunchFailure(ref m) if m.contains("empty")));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_executable_is_launch_failure() {
        use std::os::unix::ffi::OsStringExt;

        let env = MapEnv::default()
            .with("PUPPETEER_EXECUTABLE_PATH", OsString::from_vec(vec![0x2f, 0xff, 0xfe]));
        let err = SessionConfig::resolve(&env, &BrowserSettings::default()).unwrap_err();
        assert!(matches!(err, SessionError::LaunchFailure(ref m) if m.contains("UTF-8")));
    }

    #[test]
    fn test_remote_skips_executable_resolution() {
        let settings = BrowserSettings {
            remote_url: Some("http://127.0.0.1:9222".to_string()),
            ..BrowserSettings::default()
        };
        let config = SessionConfig::resolve(&MapEnv::default(), &settings).unwrap();
        assert_eq!(config.runtime, RuntimeEnvironment::Remote);
        assert_eq!(config.executable, None);
        assert_eq!(config.remote_url.as_deref(), Some("http://127.0.0.1:9222"));
    }
}
