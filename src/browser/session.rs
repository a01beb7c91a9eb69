//! Scoped browser sessions.
//!
//! [`SessionManager::with_session`] is the only way to get a page. It starts
//! a fresh browser for every call and closes it on every exit path of the
//! caller's future, panics included. Sessions are never pooled.

use crate::browser::config::{RuntimeEnvironment, SessionConfig};
use crate::error::SessionError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::{FutureExt, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One open tab.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigates and waits for the load event.
    async fn goto(&self, url: &str) -> Result<(), SessionError>;

    /// Returns the rendered document.
    async fn content(&self) -> Result<String, SessionError>;

    /// Returns the URL the tab settled on.
    async fn url(&self) -> Result<Option<String>, SessionError>;

    async fn set_user_agent(&self, user_agent: &str) -> Result<(), SessionError>;

    /// Returns true if any element matches the selector.
    async fn has_element(&self, selector: &str) -> Result<bool, SessionError>;

    /// Focuses the first matching element and types into it.
    async fn type_into(&self, selector: &str, text: &str) -> Result<(), SessionError>;

    /// Clicks the first matching element and waits for the resulting navigation.
    async fn click_and_wait(&self, selector: &str) -> Result<(), SessionError>;
}

/// A running browser owned by exactly one session.
#[async_trait]
pub trait BrowserProcess: Send {
    async fn new_page(&mut self) -> Result<Box<dyn PageHandle>, SessionError>;

    /// Terminates the browser. Errors are logged, never returned.
    async fn close(&mut self);
}

/// Starts browsers - enables mocking for tests.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn BrowserProcess>, SessionError>;
}

/// Page wrapper applying the configured time limits.
pub struct Session {
    page: Box<dyn PageHandle>,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

impl Session {
    pub fn new(page: Box<dyn PageHandle>, navigation_timeout: Duration, settle_delay: Duration) -> Self {
        Self { page, navigation_timeout, settle_delay }
    }

    /// Navigates within the navigation timeout.
    pub async fn goto(&self, url: &str) -> Result<(), SessionError> {
        self.goto_within(url, self.navigation_timeout).await
    }

    /// Navigates within a caller-chosen limit.
    pub async fn goto_within(&self, url: &str, limit: Duration) -> Result<(), SessionError> {
        debug!("Navigating to {}", url);
        match tokio::time::timeout(limit, self.page.goto(url)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::NavigationTimeout { url: url.to_string(), secs: limit.as_secs() }),
        }
    }

    /// Waits for client-side rendering to finish.
    pub async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    pub async fn content(&self) -> Result<String, SessionError> {
        self.page.content().await
    }

    pub async fn current_url(&self) -> Result<Option<String>, SessionError> {
        self.page.url().await
    }

    pub async fn has_element(&self, selector: &str) -> Result<bool, SessionError> {
        self.page.has_element(selector).await
    }

    /// Types into the page's own form and submits it.
    ///
    /// Returns `Ok(false)` when the page has no matching input.
    pub async fn submit_form(&self, input: &str, submit: &str, text: &str) -> Result<bool, SessionError> {
        if !self.page.has_element(input).await? {
            return Ok(false);
        }

        self.page.type_into(input, text).await?;
        match tokio::time::timeout(self.navigation_timeout, self.page.click_and_wait(submit)).await {
            Ok(result) => result.map(|_| true),
            Err(_) => Err(SessionError::NavigationTimeout {
                url: "form submission".to_string(),
                secs: self.navigation_timeout.as_secs(),
            }),
        }
    }
}

/// Hands out one-shot browser sessions.
#[derive(Clone)]
pub struct SessionManager {
    config: Result<SessionConfig, SessionError>,
    launcher: Arc<dyn BrowserLauncher>,
}

impl SessionManager {
    /// Creates a manager backed by Chromium.
    ///
    /// A config that failed to resolve is kept and reported by every call.
    pub fn new(config: Result<SessionConfig, SessionError>) -> Self {
        Self::with_launcher(config, Arc::new(ChromiumLauncher::new()))
    }

    /// Creates a manager with a custom launcher (for testing).
    pub fn with_launcher(config: Result<SessionConfig, SessionError>, launcher: Arc<dyn BrowserLauncher>) -> Self {
        if let Err(e) = &config {
            warn!("Browser sessions unavailable: {}", e);
        }
        Self { config, launcher }
    }

    pub fn config(&self) -> Result<&SessionConfig, SessionError> {
        self.config.as_ref().map_err(Clone::clone)
    }

    /// Runs `f` with a fresh page and always closes the browser afterwards.
    pub async fn with_session<T, F, Fut>(&self, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(Session) -> Fut + Send,
        Fut: Future<Output = Result<T, SessionError>> + Send,
        T: Send,
    {
        let config = self.config()?;
        let mut process = self.launcher.launch(config).await?;

        let outcome = AssertUnwindSafe(async {
            let page = process.new_page().await?;
            page.set_user_agent(&config.user_agent).await?;
            f(Session::new(page, config.navigation_timeout, config.settle_delay)).await
        })
        .catch_unwind()
        .await;

        process.close().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Launches Chromium or connects to a remote DevTools endpoint.
pub struct ChromiumLauncher {
    http: Option<wreq::Client>,
}

impl ChromiumLauncher {
    pub fn new() -> Self {
        let http = wreq::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| warn!("DevTools discovery client unavailable: {}", e))
            .ok();
        Self { http }
    }

    /// Finds the browser websocket URL of a remote endpoint via `/json/version`.
    pub async fn discover_ws_url(&self, remote: &str) -> Result<String, SessionError> {
        if remote.starts_with("ws") && remote.contains("/devtools/") {
            return Ok(remote.to_string());
        }

        let http_url = remote.replacen("ws://", "http://", 1).replacen("wss://", "https://", 1);
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));
        debug!("Discovering DevTools endpoint at {}", version_url);

        let client = self
            .http
            .as_ref()
            .ok_or_else(|| SessionError::LaunchFailure("HTTP client unavailable".to_string()))?;

        let body = client
            .get(&version_url)
            .send()
            .await
            .map_err(|e| SessionError::LaunchFailure(format!("remote browser unreachable: {}", e)))?
            .text()
            .await
            .map_err(|e| SessionError::LaunchFailure(format!("failed to read {}: {}", version_url, e)))?;

        let info: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| SessionError::LaunchFailure(format!("invalid version info: {}", e)))?;

        info.get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| SessionError::LaunchFailure("no webSocketDebuggerUrl in response".to_string()))
    }
}

impl Default for ChromiumLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn BrowserProcess>, SessionError> {
        let (browser, mut handler) = match config.runtime {
            RuntimeEnvironment::Remote => {
                let remote = config
                    .remote_url
                    .as_deref()
                    .ok_or_else(|| SessionError::LaunchFailure("remote url missing".to_string()))?;
                let ws_url = self.discover_ws_url(remote).await?;
                info!("Connecting to remote browser at {}", ws_url);
                Browser::connect(ws_url)
                    .await
                    .map_err(|e| SessionError::LaunchFailure(e.to_string()))?
            }
            RuntimeEnvironment::Hosted | RuntimeEnvironment::Local => {
                let mut builder = BrowserConfig::builder().args(config.args.iter().cloned());
                if let Some(path) = &config.executable {
                    builder = builder.chrome_executable(path);
                }
                if let Some((width, height)) = config.viewport {
                    builder = builder.window_size(width, height);
                }
                let browser_config = builder.build().map_err(SessionError::LaunchFailure)?;

                debug!("Launching {} browser", config.runtime);
                Browser::launch(browser_config)
                    .await
                    .map_err(|e| SessionError::LaunchFailure(e.to_string()))?
            }
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let message = e.to_string();
                    // Newer Chrome builds emit CDP messages the client does not know.
                    if message.contains("did not match any variant") {
                        continue;
                    }
                    debug!("CDP handler stopped: {}", message);
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumProcess {
            browser,
            handler_task,
            remote: config.runtime == RuntimeEnvironment::Remote,
            pages: Vec::new(),
        }))
    }
}

struct ChromiumProcess {
    browser: Browser,
    handler_task: JoinHandle<()>,
    remote: bool,
    pages: Vec<Page>,
}

#[async_trait]
impl BrowserProcess for ChromiumProcess {
    async fn new_page(&mut self) -> Result<Box<dyn PageHandle>, SessionError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Page(e.to_string()))?;
        self.pages.push(page.clone());
        Ok(Box::new(ChromiumPage(page)))
    }

    async fn close(&mut self) {
        if self.remote {
            // The remote browser is shared, so only our tabs go away.
            for page in self.pages.drain(..) {
                if let Err(e) = page.close().await {
                    debug!("Page close error (ignored): {}", e);
                }
            }
        } else if let Err(e) = self.browser.close().await {
            debug!("Browser close error (ignored): {}", e);
        }
        self.handler_task.abort();
    }
}

impl Drop for ChromiumProcess {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

struct ChromiumPage(Page);

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), SessionError> {
        self.0
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Navigation(e.to_string()))
    }

    async fn content(&self) -> Result<String, SessionError> {
        self.0.content().await.map_err(|e| SessionError::Page(e.to_string()))
    }

    async fn url(&self) -> Result<Option<String>, SessionError> {
        self.0.url().await.map_err(|e| SessionError::Page(e.to_string()))
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<(), SessionError> {
        self.0
            .execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Page(e.to_string()))
    }

    async fn has_element(&self, selector: &str) -> Result<bool, SessionError> {
        Ok(self.0.find_element(selector).await.is_ok())
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), SessionError> {
        let element = self
            .0
            .find_element(selector)
            .await
            .map_err(|e| SessionError::Page(e.to_string()))?;
        element.click().await.map_err(|e| SessionError::Page(e.to_string()))?;
        element.type_str(text).await.map_err(|e| SessionError::Page(e.to_string()))?;
        Ok(())
    }

    async fn click_and_wait(&self, selector: &str) -> Result<(), SessionError> {
        let element = self
            .0
            .find_element(selector)
            .await
            .map_err(|e| SessionError::Page(e.to_string()))?;
        element.click().await.map_err(|e| SessionError::Page(e.to_string()))?;
        self.0
            .wait_for_navigation()
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Navigation(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable in-memory browser for session tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Counts launches and closes and serves canned pages by URL.
    #[derive(Default)]
    pub struct FakeLauncher {
        pub launches: AtomicU32,
        pub closes: Arc<AtomicU32>,
        pub pages: HashMap<String, FakePage>,
        pub launch_error: Option<SessionError>,
    }

    /// What navigating to a URL yields.
    #[derive(Clone, Default)]
    pub struct FakePage {
        pub html: String,
        /// URL reported after navigation (redirect target)
        pub final_url: Option<String>,
        /// Navigation delay
        pub delay: Duration,
    }

    impl FakeLauncher {
        pub fn with_page(mut self, url: &str, page: FakePage) -> Self {
            self.pages.insert(url.to_string(), page);
            self
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self, _config: &SessionConfig) -> Result<Box<dyn BrowserProcess>, SessionError> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = &self.launch_error {
                return Err(e.clone());
            }
            Ok(Box::new(FakeProcess { closes: self.closes.clone(), pages: self.pages.clone() }))
        }
    }

    struct FakeProcess {
        closes: Arc<AtomicU32>,
        pages: HashMap<String, FakePage>,
    }

    #[async_trait]
    impl BrowserProcess for FakeProcess {
        async fn new_page(&mut self) -> Result<Box<dyn PageHandle>, SessionError> {
            Ok(Box::new(FakeTab { pages: self.pages.clone(), current: Mutex::new(None) }))
        }

        async fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeTab {
        pages: HashMap<String, FakePage>,
        current: Mutex<Option<(String, FakePage)>>,
    }

    #[async_trait]
    impl PageHandle for FakeTab {
        async fn goto(&self, url: &str) -> Result<(), SessionError> {
            let page = self
                .pages
                .get(url)
                .cloned()
                .ok_or_else(|| SessionError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))?;
            tokio::time::sleep(page.delay).await;
            *self.current.lock().unwrap() = Some((url.to_string(), page));
            Ok(())
        }

        async fn content(&self) -> Result<String, SessionError> {
            Ok(self.current.lock().unwrap().as_ref().map(|(_, p)| p.html.clone()).unwrap_or_default())
        }

        async fn url(&self) -> Result<Option<String>, SessionError> {
            Ok(self
                .current
                .lock()
                .unwrap()
                .as_ref()
                .map(|(url, p)| p.final_url.clone().unwrap_or_else(|| url.clone())))
        }

        async fn set_user_agent(&self, _user_agent: &str) -> Result<(), SessionError> {
            Ok(())
        }

        async fn has_element(&self, selector: &str) -> Result<bool, SessionError> {
            let html = self.content().await?;
            let document = scraper::Html::parse_document(&html);
            let selector = scraper::Selector::parse(selector)
                .map_err(|e| SessionError::Page(format!("bad selector: {:?}", e)))?;
            Ok(document.select(&selector).next().is_some())
        }

        async fn type_into(&self, _selector: &str, _text: &str) -> Result<(), SessionError> {
            Ok(())
        }

        async fn click_and_wait(&self, _selector: &str) -> Result<(), SessionError> {
            Ok(())
        }
    }

    pub fn test_config() -> SessionConfig {
        SessionConfig {
            runtime: RuntimeEnvironment::Local,
            executable: Some("/usr/bin/chromium".into()),
            remote_url: None,
            args: Vec::new(),
            viewport: None,
            navigation_timeout: Duration::from_millis(200),
            settle_delay: Duration::ZERO,
            user_agent: "test-agent".to_string(),
        }
    }
}
