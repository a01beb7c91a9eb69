//! Browser-backed access to the comparison site.
//!
//! Result pages are rendered client-side, so plain HTTP fetches see an empty
//! shell. Every call here drives a real browser session.

use crate::browser::SessionManager;
use crate::dokotoku::selectors::form;
use crate::error::SessionError;
use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

/// Origin of the comparison site, without trailing slash.
pub const SITE_ORIGIN: &str = "https://dokotoku.jp";

const SITE_HOST: &str = "dokotoku.jp";

/// Path prefix of the site's tracking redirector.
const REDIRECTOR_PREFIX: &str = "/link/";

/// Renders search result pages - enables mocking for tests.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Returns the rendered HTML of the results page for a keyword.
    async fn render_search(&self, keyword: &str) -> Result<String, SessionError>;
}

/// Follows redirector links - enables mocking for tests.
#[async_trait]
pub trait RedirectFollower: Send + Sync {
    /// Navigates to `url` and returns the URL the page settled on.
    async fn follow(&self, url: &str) -> Result<Option<String>, SessionError>;
}

/// Comparison site client using one fresh browser session per call.
pub struct DokotokuClient {
    sessions: SessionManager,
    base_url: Option<String>,
}

impl DokotokuClient {
    pub fn new(sessions: SessionManager) -> Self {
        Self::with_base_url(sessions, None)
    }

    /// Creates a client with an optional custom base URL (for testing).
    pub fn with_base_url(sessions: SessionManager, base_url: Option<String>) -> Self {
        Self { sessions, base_url }
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(SITE_ORIGIN)
    }
}

/// Builds the query-parameterized search URL.
pub fn search_url(base_url: &str, keyword: &str) -> String {
    format!("{}/?q={}", base_url.trim_end_matches('/'), urlencoding::encode(keyword))
}

/// Returns true if the URL points at the comparison site or one of its subdomains.
pub fn is_source_site(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .is_some_and(|host| host == SITE_HOST || host.ends_with(".dokotoku.jp"))
}

/// Returns true if the URL is one of the site's tracking redirects.
pub fn is_redirector(url: &str) -> bool {
    is_source_site(url) && Url::parse(url).is_ok_and(|u| u.path().starts_with(REDIRECTOR_PREFIX))
}

#[async_trait]
impl PageSource for DokotokuClient {
    async fn render_search(&self, keyword: &str) -> Result<String, SessionError> {
        let url = search_url(self.base_url(), keyword);
        let keyword = keyword.to_string();
        info!("Searching: {}", keyword);

        self.sessions
            .with_session(move |session| async move {
                session.goto(&url).await?;
                session.settle().await;

                // The query parameter is sometimes ignored; fall back to the page's own form.
                if !session.has_element(form::RESULTS_TABLE).await? {
                    debug!("No results table after direct navigation, submitting search form");
                    match session.submit_form(form::KEYWORD_INPUT, form::SUBMIT, &keyword).await {
                        Ok(true) => session.settle().await,
                        Ok(false) => debug!("No search form on page"),
                        Err(e) => warn!("Search form submission failed: {}", e),
                    }
                }

                session.content().await
            })
            .await
    }
}

#[async_trait]
impl RedirectFollower for DokotokuClient {
    async fn follow(&self, url: &str) -> Result<Option<String>, SessionError> {
        let url = url.to_string();
        debug!("Following redirect: {}", url);

        self.sessions
            .with_session(move |session| async move {
                session.goto(&url).await?;
                session.current_url().await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::session::testing::{test_config, FakeLauncher, FakePage};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn client(launcher: FakeLauncher) -> (DokotokuClient, Arc<FakeLauncher>) {
        let launcher = Arc::new(launcher);
        let sessions = SessionManager::with_launcher(Ok(test_config()), launcher.clone());
        (DokotokuClient::with_base_url(sessions, Some("http://fake.test".to_string())), launcher)
    }

    #[test]
    fn test_search_url_encoding() {
        assert_eq!(search_url(SITE_ORIGIN, "楽天 カード"), "https://dokotoku.jp/?q=%E6%A5%BD%E5%A4%A9%20%E3%82%AB%E3%83%BC%E3%83%89");
        assert_eq!(search_url("http://fake.test/", "a&b"), "http://fake.test/?q=a%26b");
    }

    #[test]
    fn test_is_source_site() {
        assert!(is_source_site("https://dokotoku.jp/link/1"));
        assert!(is_source_site("https://www.dokotoku.jp/"));
        assert!(is_source_site("https://DOKOTOKU.JP/"));
        assert!(!is_source_site("https://pc.moppy.jp/ad/detail.php?site_id=1"));
        assert!(!is_source_site("https://notdokotoku.jp/"));
        assert!(!is_source_site("not a url"));
    }

    #[test]
    fn test_is_redirector() {
        assert!(is_redirector("https://dokotoku.jp/link/12345"));
        assert!(!is_redirector("https://dokotoku.jp/?q=test"));
        assert!(!is_redirector("https://example.com/link/1"));
    }

    #[tokio::test]
    async fn test_render_search() {
        let (client, launcher) = client(FakeLauncher::default().with_page(
            "http://fake.test/?q=card",
            FakePage { html: "<html><body><table><tr><td>row</td></tr></table></body></html>".to_string(), ..FakePage::default() },
        ));

        let html = client.render_search("card").await.unwrap();
        assert!(html.contains("<table>"));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_search_without_table_still_returns_content() {
        let (client, _) = client(FakeLauncher::default().with_page(
            "http://fake.test/?q=card",
            FakePage { html: "<html><body><p>no table</p></body></html>".to_string(), ..FakePage::default() },
        ));

        let html = client.render_search("card").await.unwrap();
        assert!(html.contains("no table"));
    }

    #[tokio::test]
    async fn test_follow_returns_final_url() {
        let (client, launcher) = client(FakeLauncher::default().with_page(
            "https://dokotoku.jp/link/1",
            FakePage { final_url: Some("https://pc.moppy.jp/ad/1".to_string()), ..FakePage::default() },
        ));

        let url = client.follow("https://dokotoku.jp/link/1").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://pc.moppy.jp/ad/1"));
        assert_eq!(launcher.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_follow_navigation_error() {
        let (client, _) = client(FakeLauncher::default());
        let err = client.follow("https://dokotoku.jp/link/404").await.unwrap_err();
        assert!(matches!(err, SessionError::Navigation(_)));
    }
}
