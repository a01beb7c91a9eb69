//! HTTP handlers.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use url::Url;

use super::AppState;
use crate::error::SearchError;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedirectParams {
    pub url: Option<String>,
    pub site: Option<String>,
}

fn bad_request(message: &str) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Keyword search. Failures are reported in the body with status 200.
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> impl IntoResponse {
    let keyword = params.q.unwrap_or_default();

    match state.orchestrator.search(&keyword).await {
        Ok(response) => Json(response).into_response(),
        Err(e @ SearchError::EmptyKeyword) => bad_request(&e.to_string()),
    }
}

/// Redirects to the referral-tagged link, or to the original on any failure.
pub async fn redirect(State(state): State<AppState>, Query(params): Query<RedirectParams>) -> impl IntoResponse {
    let (Some(url), Some(site)) = (params.url, params.site) else {
        return bad_request("Both url and site are required");
    };
    if site.trim().is_empty() {
        return bad_request("Both url and site are required");
    }
    if !is_web_url(&url) {
        return bad_request("url must be an absolute http(s) URL");
    }

    let target = state.resolver.resolve_or_original(&url, &site).await;
    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}

fn is_web_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

/// Former server-side viewed ledger. Clients keep it locally now.
pub async fn save_viewed() -> impl IntoResponse {
    (
        StatusCode::GONE,
        Json(serde_json::json!({
            "error": "Gone",
            "message": "Viewed offers are no longer stored on the server; keep them in the local ledger",
        })),
    )
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
