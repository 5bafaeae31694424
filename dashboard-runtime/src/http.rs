use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;

use crate::error::{DashboardError, Result};

/// Append `path` to `base`, keeping any path prefix the base URL carries.
pub fn build_url(base: &str, path: &str) -> Result<Url> {
    let base = base.trim_end_matches('/');
    Url::parse(base).map_err(|err| DashboardError::Network(format!("Invalid base URL: {err}")))?;
    let joined = format!("{base}/{}", path.trim_start_matches('/'));
    Url::parse(&joined)
        .map_err(|err| DashboardError::Network(format!("Invalid path '{path}': {err}")))
}

/// JSON content type plus a bearer credential. An empty token sends no
/// `Authorization` header at all.
pub fn auth_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let token = token.trim();
    if !token.is_empty() {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| DashboardError::Validation("Invalid gateway token".into()))?;
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// Send a request and return the status and raw body. Non-2xx statuses are
/// not treated as failures here; callers decide what a status means.
pub async fn send_json(
    client: &Client,
    method: Method,
    url: Url,
    body: Option<&Value>,
    headers: HeaderMap,
) -> Result<(StatusCode, String)> {
    let mut request = client.request(method, url).headers(headers);
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request
        .send()
        .await
        .map_err(|err| DashboardError::Network(format!("HTTP request failed: {err}")))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| DashboardError::Network(format!("Failed to read response body: {err}")))?;

    Ok((status, text))
}

pub fn parse_json(body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|err| DashboardError::Network(format!("Invalid gateway response JSON: {err}")))
}
