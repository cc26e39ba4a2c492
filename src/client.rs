//! HTTP client for the teaching platform's REST API
//!
//! Every call attaches the `Authorization` header resolved for the running
//! request (see [`crate::auth`]) and unwraps the platform's
//! `{"success": .., "data": .., "message": ..}` envelope.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::auth::Authenticator;
use crate::config::PlatformUrls;
use crate::error::{Error, Result};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";
const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Headers the platform expects on every call
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers
}

/// Extract `data` from a platform response envelope.
///
/// Bodies without a `success` flag are returned unchanged.
pub fn unwrap_envelope(status: StatusCode, body: Value) -> Result<Value> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(body.get("data").cloned().unwrap_or(Value::Null)),
        Some(false) => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request rejected by platform");
            Err(Error::api(status, message))
        }
        None => Ok(body),
    }
}

/// Authenticated client for the platform API
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: Client,
    urls: PlatformUrls,
    auth: Arc<Authenticator>,
}

impl PlatformClient {
    pub fn new(urls: PlatformUrls, auth: Arc<Authenticator>) -> Result<Self> {
        let http = Client::builder().default_headers(default_headers()).build()?;
        Ok(Self { http, urls, auth })
    }

    pub fn auth(&self) -> &Arc<Authenticator> {
        &self.auth
    }

    /// URL under the main API base
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.urls.api, path.trim_start_matches('/'))
    }

    /// URL under the download API base
    pub fn download_url(&self, path: &str) -> String {
        format!("{}/{}", self.urls.download, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let token = self.auth.authorization().await?;
        let response = request
            .header(reqwest::header::AUTHORIZATION, token.expose())
            .send()
            .await?;

        let status = response.status();
        let url = response.url().path().to_string();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, path = %url, "Platform request failed");
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(Error::api(status, message));
        }

        tracing::debug!(status = %status, path = %url, "Platform request completed");
        let body: Value = response.json().await?;
        unwrap_envelope(status, body)
    }

    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        self.send(self.http.get(url).query(query)).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Value> {
        self.send(self.http.post(url).json(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Value> {
        self.send(self.http.put(url).json(body)).await
    }

    pub async fn delete(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        self.send(self.http.delete(url).query(query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_envelope_success() {
        let data = unwrap_envelope(
            StatusCode::OK,
            json!({"success": true, "data": [1, 2], "message": "ok"}),
        )
        .unwrap();
        assert_eq!(data, json!([1, 2]));
    }

    #[test]
    fn test_unwrap_envelope_failure() {
        let err = unwrap_envelope(
            StatusCode::OK,
            json!({"success": false, "message": "no permission"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no permission"));
    }

    #[test]
    fn test_unwrap_envelope_passthrough() {
        let body = json!({"items": []});
        assert_eq!(unwrap_envelope(StatusCode::OK, body.clone()).unwrap(), body);
    }

    #[test]
    fn test_default_headers() {
        let headers = default_headers();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        assert!(
            headers
                .get(USER_AGENT)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("Mozilla/5.0")
        );
    }
}
