//! Account/password login against the platform's identity service.
//!
//! The flow is a fixed sequence of four calls sharing one cookie jar:
//!
//! 1. `POST login/loginByMobileOrAccount` with the credentials
//! 2. `GET login/listAccounts`, picking the first linked account
//! 3. `POST login/bySelectAccount` with that account id
//! 4. `GET oauth/onAccountAuthRedirect`
//!
//! The last call redirects to the application host, which sets the
//! `FS-prd-access-token` cookie holding the access token. The cookie may land
//! on any host along that redirect chain.

use std::sync::{Arc, Mutex};

use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::client::default_headers;
use crate::error::{Error, Result};
use crate::secret::Secret;

const SCHOOL_ID: &str = "ed965396-cdeb-4d5c-8ff6-dc1f92fe5e2c";
const CLIENT_ID: &str = "xy_client_fzrjxy";
const REDIRECT_URI: &str = "https://fzrjxy.ai-augmented.com/api/jw-starcmooc/user/authorCallback";

/// Cookie that carries the access token after a completed login
pub const ACCESS_TOKEN_COOKIE: &str = "FS-prd-access-token";

/// Length of the random OAuth `state` parameter
const STATE_LEN: usize = 6;

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    account: &'a str,
    password: &'a str,
    school_id: &'a str,
    client_id: &'a str,
    state: String,
    redirect_uri: &'a str,
    week_no_login_status: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectAccountRequest<'a> {
    xy_account_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ListAccountsResponse {
    #[serde(default)]
    data: ListAccountsData,
}

#[derive(Debug, Default, Deserialize)]
struct ListAccountsData {
    #[serde(default)]
    accounts: Vec<LinkedAccount>,
}

#[derive(Debug, Deserialize)]
struct LinkedAccount {
    id: serde_json::Value,
}

/// Random alphanumeric string used as the OAuth `state` parameter
pub fn random_state(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Follow redirects like the default policy, remembering every URL visited.
fn recording_redirects(visited: Arc<Mutex<Vec<Url>>>) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        if let Ok(mut visited) = visited.lock() {
            visited.push(attempt.url().clone());
        }
        attempt.follow()
    })
}

/// Performs the login flow. Each login gets a fresh cookie jar.
#[derive(Debug, Clone)]
pub struct LoginClient {
    auth_base: String,
}

impl LoginClient {
    pub fn new(auth_base: impl Into<String>) -> Self {
        Self {
            auth_base: auth_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.auth_base, path)
    }

    /// Log in and return the normalized `Bearer` token.
    pub async fn login(&self, account: &str, password: &Secret) -> Result<Secret> {
        let jar = Arc::new(Jar::default());
        let visited = Arc::new(Mutex::new(Vec::new()));
        let client = Client::builder()
            .default_headers(default_headers())
            .cookie_provider(jar.clone())
            .redirect(recording_redirects(visited.clone()))
            .build()?;

        tracing::debug!(account = %account, "Starting platform login");

        client
            .post(self.url("login/loginByMobileOrAccount"))
            .json(&LoginRequest {
                account,
                password: password.expose(),
                school_id: SCHOOL_ID,
                client_id: CLIENT_ID,
                state: random_state(STATE_LEN),
                redirect_uri: REDIRECT_URI,
                week_no_login_status: false,
            })
            .send()
            .await?
            .error_for_status()?;

        let accounts: ListAccountsResponse = client
            .get(self.url("login/listAccounts"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let account_id = accounts
            .data
            .accounts
            .first()
            .map(|a| match &a.id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| Error::Login("no account available for these credentials".into()))?;

        client
            .post(self.url("login/bySelectAccount"))
            .json(&SelectAccountRequest {
                xy_account_id: &account_id,
            })
            .send()
            .await?
            .error_for_status()?;

        let redirected = client
            .get(self.url("oauth/onAccountAuthRedirect"))
            .send()
            .await?
            .error_for_status()?;

        // Latest hop first, then the configured callback and the auth service
        let mut candidates = vec![redirected.url().clone()];
        if let Ok(visited) = visited.lock() {
            candidates.extend(visited.iter().rev().cloned());
        }
        candidates.extend(Url::parse(REDIRECT_URI));
        candidates.push(
            Url::parse(&self.auth_base)
                .map_err(|e| Error::Config(format!("invalid auth base URL: {}", e)))?,
        );

        let token = candidates
            .iter()
            .find_map(|url| {
                let header = jar.cookies(url)?;
                find_cookie(header.to_str().ok()?, ACCESS_TOKEN_COOKIE)
            })
            .ok_or_else(|| Error::Login(format!("{} cookie not set", ACCESS_TOKEN_COOKIE)))?;

        tracing::info!(account = %account, "Platform login succeeded");
        Ok(Secret::new(format!("Bearer {}", token)))
    }
}

/// Find a cookie value in a `Cookie` header string (`a=1; b=2`).
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
pub(crate) mod mock {
    //! Login service on 127.0.0.1 whose final redirect lands on `localhost`,
    //! a different cookie host.

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::{
        Json, Router,
        extract::State,
        http::{StatusCode, header},
        response::{IntoResponse, Redirect, Response},
        routing::{get, post},
    };
    use serde_json::{Value, json};

    pub const ACCOUNT: &str = "teacher01";
    pub const PASSWORD: &str = "pw";

    #[derive(Clone)]
    struct MockState {
        port: u16,
        logins: Arc<AtomicUsize>,
    }

    pub struct MockLogin {
        pub auth_base: String,
        logins: Arc<AtomicUsize>,
    }

    impl MockLogin {
        /// Number of accepted credential posts
        pub fn logins(&self) -> usize {
            self.logins.load(Ordering::SeqCst)
        }
    }

    async fn login(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
        if body["account"] != ACCOUNT || body["password"] != PASSWORD {
            return (StatusCode::FORBIDDEN, "bad credentials").into_response();
        }
        // Long enough for concurrent callers to overlap
        tokio::time::sleep(Duration::from_millis(20)).await;
        state.logins.fetch_add(1, Ordering::SeqCst);
        (
            [(header::SET_COOKIE, "SESSION=s-1; Path=/")],
            Json(json!({"success": true})),
        )
            .into_response()
    }

    async fn list_accounts() -> Json<Value> {
        Json(json!({"data": {"accounts": [{"id": 42}]}}))
    }

    async fn select_account(Json(body): Json<Value>) -> StatusCode {
        if body["xyAccountId"] == "42" {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    async fn auth_redirect(State(state): State<MockState>) -> Redirect {
        Redirect::to(&format!(
            "http://localhost:{}/api/jw-starcmooc/user/authorCallback",
            state.port
        ))
    }

    async fn author_callback(State(state): State<MockState>) -> Response {
        let cookie = format!(
            "FS-prd-access-token=tok-{}; Path=/",
            state.logins.load(Ordering::SeqCst)
        );
        ([(header::SET_COOKIE, cookie)], "ok").into_response()
    }

    pub async fn spawn() -> MockLogin {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let logins = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/login/loginByMobileOrAccount", post(login))
            .route("/login/listAccounts", get(list_accounts))
            .route("/login/bySelectAccount", post(select_account))
            .route("/oauth/onAccountAuthRedirect", get(auth_redirect))
            .route("/api/jw-starcmooc/user/authorCallback", get(author_callback))
            .with_state(MockState {
                port,
                logins: logins.clone(),
            });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        MockLogin {
            auth_base: format!("http://127.0.0.1:{}", port),
            logins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_state_is_alphanumeric() {
        let state = random_state(STATE_LEN);
        assert_eq!(state.len(), STATE_LEN);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_find_cookie() {
        let header = "SESSION=abc; FS-prd-access-token=tok123; other=1";
        assert_eq!(
            find_cookie(header, ACCESS_TOKEN_COOKIE),
            Some("tok123".to_string())
        );
        assert_eq!(find_cookie(header, "missing"), None);
        assert_eq!(find_cookie("FS-prd-access-token=", ACCESS_TOKEN_COOKIE), None);
    }

    #[test]
    fn test_login_request_uses_platform_field_names() {
        let body = serde_json::to_value(LoginRequest {
            account: "t01",
            password: "pw",
            school_id: SCHOOL_ID,
            client_id: CLIENT_ID,
            state: "abc123".into(),
            redirect_uri: REDIRECT_URI,
            week_no_login_status: false,
        })
        .unwrap();
        assert_eq!(body["schoolId"], SCHOOL_ID);
        assert_eq!(body["clientId"], CLIENT_ID);
        assert_eq!(body["redirectUri"], REDIRECT_URI);
        assert_eq!(body["weekNoLoginStatus"], false);
    }

    #[tokio::test]
    async fn test_token_cookie_set_by_redirect_target_host() {
        let server = mock::spawn().await;
        let token = LoginClient::new(server.auth_base.clone())
            .login(mock::ACCOUNT, &Secret::new(mock::PASSWORD))
            .await
            .unwrap();
        assert_eq!(token.expose(), "Bearer tok-1");
        assert_eq!(server.logins(), 1);
    }

    #[tokio::test]
    async fn test_rejected_credentials_fail_login() {
        let server = mock::spawn().await;
        let result = LoginClient::new(server.auth_base.clone())
            .login(mock::ACCOUNT, &Secret::new("wrong"))
            .await;
        assert!(result.is_err());
        assert_eq!(server.logins(), 0);
    }
}
