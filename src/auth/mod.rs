//! Credential resolution for the three transports.
//!
//! - **stdio**: one process-wide token, resolved lazily from the configured
//!   token or by logging in with the configured account. Shared by every
//!   request arriving over stdio.
//! - **sse / streamable-http**: every HTTP request carries its own
//!   credentials (`Authorization`, or `x-xiaoya-account` +
//!   `x-xiaoya-password`). The resolved token lives in a task-local
//!   [`RequestAuth`] for the duration of that request only, so concurrent
//!   requests never see each other's credentials.
//!
//! Tokens obtained by account login are cached per account for the lifetime
//! of the process.

mod login;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::RwLock;

pub use login::{ACCESS_TOKEN_COOKIE, LoginClient, random_state};

use crate::config::{StdioCredentials, TransportKind};
use crate::error::{Error, Result};
use crate::secret::Secret;

tokio::task_local! {
    static REQUEST_AUTH: Arc<RequestAuth>;
}

/// Normalize a raw token into `Bearer <token>` form.
///
/// Blank input yields `None`; an existing `Bearer ` prefix is kept.
pub fn normalize_token(raw: &str) -> Option<Secret> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }
    if token.starts_with("Bearer ") {
        Some(Secret::new(token))
    } else {
        Some(Secret::new(format!("Bearer {}", token)))
    }
}

/// Credentials seen by a single HTTP request
#[derive(Debug)]
pub struct RequestAuth {
    transport: TransportKind,
    token: Mutex<Option<Secret>>,
    account: Option<String>,
    password: Option<Secret>,
}

impl RequestAuth {
    pub fn new(
        transport: TransportKind,
        token: Option<Secret>,
        account: Option<String>,
        password: Option<Secret>,
    ) -> Self {
        Self {
            transport,
            token: Mutex::new(token),
            account,
            password,
        }
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn token(&self) -> Option<Secret> {
        self.token.lock().map(|t| t.clone()).unwrap_or(None)
    }

    fn replace_token(&self, token: Secret) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token);
        }
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }
}

/// The [`RequestAuth`] of the running request, if any.
///
/// Requests arriving over stdio run without a scope.
pub fn current_request() -> Option<Arc<RequestAuth>> {
    REQUEST_AUTH.try_with(|auth| auth.clone()).ok()
}

/// Run `fut` inside a request scope captured earlier with
/// [`current_request`], for work moved onto another task.
pub async fn within<F: Future>(auth: Option<Arc<RequestAuth>>, fut: F) -> F::Output {
    match auth {
        Some(auth) => REQUEST_AUTH.scope(auth, fut).await,
        None => fut.await,
    }
}

/// Transport of the running request (`stdio` outside any request scope)
pub fn current_transport() -> TransportKind {
    current_request()
        .map(|auth| auth.transport())
        .unwrap_or(TransportKind::Stdio)
}

/// Where the reported token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    /// Process configuration (stdio)
    Env,
    /// Request headers
    Header,
    /// A fresh login requested by the caller
    Provided,
}

/// Snapshot of the credentials in effect, reported by `auth_status`
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub token: Secret,
    pub transport: TransportKind,
    pub account: Option<String>,
    pub replaced: bool,
    pub source: Option<TokenSource>,
}

/// Resolves and caches platform credentials
#[derive(Debug)]
pub struct Authenticator {
    login: LoginClient,
    stdio: StdioCredentials,
    /// The stdio token, populated on first use
    cached: tokio::sync::Mutex<Option<Secret>>,
    account_tokens: RwLock<HashMap<String, Secret>>,
}

impl Authenticator {
    pub fn new(login: LoginClient, stdio: StdioCredentials) -> Self {
        Self {
            login,
            stdio,
            cached: tokio::sync::Mutex::new(None),
            account_tokens: RwLock::new(HashMap::new()),
        }
    }

    pub fn stdio_account(&self) -> Option<&str> {
        self.stdio.account.as_deref()
    }

    /// Log in, reporting failures as `None` after logging them.
    async fn try_login(&self, account: &str, password: &Secret) -> Option<Secret> {
        match self.login.login(account, password).await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "Login failed");
                None
            }
        }
    }

    /// Resolve the token for a network request from its headers.
    ///
    /// An `Authorization` header wins. Otherwise the account's cached token is
    /// used, and only without one does a login happen (which needs the
    /// password). Returns `None` when nothing resolves.
    pub async fn resolve_request_token(
        &self,
        authorization: Option<&str>,
        account: Option<&str>,
        password: Option<&Secret>,
    ) -> Option<Secret> {
        if let Some(header) = authorization.filter(|h| !h.trim().is_empty()) {
            return normalize_token(header);
        }

        let account = account.filter(|a| !a.is_empty())?;
        if let Some(cached) = self.account_tokens.read().await.get(account) {
            return Some(cached.clone());
        }

        let password = password.filter(|p| !p.is_empty())?;
        let token = self.try_login(account, password).await?;
        let token = normalize_token(token.expose())?;
        self.account_tokens
            .write()
            .await
            .insert(account.to_string(), token.clone());
        Some(token)
    }

    /// Run `fut` with request-scoped credentials.
    ///
    /// Network transports resolve their token up front; stdio scopes carry no
    /// token and fall back to the process credentials.
    pub async fn scope<F>(
        &self,
        transport: TransportKind,
        authorization: Option<String>,
        account: Option<String>,
        password: Option<Secret>,
        fut: F,
    ) -> F::Output
    where
        F: Future,
    {
        let token = if transport.is_network() {
            self.resolve_request_token(authorization.as_deref(), account.as_deref(), password.as_ref())
                .await
        } else {
            None
        };
        let auth = Arc::new(RequestAuth::new(transport, token, account, password));
        REQUEST_AUTH.scope(auth, fut).await
    }

    /// Initialize the stdio token if it is not set yet.
    ///
    /// Concurrent callers wait for a single initialization.
    pub async fn initialize(&self) -> Result<Secret> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let raw = match &self.stdio.token {
            Some(token) => token.clone(),
            None => match (&self.stdio.account, &self.stdio.password) {
                (Some(account), Some(password)) => self.login.login(account, password).await?,
                _ => {
                    return Err(Error::Auth(
                        "missing stdio credentials: set XIAOYA_AUTH_TOKEN or \
                         XIAOYA_ACCOUNT + XIAOYA_PASSWORD"
                            .into(),
                    ));
                }
            },
        };

        let token = normalize_token(raw.expose())
            .ok_or_else(|| Error::Auth("authentication initialization failed: empty token".into()))?;
        *cached = Some(token.clone());
        tracing::info!(token = %token.preview(), "Authentication initialized");
        Ok(token)
    }

    /// The `Authorization` header value for the running request.
    pub async fn authorization(&self) -> Result<Secret> {
        match current_request() {
            Some(auth) if auth.transport().is_network() => auth.token().ok_or_else(|| {
                Error::Auth(format!(
                    "{} is missing credentials (Authorization or x-xiaoya-account/x-xiaoya-password)",
                    auth.transport()
                ))
            }),
            _ => self.initialize().await,
        }
    }

    /// Report the credentials in effect, optionally logging in again first.
    ///
    /// A refresh needs an account and password: from the configuration for
    /// stdio, from the request headers otherwise. A failed refresh keeps the
    /// previous token.
    pub async fn status(&self, refresh: bool) -> Result<AuthStatus> {
        match current_request() {
            Some(auth) if auth.transport().is_network() => self.request_status(&auth, refresh).await,
            _ => self.stdio_status(refresh).await,
        }
    }

    async fn stdio_status(&self, refresh: bool) -> Result<AuthStatus> {
        let mut token = self.initialize().await?;
        let mut source = TokenSource::Env;
        let mut replaced = false;

        if refresh
            && let (Some(account), Some(password)) = (&self.stdio.account, &self.stdio.password)
            && let Some(fresh) = self.try_login(account, password).await
        {
            *self.cached.lock().await = Some(fresh.clone());
            token = fresh;
            source = TokenSource::Provided;
            replaced = true;
        }

        Ok(AuthStatus {
            token,
            transport: TransportKind::Stdio,
            account: self.stdio.account.clone(),
            replaced,
            source: Some(source),
        })
    }

    async fn request_status(&self, auth: &RequestAuth, refresh: bool) -> Result<AuthStatus> {
        let mut token = auth.token();
        let mut source = token.as_ref().map(|_| TokenSource::Header);
        let mut replaced = false;

        // Unlike resolve_request_token, a refresh skips the account cache and
        // always logs in again.
        if refresh
            && let (Some(account), Some(password)) = (auth.account(), auth.password.as_ref())
            && let Some(fresh) = self.try_login(account, password).await
        {
            self.account_tokens
                .write()
                .await
                .insert(account.to_string(), fresh.clone());
            auth.replace_token(fresh.clone());
            token = Some(fresh);
            source = Some(TokenSource::Provided);
            replaced = true;
        }

        let token = token.ok_or_else(|| Error::Auth("token missing or login failed".into()))?;
        Ok(AuthStatus {
            token,
            transport: auth.transport(),
            account: auth.account.clone(),
            replaced,
            source,
        })
    }
}
