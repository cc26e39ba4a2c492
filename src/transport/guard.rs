//! Credential guard for the network transports.
//!
//! Every request must carry `Authorization` or both `x-xiaoya-account` and
//! `x-xiaoya-password`. Accepted requests run inside an
//! [`Authenticator::scope`] so tools see that request's credentials.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::Authenticator;
use crate::config::TransportKind;
use crate::secret::Secret;

pub const ACCOUNT_HEADER: &str = "x-xiaoya-account";
pub const PASSWORD_HEADER: &str = "x-xiaoya-password";

const REDACTED: &str = "[REDACTED]";

/// Middleware state: which transport is guarded, and who resolves tokens
#[derive(Debug, Clone)]
pub struct GuardState {
    pub transport: TransportKind,
    pub auth: Arc<Authenticator>,
}

/// Credentials found on a request
#[derive(Debug, Default)]
struct Credentials {
    authorization: Option<String>,
    account: Option<String>,
    password: Option<Secret>,
}

impl Credentials {
    fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            authorization: text(header::AUTHORIZATION.as_str()),
            account: text(ACCOUNT_HEADER),
            password: text(PASSWORD_HEADER).map(Secret::new),
        }
    }

    fn present(&self) -> bool {
        self.authorization.is_some() || (self.account.is_some() && self.password.is_some())
    }
}

/// Render headers for logging with credential values hidden.
pub fn redacted_headers(headers: &HeaderMap) -> String {
    let parts: Vec<String> = headers
        .iter()
        .map(|(name, value)| {
            let shown = if name == header::AUTHORIZATION
                || name == header::COOKIE
                || name.as_str() == PASSWORD_HEADER
            {
                REDACTED
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            format!("{}: {}", name, shown)
        })
        .collect();
    parts.join(", ")
}

fn unauthorized() -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        serde_json::json!({"error": "missing credentials"}).to_string(),
    )
        .into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

/// Reject requests without credentials; run the rest in a credential scope.
pub async fn require_credentials(
    State(guard): State<GuardState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let version = request.version();
    let credentials = Credentials::from_headers(request.headers());

    if !credentials.present() {
        tracing::warn!(
            headers = %redacted_headers(request.headers()),
            "Unauthorized {} request to {} over {:?} from {}",
            method,
            path,
            version,
            peer
        );
        return unauthorized();
    }

    tracing::info!(
        transport = %guard.transport,
        headers = %redacted_headers(request.headers()),
        "Accepted {} request to {} over {:?} from {}",
        method,
        path,
        version,
        peer
    );

    let Credentials {
        authorization,
        account,
        password,
    } = credentials;
    guard
        .auth
        .scope(guard.transport, authorization, account, password, next.run(request))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_credentials_present() {
        assert!(Credentials::from_headers(&headers(&[("authorization", "tok")])).present());
        assert!(
            Credentials::from_headers(&headers(&[
                (ACCOUNT_HEADER, "teacher"),
                (PASSWORD_HEADER, "pw")
            ]))
            .present()
        );
        assert!(!Credentials::from_headers(&headers(&[(ACCOUNT_HEADER, "teacher")])).present());
        assert!(!Credentials::from_headers(&headers(&[("authorization", "  ")])).present());
        assert!(!Credentials::from_headers(&HeaderMap::new()).present());
    }

    #[test]
    fn test_redacted_headers_hide_secrets() {
        let rendered = redacted_headers(&headers(&[
            ("authorization", "Bearer secret-token"),
            (PASSWORD_HEADER, "hunter2"),
            (ACCOUNT_HEADER, "teacher"),
        ]));
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("x-xiaoya-account: teacher"));
    }
}
