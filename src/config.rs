//! Command line and environment configuration
//!
//! Every flag falls back to an environment variable so the server can be
//! launched by MCP clients that only pass an `env` block.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use clap::Parser;
use serde::{Serialize, Serializer};

use crate::secret::Secret;

/// Platform API base for course groups, tasks, questions and attendance
pub const DEFAULT_API_BASE: &str = "https://fzrjxy.ai-augmented.com/api/jx-iresource";
/// Platform API base for resource downloads
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://fzrjxy.ai-augmented.com/api/jx-oresource";
/// Login service base
pub const DEFAULT_AUTH_BASE: &str = "https://infra.ai-augmented.com/api/auth";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MOUNT_PATH: &str = "/mcp";

/// Path of the streamable HTTP endpoint (not affected by the mount path)
pub const STREAMABLE_HTTP_PATH: &str = "/mcp";
/// SSE stream path, relative to the mount path
pub const SSE_PATH: &str = "/sse";
/// SSE message post path, relative to the mount path
pub const SSE_MESSAGE_PATH: &str = "/messages/";

#[derive(Parser, Debug, Clone)]
#[command(name = "xiaoya-teacher-mcp")]
#[command(about = "MCP server for the Xiaoya teaching platform", long_about = None)]
pub struct Args {
    /// Extra transports to serve next to stdio (comma separated: sse, streamable-http)
    #[arg(long, env = "MCP_TRANSPORT", default_value = "")]
    pub transport: String,

    /// Bind address for network transports
    #[arg(long, env = "MCP_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port for network transports
    #[arg(long, env = "MCP_PORT")]
    pub port: Option<String>,

    /// Mount path of the SSE transport
    #[arg(long, env = "MCP_MOUNT_PATH", default_value = DEFAULT_MOUNT_PATH)]
    pub mount_path: String,

    /// Access token used by the stdio transport
    #[arg(long, env = "XIAOYA_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<Secret>,

    /// Account used by the stdio transport when no token is given
    #[arg(long, env = "XIAOYA_ACCOUNT")]
    pub account: Option<String>,

    /// Password for `--account`
    #[arg(long, env = "XIAOYA_PASSWORD", hide_env_values = true)]
    pub password: Option<Secret>,

    /// Platform API base URL
    #[arg(long, env = "XIAOYA_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Platform download API base URL
    #[arg(long, env = "XIAOYA_DOWNLOAD_BASE", default_value = DEFAULT_DOWNLOAD_BASE)]
    pub download_base: String,

    /// Login service base URL
    #[arg(long, env = "XIAOYA_AUTH_BASE", default_value = DEFAULT_AUTH_BASE)]
    pub auth_base: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// A way for MCP clients to reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportKind {
    Stdio,
    Sse,
    StreamableHttp,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Sse => "sse",
            TransportKind::StreamableHttp => "streamable-http",
        }
    }

    pub fn is_network(self) -> bool {
        !matches!(self, TransportKind::Stdio)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TransportKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "sse" => Ok(TransportKind::Sse),
            "streamable-http" => Ok(TransportKind::StreamableHttp),
            other => Err(other.to_string()),
        }
    }
}

/// Split a comma separated transport list into known kinds and rejected names.
///
/// Blank entries are skipped. Rejected names are returned sorted and deduplicated.
pub fn parse_transports(raw: &str) -> (BTreeSet<TransportKind>, Vec<String>) {
    let mut kinds = BTreeSet::new();
    let mut invalid = BTreeSet::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<TransportKind>() {
            Ok(kind) => {
                kinds.insert(kind);
            }
            Err(name) => {
                invalid.insert(name);
            }
        }
    }
    (kinds, invalid.into_iter().collect())
}

/// Normalize a mount path: leading slash, no trailing slash (except for `/`).
pub fn normalize_mount(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }
    let mut mount = format!("/{}", trimmed.trim_start_matches('/'));
    if mount.len() > 1 && mount.ends_with('/') {
        mount.pop();
    }
    mount
}

/// Join a mount prefix and a route suffix.
pub fn join_path(prefix: &str, suffix: &str) -> String {
    let suffix = format!("/{}", suffix.trim_start_matches('/'));
    if prefix.is_empty() || prefix == "/" {
        suffix
    } else {
        format!("{}{}", prefix.trim_end_matches('/'), suffix)
    }
}

/// Base URLs of the platform services
#[derive(Debug, Clone)]
pub struct PlatformUrls {
    pub api: String,
    pub download: String,
    pub auth: String,
}

impl Default for PlatformUrls {
    fn default() -> Self {
        Self {
            api: DEFAULT_API_BASE.to_string(),
            download: DEFAULT_DOWNLOAD_BASE.to_string(),
            auth: DEFAULT_AUTH_BASE.to_string(),
        }
    }
}

/// Credentials for the process-wide stdio session
#[derive(Debug, Clone, Default)]
pub struct StdioCredentials {
    pub token: Option<Secret>,
    pub account: Option<String>,
    pub password: Option<Secret>,
}

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Network transports to serve in addition to stdio
    pub transports: BTreeSet<TransportKind>,
    pub host: String,
    pub port: u16,
    /// Normalized SSE mount path
    pub mount_path: String,
    pub urls: PlatformUrls,
    pub stdio: StdioCredentials,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transports: BTreeSet::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            urls: PlatformUrls::default(),
            stdio: StdioCredentials::default(),
        }
    }
}

impl Settings {
    /// Resolve parsed arguments into settings.
    ///
    /// Unknown transports and unparsable ports are not fatal: they are
    /// reported with a warning and ignored.
    pub fn from_args(args: &Args) -> Self {
        let (kinds, invalid) = parse_transports(&args.transport);
        if !invalid.is_empty() {
            tracing::warn!(ignored = ?invalid, "Ignoring unknown transports");
        }

        let port = match args.port.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PORT,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(port = raw, default = DEFAULT_PORT, "Invalid port, using default");
                DEFAULT_PORT
            }),
        };

        Self {
            transports: kinds.into_iter().filter(|k| k.is_network()).collect(),
            host: args.host.clone(),
            port,
            mount_path: normalize_mount(&args.mount_path),
            urls: PlatformUrls {
                api: args.api_base.trim_end_matches('/').to_string(),
                download: args.download_base.trim_end_matches('/').to_string(),
                auth: args.auth_base.trim_end_matches('/').to_string(),
            },
            stdio: StdioCredentials {
                token: args.auth_token.clone().filter(|t| !t.is_empty()),
                account: args.account.clone().filter(|a| !a.trim().is_empty()),
                password: args.password.clone().filter(|p| !p.is_empty()),
            },
        }
    }

    /// `stdio` followed by the enabled network transports in sorted order
    pub fn enabled_transports(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.transports.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        let mut out = vec![TransportKind::Stdio.as_str()];
        out.extend(names);
        out
    }

    pub fn has_network_transports(&self) -> bool {
        !self.transports.is_empty()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn sse_stream_path(&self) -> String {
        join_path(&self.mount_path, SSE_PATH)
    }

    pub fn sse_message_path(&self) -> String {
        join_path(&self.mount_path, SSE_MESSAGE_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(transport: &str, port: Option<&str>, mount: &str) -> Args {
        Args::parse_from([
            "xiaoya-teacher-mcp",
            "--transport",
            transport,
            "--mount-path",
            mount,
        ])
        .with_port(port)
    }

    impl Args {
        fn with_port(mut self, port: Option<&str>) -> Self {
            self.port = port.map(str::to_string);
            self
        }
    }

    #[test]
    fn test_parse_transports_splits_valid_and_invalid() {
        let (kinds, invalid) = parse_transports(" SSE, streamable-http ,bogus,,stdio,bogus");
        assert!(kinds.contains(&TransportKind::Sse));
        assert!(kinds.contains(&TransportKind::StreamableHttp));
        assert!(kinds.contains(&TransportKind::Stdio));
        assert_eq!(invalid, vec!["bogus".to_string()]);
    }

    #[test]
    fn test_parse_transports_empty() {
        let (kinds, invalid) = parse_transports("");
        assert!(kinds.is_empty());
        assert!(invalid.is_empty());
    }

    #[test]
    fn test_normalize_mount() {
        assert_eq!(normalize_mount(""), "/");
        assert_eq!(normalize_mount("/"), "/");
        assert_eq!(normalize_mount("mcp"), "/mcp");
        assert_eq!(normalize_mount("/mcp/"), "/mcp");
        assert_eq!(normalize_mount("//api/mcp"), "/api/mcp");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "sse"), "/sse");
        assert_eq!(join_path("", "/sse"), "/sse");
        assert_eq!(join_path("/mcp", "/sse"), "/mcp/sse");
        assert_eq!(join_path("/mcp/", "/messages/"), "/mcp/messages/");
    }

    #[test]
    fn test_settings_invalid_port_falls_back() {
        let settings = Settings::from_args(&args("sse", Some("not-a-port"), "/mcp"));
        assert_eq!(settings.port, DEFAULT_PORT);

        let settings = Settings::from_args(&args("sse", Some("9100"), "/mcp"));
        assert_eq!(settings.port, 9100);
    }

    #[test]
    fn test_settings_drops_stdio_from_network_set() {
        let settings = Settings::from_args(&args("stdio,streamable-http,sse", None, "/mcp"));
        assert_eq!(
            settings.enabled_transports(),
            vec!["stdio", "sse", "streamable-http"]
        );
        assert!(settings.has_network_transports());
    }

    #[test]
    fn test_settings_paths() {
        let settings = Settings::from_args(&args("", None, "tools/"));
        assert_eq!(settings.mount_path, "/tools");
        assert_eq!(settings.sse_stream_path(), "/tools/sse");
        assert_eq!(settings.sse_message_path(), "/tools/messages/");
        assert!(!settings.has_network_transports());
        assert_eq!(settings.enabled_transports(), vec!["stdio"]);
    }
}
