//! Redacted string wrapper for passwords and access tokens.
//!
//! Credentials pass through clap arguments, request headers and the token
//! caches. Wrapping them in [`Secret`] keeps them out of `Debug`/`Display`
//! output, so structured logs and error messages can include the surrounding
//! structs without leaking the value.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// A string whose contents never show up in formatted output.
#[derive(Clone)]
pub struct Secret {
    value: String,
}

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Access the underlying value. Do not log the result.
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// A short, log-safe preview: the first four characters after any
    /// `Bearer ` prefix, followed by an ellipsis.
    pub fn preview(&self) -> String {
        let raw = self.value.strip_prefix("Bearer ").unwrap_or(&self.value);
        let head: String = raw.chars().take(4).collect();
        format!("{}…", head)
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Display for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Secret {}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// Lets clap parse `--password` straight into a Secret.
impl FromStr for Secret {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

// Serializes as the plain value: tool results that report the token
// intentionally expose it to the caller.
impl Serialize for Secret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }

    #[test]
    fn test_blank_is_empty() {
        assert!(Secret::new("   ").is_empty());
        assert!(!Secret::new("x").is_empty());
    }

    #[test]
    fn test_preview_skips_bearer_prefix() {
        let secret = Secret::new("Bearer abcdefgh");
        assert_eq!(secret.preview(), "abcd…");
    }

    #[test]
    fn test_struct_debug_hides_value() {
        #[allow(dead_code)]
        #[derive(Debug)]
        struct Login {
            account: String,
            password: Secret,
        }

        let login = Login {
            account: "teacher01".to_string(),
            password: Secret::new("super-secret"),
        };
        let out = format!("{:?}", login);
        assert!(out.contains("teacher01"));
        assert!(!out.contains("super-secret"));
    }

    #[test]
    fn test_serializes_plain_value() {
        let json = serde_json::to_string(&Secret::new("Bearer t")).unwrap();
        assert_eq!(json, "\"Bearer t\"");
    }
}
