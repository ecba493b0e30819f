//! Wire types for the registry protocol and client configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full package document (`GET /<name>`).
///
/// Unknown fields are carried in `extra` so that a fetched document can be
/// edited and written back with `PUT` without dropping data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packument {
    #[serde(rename = "_id", default)]
    pub id: String,

    /// Revision token required for deletes.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,

    #[serde(default)]
    pub versions: BTreeMap<String, PackumentVersion>,

    /// Publish times keyed by version, plus `created` and `modified`.
    #[serde(default)]
    pub time: BTreeMap<String, String>,

    #[serde(default)]
    pub maintainers: Vec<Maintainer>,

    /// Either a `{type, url}` object or a bare string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Packument {
    /// Version the `latest` dist-tag points at.
    pub fn latest_version(&self) -> Option<&str> {
        self.dist_tags.get("latest").map(String::as_str)
    }

    pub fn has_version(&self, version: &str) -> bool {
        self.versions.contains_key(version)
    }

    pub fn maintainer_names(&self) -> Vec<String> {
        self.maintainers.iter().map(|m| m.name.clone()).collect()
    }

    /// Repository URL, whichever shape the document uses.
    pub fn repository_url(&self) -> Option<String> {
        match self.repository.as_ref()? {
            Value::String(url) => Some(url.clone()),
            Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(String::from),
            _ => None,
        }
    }
}

/// One entry of `Packument::versions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackumentVersion {
    pub name: String,
    pub version: String,

    /// Deprecation message; an empty string clears a deprecation on write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,

    #[serde(default)]
    pub dist: Dist,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackumentVersion {
    pub fn is_deprecated(&self) -> bool {
        self.deprecated.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// Distribution info of a published version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dist {
    #[serde(default)]
    pub tarball: String,

    #[serde(default)]
    pub shasum: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

/// Package maintainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Maintainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
        }
    }
}

/// Response from `GET /-/whoami`.
#[derive(Debug, Clone, Deserialize)]
pub struct WhoamiResponse {
    pub username: String,
}

/// Response from the downloads API point endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsResponse {
    pub downloads: u64,

    #[serde(default)]
    pub package: Option<String>,
}

/// Response from `GET /-/v1/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub objects: Vec<SearchObject>,

    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchObject {
    pub package: SearchPackage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPackage {
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL for the registry.
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// Base URL for the downloads API.
    #[serde(default = "default_downloads_url")]
    pub downloads_url: String,

    /// Explicit authentication token (skips env and `.npmrc` lookup).
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff base; attempt `n` waits `base * n`.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_downloads_url() -> String {
    "https://api.npmjs.org".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    1000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            downloads_url: default_downloads_url(),
            token: None,
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

impl RegistryConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SUNSET_REGISTRY_URL` | Registry base URL |
    /// | `SUNSET_DOWNLOADS_URL` | Downloads API base URL |
    /// | `SUNSET_REGISTRY_TIMEOUT` | Request timeout in seconds |
    /// | `SUNSET_REGISTRY_MAX_ATTEMPTS` | Attempt budget per request |
    /// | `SUNSET_REGISTRY_RETRY_BASE_MS` | Linear backoff base |
    ///
    /// Tokens are resolved separately by [`crate::TokenProvider::resolve`].
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("SUNSET_REGISTRY_URL").unwrap_or_else(|_| default_registry_url()),
            downloads_url: std::env::var("SUNSET_DOWNLOADS_URL")
                .unwrap_or_else(|_| default_downloads_url()),
            token: None,
            timeout_secs: std::env::var("SUNSET_REGISTRY_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_attempts: std::env::var("SUNSET_REGISTRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &u32| *n >= 1)
                .unwrap_or_else(default_max_attempts),
            retry_base_ms: std::env::var("SUNSET_REGISTRY_RETRY_BASE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_retry_base_ms),
        }
    }

    /// Set the token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the downloads API base URL.
    pub fn with_downloads_url(mut self, url: impl Into<String>) -> Self {
        self.downloads_url = url.into();
        self
    }

    /// Set the backoff base in milliseconds.
    pub fn with_retry_base_ms(mut self, ms: u64) -> Self {
        self.retry_base_ms = ms;
        self
    }

    /// Set the attempt budget (clamped to at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}
