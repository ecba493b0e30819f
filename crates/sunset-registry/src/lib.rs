//! Registry client for package end-of-life operations.
//!
//! This crate provides:
//!
//! - HTTP client for the npm-style registry API with bearer-token auth
//! - Retry with linear backoff, rate-limit handling and OTP challenge detection
//! - Packument, search and downloads wire types
//! - Publish payload construction (integrity, shasum, base64 attachment)
//!
//! # Quick Start
//!
//! ```no_run
//! use sunset_registry::{RegistryClient, RegistryConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = RegistryClient::new(RegistryConfig::from_env())?;
//!
//! let user = client.whoami().await?;
//! let packument = client.packument("left-pad").await?;
//! println!("{} owns {:?}: {}", user, packument.latest_version(), packument.name);
//! # Ok(())
//! # }
//! ```
//!
//! # Authentication
//!
//! Tokens are resolved from an explicit value, `NPM_TOKEN`, `NODE_AUTH_TOKEN`,
//! `./.npmrc`, then `~/.npmrc`. See [`auth`].
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SUNSET_REGISTRY_URL` | Registry base URL (default: `https://registry.npmjs.org`) |
//! | `SUNSET_DOWNLOADS_URL` | Downloads API base URL (default: `https://api.npmjs.org`) |
//! | `SUNSET_REGISTRY_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `SUNSET_REGISTRY_MAX_ATTEMPTS` | Attempts per request, including the first (default: 3) |
//! | `SUNSET_REGISTRY_RETRY_BASE_MS` | Linear backoff base in milliseconds (default: 1000) |

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod tarball;
pub mod types;

// Re-export main types
pub use api::RegistryApi;
pub use auth::TokenProvider;
pub use client::{encode_package_name, RegistryClient, SEARCH_PAGE_SIZE};
pub use error::{RegistryError, RegistryResult};
pub use tarball::{
    calculate_integrity, calculate_shasum, tarball_file_name, PublishManifest, PublishPayload,
};
pub use types::{
    Dist, DownloadsResponse, Maintainer, Packument, PackumentVersion, RegistryConfig,
    SearchResponse, WhoamiResponse,
};
