//! Registry client for reading and editing packages.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::RegistryApi;
use crate::auth::TokenProvider;
use crate::error::{RegistryError, RegistryResult};
use crate::tarball::{tarball_file_name, PublishPayload};
use crate::types::{Packument, RegistryConfig, SearchResponse, WhoamiResponse};

mod helpers;
mod http;

pub use helpers::encode_package_name;
use http::{HttpBackend, RequestOptions};

const USER_AGENT_VALUE: &str = concat!("sunset-registry/", env!("CARGO_PKG_VERSION"));

/// Page size for maintainer searches.
pub const SEARCH_PAGE_SIZE: usize = 250;

/// Registry client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: HttpBackend,
}

impl RegistryClient {
    /// Create a client, resolving the token from config, env or `.npmrc`.
    pub fn new(config: RegistryConfig) -> RegistryResult<Self> {
        let token_provider = TokenProvider::resolve(config.token.as_deref());
        Self::with_token_provider(config, token_provider)
    }

    pub fn with_token_provider(
        config: RegistryConfig,
        token_provider: TokenProvider,
    ) -> RegistryResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| RegistryError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let base_url = config.url.trim_end_matches('/').to_string();

        Ok(Self {
            http: HttpBackend {
                client,
                base_url,
                token_provider,
                config,
            },
        })
    }

    pub fn from_env() -> RegistryResult<Self> {
        Self::new(RegistryConfig::from_env())
    }

    pub async fn whoami(&self) -> RegistryResult<String> {
        let value = self.get("/-/whoami").await?;
        let response: WhoamiResponse = decode(value, "whoami response")?;
        Ok(response.username)
    }

    /// Username if the token is valid, `None` when unauthenticated or rejected.
    pub async fn verify_auth(&self) -> Option<String> {
        if !self.is_authenticated() {
            return None;
        }

        match self.whoami().await {
            Ok(username) => Some(username),
            Err(e) => {
                debug!(error = %e, "token verification failed");
                None
            }
        }
    }

    pub async fn packument(&self, name: &str) -> RegistryResult<Packument> {
        debug!(package = %name, "fetching packument");
        let value = self.get(&package_path(name)).await?;
        decode(value, "packument")
    }

    pub async fn put_packument(
        &self,
        packument: &Packument,
        otp: Option<&str>,
    ) -> RegistryResult<()> {
        debug!(package = %packument.name, "writing packument");
        let body = encode(packument)?;
        self.http
            .request(
                Method::PUT,
                &package_path(&packument.name),
                &RequestOptions::json(body).with_otp(otp),
            )
            .await?;
        Ok(())
    }

    pub async fn publish(&self, payload: &PublishPayload, otp: Option<&str>) -> RegistryResult<()> {
        debug!(package = %payload.name, tags = ?payload.dist_tags, "publishing");
        let body = encode(payload)?;
        self.http
            .request(
                Method::PUT,
                &payload.path(),
                &RequestOptions::json(body).with_otp(otp),
            )
            .await?;
        Ok(())
    }

    pub async fn unpublish_version(
        &self,
        name: &str,
        version: &str,
        otp: Option<&str>,
    ) -> RegistryResult<()> {
        let rev = self.current_revision(name).await?;
        let path = format!(
            "{}/-/{}/-rev/{}",
            package_path(name),
            tarball_file_name(name, version),
            rev
        );

        debug!(package = %name, version = %version, "unpublishing version");
        self.http
            .request(Method::DELETE, &path, &RequestOptions::default().with_otp(otp))
            .await?;
        Ok(())
    }

    pub async fn unpublish_package(&self, name: &str, otp: Option<&str>) -> RegistryResult<()> {
        let rev = self.current_revision(name).await?;
        let path = format!("{}/-rev/{}", package_path(name), rev);

        debug!(package = %name, "unpublishing package");
        self.http
            .request(Method::DELETE, &path, &RequestOptions::default().with_otp(otp))
            .await?;
        Ok(())
    }

    /// Last-week downloads from the downloads API.
    pub async fn weekly_downloads(&self, name: &str) -> Option<u64> {
        let url = format!(
            "{}/downloads/point/last-week/{}",
            self.http.config.downloads_url.trim_end_matches('/'),
            encode_package_name(name)
        );
        self.http.fetch_downloads(&url).await
    }

    /// One page of `/-/v1/search`.
    pub async fn search(&self, text: &str, size: usize, from: usize) -> RegistryResult<SearchResponse> {
        let options = RequestOptions::query(vec![
            ("text", text.to_string()),
            ("size", size.to_string()),
            ("from", from.to_string()),
        ]);
        let value = self
            .http
            .request(Method::GET, "/-/v1/search", &options)
            .await?;
        decode(value, "search response")
    }

    /// Names of every package maintained by `username`, following pagination.
    pub async fn find_packages_by_maintainer(&self, username: &str) -> RegistryResult<Vec<String>> {
        let text = format!("maintainer:{username}");
        let mut names = Vec::new();
        let mut from = 0;

        loop {
            debug!(maintainer = %username, from, "searching packages");
            let page = self.search(&text, SEARCH_PAGE_SIZE, from).await?;
            let count = page.objects.len();

            names.extend(page.objects.into_iter().map(|o| o.package.name));
            from += count;

            if count < SEARCH_PAGE_SIZE || from as u64 >= page.total {
                break;
            }
        }

        Ok(names)
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.http.token_provider.is_authenticated()
    }

    async fn get(&self, path: &str) -> RegistryResult<Value> {
        self.http
            .request(Method::GET, path, &RequestOptions::default())
            .await
    }

    async fn current_revision(&self, name: &str) -> RegistryResult<String> {
        self.packument(name)
            .await?
            .rev
            .filter(|rev| !rev.is_empty())
            .ok_or_else(|| RegistryError::MissingRevision {
                name: name.to_string(),
            })
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn whoami(&self) -> RegistryResult<String> {
        RegistryClient::whoami(self).await
    }

    async fn packument(&self, name: &str) -> RegistryResult<Packument> {
        RegistryClient::packument(self, name).await
    }

    async fn put_packument(&self, packument: &Packument, otp: Option<&str>) -> RegistryResult<()> {
        RegistryClient::put_packument(self, packument, otp).await
    }

    async fn publish(&self, payload: &PublishPayload, otp: Option<&str>) -> RegistryResult<()> {
        RegistryClient::publish(self, payload, otp).await
    }

    async fn unpublish_version(
        &self,
        name: &str,
        version: &str,
        otp: Option<&str>,
    ) -> RegistryResult<()> {
        RegistryClient::unpublish_version(self, name, version, otp).await
    }

    async fn unpublish_package(&self, name: &str, otp: Option<&str>) -> RegistryResult<()> {
        RegistryClient::unpublish_package(self, name, otp).await
    }

    async fn weekly_downloads(&self, name: &str) -> Option<u64> {
        RegistryClient::weekly_downloads(self, name).await
    }

    fn registry_url(&self) -> &str {
        self.base_url()
    }
}

fn package_path(name: &str) -> String {
    format!("/{}", encode_package_name(name))
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> RegistryResult<T> {
    serde_json::from_value(value).map_err(|e| RegistryError::InvalidResponse {
        message: format!("failed to parse {}: {}", what, e),
    })
}

fn encode<T: serde::Serialize>(value: &T) -> RegistryResult<Value> {
    serde_json::to_value(value).map_err(|e| RegistryError::InvalidResponse {
        message: format!("failed to encode request body: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_path_encodes_scope() {
        assert_eq!(package_path("@acme/widget"), "/@acme%2Fwidget");
    }

    #[test]
    fn test_new_with_explicit_token() {
        let client = RegistryClient::new(RegistryConfig::default().with_token("t")).unwrap();
        assert!(client.is_authenticated());
        assert_eq!(client.base_url(), "https://registry.npmjs.org");
    }
}
