//! Registry operations consumed by the plan engine.

use async_trait::async_trait;

use crate::error::RegistryResult;
use crate::tarball::PublishPayload;
use crate::types::Packument;

/// The registry surface used by validation and execution.
///
/// [`crate::RegistryClient`] is the production implementation. Writes take
/// an optional one-time password, sent as the `npm-otp` header.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Username the current token belongs to.
    async fn whoami(&self) -> RegistryResult<String>;

    async fn packument(&self, name: &str) -> RegistryResult<Packument>;

    /// Write back a full package document.
    async fn put_packument(&self, packument: &Packument, otp: Option<&str>) -> RegistryResult<()>;

    async fn publish(&self, payload: &PublishPayload, otp: Option<&str>) -> RegistryResult<()>;

    /// Delete one version. The revision token is fetched right before the delete.
    async fn unpublish_version(
        &self,
        name: &str,
        version: &str,
        otp: Option<&str>,
    ) -> RegistryResult<()>;

    /// Delete the whole package. The revision token is fetched right before the delete.
    async fn unpublish_package(&self, name: &str, otp: Option<&str>) -> RegistryResult<()>;

    /// Last-week download count; `None` when unknown.
    async fn weekly_downloads(&self, name: &str) -> Option<u64>;

    fn registry_url(&self) -> &str;
}
