use chrono::Utc;
use sunset_registry::RegistryApi;
use tracing::info;

use super::{ActionError, ActionResult};
use crate::discovery::DiscoveredPackage;
use crate::policy::check_unpublish_eligibility;

/// Delete one version, or with `force` and no version the whole package.
///
/// Eligibility is checked again against fresh registry state.
pub async fn unpublish(
    registry: &dyn RegistryApi,
    package: &str,
    version: Option<&str>,
    force: bool,
    otp: Option<&str>,
) -> ActionResult {
    if version.is_none() && !force {
        return Err(ActionError::rejected(
            "Full package unpublish requires force=true",
        ));
    }

    let now = Utc::now();
    let packument = registry.packument(package).await?;
    let snapshot = DiscoveredPackage::from_packument(&packument, now);
    let eligibility = check_unpublish_eligibility(registry, &snapshot, now).await;
    if !eligibility.eligible {
        return Err(ActionError::rejected(format!(
            "Not eligible for unpublish: {}",
            eligibility.reason.unwrap_or_default()
        )));
    }

    match version {
        Some(version) => {
            info!(package, version, "unpublishing version");
            registry.unpublish_version(package, version, otp).await?;
            Ok(format!("Unpublished version {version}"))
        }
        None => {
            info!(package, "unpublishing entire package");
            registry.unpublish_package(package, otp).await?;
            Ok("Unpublished entire package".to_string())
        }
    }
}
