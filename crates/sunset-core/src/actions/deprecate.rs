use sunset_registry::RegistryApi;
use tracing::info;

use super::{ActionError, ActionResult};
use crate::versions::VersionRange;

fn parse_range(range: &str) -> Result<VersionRange, ActionError> {
    VersionRange::parse(range)
        .ok_or_else(|| ActionError::rejected(format!("Invalid version range: {range}")))
}

/// Mark every version in `range` deprecated. Fails when nothing matches.
pub async fn deprecate(
    registry: &dyn RegistryApi,
    package: &str,
    range: &str,
    message: &str,
    otp: Option<&str>,
) -> ActionResult {
    let parsed = parse_range(range)?;
    info!(package, range, "deprecating");

    let mut packument = registry.packument(package).await?;
    let mut updated = 0usize;
    for (version, data) in packument.versions.iter_mut() {
        if parsed.matches_str(version) {
            data.deprecated = Some(message.to_string());
            updated += 1;
        }
    }

    if updated == 0 {
        return Err(ActionError::rejected(format!(
            "No versions matched range: {range}"
        )));
    }

    registry.put_packument(&packument, otp).await?;
    info!(package, versions = updated, "deprecated");
    Ok(format!("Deprecated {updated} version(s)"))
}

/// Clear deprecations in `range`. Succeeds without a write when none are set.
pub async fn undeprecate(
    registry: &dyn RegistryApi,
    package: &str,
    range: &str,
    otp: Option<&str>,
) -> ActionResult {
    let parsed = parse_range(range)?;
    info!(package, range, "removing deprecation");

    let mut packument = registry.packument(package).await?;
    let mut updated = 0usize;
    for (version, data) in packument.versions.iter_mut() {
        if parsed.matches_str(version) && data.is_deprecated() {
            // The registry only clears a deprecation on an explicit empty string.
            data.deprecated = Some(String::new());
            updated += 1;
        }
    }

    if updated == 0 {
        return Ok("No deprecated versions in range".to_string());
    }

    registry.put_packument(&packument, otp).await?;
    info!(package, versions = updated, "removed deprecation");
    Ok(format!("Removed deprecation from {updated} version(s)"))
}
