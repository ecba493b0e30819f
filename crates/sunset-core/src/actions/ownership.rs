use sunset_registry::{Maintainer, RegistryApi};
use tracing::info;

use super::{ActionError, ActionResult};

pub async fn add_owner(
    registry: &dyn RegistryApi,
    package: &str,
    user: &str,
    otp: Option<&str>,
) -> ActionResult {
    let mut packument = registry.packument(package).await?;
    if packument
        .maintainers
        .iter()
        .any(|m| m.name.eq_ignore_ascii_case(user))
    {
        return Ok(format!("{user} is already an owner"));
    }

    packument.maintainers.push(Maintainer::new(user));
    registry.put_packument(&packument, otp).await?;
    info!(package, user, "added owner");
    Ok(format!("Added {user} as owner"))
}

/// Remove `user` from the maintainers. Never leaves a package without owners.
pub async fn remove_owner(
    registry: &dyn RegistryApi,
    package: &str,
    user: &str,
    otp: Option<&str>,
) -> ActionResult {
    let mut packument = registry.packument(package).await?;
    let Some(index) = packument
        .maintainers
        .iter()
        .position(|m| m.name.eq_ignore_ascii_case(user))
    else {
        return Ok(format!("{user} is not an owner"));
    };

    if packument.maintainers.len() == 1 {
        return Err(ActionError::rejected(
            "Cannot remove the last owner of a package",
        ));
    }

    packument.maintainers.remove(index);
    registry.put_packument(&packument, otp).await?;
    info!(package, user, "removed owner");
    Ok(format!("Removed {user} from owners"))
}
