//! Ownership checks for transfer and self-removal.

use serde::Serialize;

use crate::discovery::DiscoveredPackage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipValidation {
    pub can_transfer: bool,
    pub can_remove_self: bool,
    pub is_only_owner: bool,
    pub owners: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn validate_ownership(package: &DiscoveredPackage, current_user: &str) -> OwnershipValidation {
    let is_owner = package.is_owner(current_user);
    let is_only_owner = is_owner && package.owners.len() == 1;

    let mut warnings = Vec::new();
    if !is_owner {
        warnings.push("You are not an owner of this package".to_string());
    }
    if is_only_owner {
        warnings.push("You are the only owner - removing yourself will orphan the package".to_string());
    }

    OwnershipValidation {
        can_transfer: is_owner,
        can_remove_self: is_owner && !is_only_owner,
        is_only_owner,
        owners: package.owners.clone(),
        warnings,
    }
}
