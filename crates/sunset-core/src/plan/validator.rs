//! Runtime validation of a plan against live registry state.
//!
//! Runs before any mutating call. Problems with one package never stop the
//! others from being checked; only a failed `whoami` is fatal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sunset_registry::RegistryApi;
use tracing::{debug, info};

use crate::actions::resolve_target_version;
use crate::discovery::DiscoveredPackage;
use crate::error::{PlanError, PlanResult};
use crate::plan::model::{Plan, RepoProvider, Step};
use crate::policy::{check_unpublish_eligibility, Eligibility};
use crate::repo::RepoRef;
use crate::versions::VersionRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    NotOwner,
    UnpublishDisabled,
    ForceRequired,
    UnpublishIneligible,
    VersionExists,
    LastOwner,
    InvalidRange,
    UnsupportedProvider,
    InvalidRepo,
    ValidationError,
    RemovingSelf,
    AlreadyOwner,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotOwner => "NOT_OWNER",
            Self::UnpublishDisabled => "UNPUBLISH_DISABLED",
            Self::ForceRequired => "FORCE_REQUIRED",
            Self::UnpublishIneligible => "UNPUBLISH_INELIGIBLE",
            Self::VersionExists => "VERSION_EXISTS",
            Self::LastOwner => "LAST_OWNER",
            Self::InvalidRange => "INVALID_RANGE",
            Self::UnsupportedProvider => "UNSUPPORTED_PROVIDER",
            Self::InvalidRepo => "INVALID_REPO",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::RemovingSelf => "REMOVING_SELF",
            Self::AlreadyOwner => "ALREADY_OWNER",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Zero-based index into the package's steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    pub message: String,
    pub code: IssueCode,
}

impl ValidationIssue {
    fn package(package: &str, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            package: Some(package.to_string()),
            step: None,
            message: message.into(),
            code,
        }
    }

    fn step(package: &str, step: usize, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            step: Some(step),
            ..Self::package(package, code, message)
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.package, self.step) {
            (Some(package), Some(step)) => write!(f, "[{package} step {step}] {}", self.message),
            (Some(package), None) => write!(f, "[{package}] {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn new(errors: Vec<ValidationIssue>, warnings: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|issue| issue.code == code)
    }
}

/// Check `plan` against the registry as the authenticated user.
///
/// Only reads from the registry.
pub async fn validate_plan_runtime(
    registry: &dyn RegistryApi,
    plan: &Plan,
    now: DateTime<Utc>,
) -> PlanResult<ValidationResult> {
    let user = registry
        .whoami()
        .await
        .map_err(|source| PlanError::Authentication { source })?;
    info!(user = %user, packages = plan.actions.len(), "validating plan");

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for action in &plan.actions {
        let name = action.package.as_str();
        let packument = match registry.packument(name).await {
            Ok(packument) => packument,
            Err(e) => {
                debug!(package = name, error = %e, "validation fetch failed");
                errors.push(ValidationIssue::package(
                    name,
                    IssueCode::ValidationError,
                    format!("Could not validate: {e}"),
                ));
                continue;
            }
        };
        let package = DiscoveredPackage::from_packument(&packument, now);

        if !package.is_owner(&user) {
            errors.push(ValidationIssue::package(
                name,
                IssueCode::NotOwner,
                format!("You are not an owner of {name}"),
            ));
            continue;
        }

        // Fetched at most once per package, and only when an unpublish needs it.
        let mut eligibility: Option<Eligibility> = None;

        for (i, step) in action.steps.iter().enumerate() {
            match step {
                Step::Deprecate { range, .. } | Step::Undeprecate { range } => {
                    if VersionRange::parse(range).is_none() {
                        errors.push(ValidationIssue::step(
                            name,
                            i,
                            IssueCode::InvalidRange,
                            format!("Invalid version range: {range}"),
                        ));
                    }
                }
                Step::Unpublish { version, force } => {
                    if !plan.options.enable_unpublish {
                        errors.push(ValidationIssue::step(
                            name,
                            i,
                            IssueCode::UnpublishDisabled,
                            "Unpublish requires --enable-unpublish flag",
                        ));
                        continue;
                    }
                    if version.is_none() && !force {
                        errors.push(ValidationIssue::step(
                            name,
                            i,
                            IssueCode::ForceRequired,
                            "Unpublishing the entire package requires force",
                        ));
                    }
                    if eligibility.is_none() {
                        eligibility =
                            Some(check_unpublish_eligibility(registry, &package, now).await);
                    }
                    if let Some(result) = eligibility.as_ref().filter(|e| !e.eligible) {
                        errors.push(ValidationIssue::step(
                            name,
                            i,
                            IssueCode::UnpublishIneligible,
                            format!(
                                "Unpublish not eligible: {}",
                                result.reason.as_deref().unwrap_or("unknown")
                            ),
                        ));
                    }
                }
                Step::Tombstone { target_version, .. } => {
                    let version = resolve_target_version(target_version, &package.latest_version);
                    if packument.has_version(&version) {
                        errors.push(ValidationIssue::step(
                            name,
                            i,
                            IssueCode::VersionExists,
                            format!("Version {version} already exists"),
                        ));
                    }
                }
                Step::OwnerAdd { user: added } => {
                    if package.is_owner(added) {
                        warnings.push(ValidationIssue::step(
                            name,
                            i,
                            IssueCode::AlreadyOwner,
                            format!("{added} is already an owner"),
                        ));
                    }
                }
                Step::OwnerRemove { user: removed } => {
                    if removed.eq_ignore_ascii_case(&user) {
                        if package.owners.len() == 1 {
                            errors.push(ValidationIssue::step(
                                name,
                                i,
                                IssueCode::LastOwner,
                                "Cannot remove yourself as the only owner",
                            ));
                        } else {
                            warnings.push(ValidationIssue::step(
                                name,
                                i,
                                IssueCode::RemovingSelf,
                                "You are removing yourself - you will lose access",
                            ));
                        }
                    }
                }
                Step::ArchiveRepo { provider, repo, .. } => {
                    if *provider != RepoProvider::Github {
                        errors.push(ValidationIssue::step(
                            name,
                            i,
                            IssueCode::UnsupportedProvider,
                            format!("Provider \"{provider}\" is not yet supported"),
                        ));
                    } else if RepoRef::parse(repo).is_none() {
                        errors.push(ValidationIssue::step(
                            name,
                            i,
                            IssueCode::InvalidRepo,
                            format!("Invalid repository format: {repo}"),
                        ));
                    }
                }
            }
        }
    }

    let result = ValidationResult::new(errors, warnings);
    info!(
        valid = result.valid,
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "plan validation finished"
    );
    Ok(result)
}
