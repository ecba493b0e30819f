//! Plan and result types.
//!
//! A plan is the persisted contract between planning and execution. Once
//! saved it is only changed through the copy-producing functions in
//! [`crate::plan::builder`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only plan format version.
pub const PLAN_VERSION: u32 = 1;

/// Default number of packages processed concurrently.
pub const DEFAULT_CONCURRENCY: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub actor: String,
    #[serde(default)]
    pub options: PlanOptions,
    pub actions: Vec<PackageAction>,
}

impl Plan {
    pub fn action(&self, package: &str) -> Option<&PackageAction> {
        self.actions.iter().find(|a| a.package == package)
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.package.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOptions {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub enable_unpublish: bool,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

fn default_concurrency() -> u32 {
    DEFAULT_CONCURRENCY
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            enable_unpublish: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Ordered steps for one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageAction {
    pub package: String,
    pub steps: Vec<Step>,
}

/// One operation on a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Step {
    Deprecate {
        #[serde(default = "default_range")]
        range: String,
        message: String,
    },
    Undeprecate {
        #[serde(default = "default_range")]
        range: String,
    },
    /// Without a version the whole package is removed, which needs `force`.
    Unpublish {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        #[serde(default)]
        force: bool,
    },
    /// `target_version` may be [`NEXT_MAJOR`].
    Tombstone {
        #[serde(rename = "targetVersion")]
        target_version: String,
        message: String,
    },
    OwnerAdd {
        user: String,
    },
    OwnerRemove {
        user: String,
    },
    ArchiveRepo {
        provider: RepoProvider,
        repo: String,
        #[serde(rename = "addBanner", default = "default_true")]
        add_banner: bool,
    },
}

/// Tombstone target resolved to the major after the latest version.
pub const NEXT_MAJOR: &str = "nextMajor";

/// Every step type, in declaration order.
pub const STEP_TYPES: [&str; 7] = [
    "deprecate",
    "undeprecate",
    "unpublish",
    "tombstone",
    "ownerAdd",
    "ownerRemove",
    "archiveRepo",
];

fn default_range() -> String {
    "*".to_string()
}

fn default_true() -> bool {
    true
}

impl Step {
    /// Wire name of the step type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Deprecate { .. } => "deprecate",
            Self::Undeprecate { .. } => "undeprecate",
            Self::Unpublish { .. } => "unpublish",
            Self::Tombstone { .. } => "tombstone",
            Self::OwnerAdd { .. } => "ownerAdd",
            Self::OwnerRemove { .. } => "ownerRemove",
            Self::ArchiveRepo { .. } => "archiveRepo",
        }
    }

    /// Steps that need the typed confirmation phrase.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Unpublish { .. } | Self::OwnerRemove { .. })
    }

    /// One-line human description.
    pub fn describe(&self) -> String {
        match self {
            Self::Deprecate { range, .. } => format!("deprecate {range}"),
            Self::Undeprecate { range } => format!("undeprecate {range}"),
            Self::Unpublish {
                version: Some(version),
                ..
            } => format!("unpublish {version}"),
            Self::Unpublish { version: None, .. } => "unpublish entire package".to_string(),
            Self::Tombstone { target_version, .. } => format!("tombstone {target_version}"),
            Self::OwnerAdd { user } => format!("add owner {user}"),
            Self::OwnerRemove { user } => format!("remove owner {user}"),
            Self::ArchiveRepo { provider, repo, .. } => format!("archive {provider} repo {repo}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoProvider {
    Github,
    Gitlab,
}

impl RepoProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
        }
    }
}

impl std::fmt::Display for RepoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: Step,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn success(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Success,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn skipped(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(step: Step, error: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Failed,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Success,
    Partial,
    Failed,
}

impl OverallStatus {
    /// Success iff every step succeeded; failed iff none did.
    pub fn from_steps(steps: &[StepResult]) -> Self {
        let succeeded = steps
            .iter()
            .filter(|r| r.status == StepStatus::Success)
            .count();
        if succeeded == steps.len() {
            Self::Success
        } else if succeeded == 0 {
            Self::Failed
        } else {
            Self::Partial
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageResult {
    pub package: String,
    pub steps: Vec<StepResult>,
    pub overall_status: OverallStatus,
}

impl PackageResult {
    pub fn new(package: impl Into<String>, steps: Vec<StepResult>) -> Self {
        Self {
            package: package.into(),
            overall_status: OverallStatus::from_steps(&steps),
            steps,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
}

impl ExecutionSummary {
    pub fn from_results(results: &[PackageResult]) -> Self {
        let count = |status| results.iter().filter(|r| r.overall_status == status).count();
        Self {
            total: results.len(),
            succeeded: count(OverallStatus::Success),
            partial: count(OverallStatus::Partial),
            failed: count(OverallStatus::Failed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanExecutionResult {
    pub plan: Plan,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub results: Vec<PackageResult>,
    pub summary: ExecutionSummary,
}

impl PlanExecutionResult {
    /// True when every package fully succeeded.
    pub fn is_success(&self) -> bool {
        self.summary.succeeded == self.summary.total
    }
}
