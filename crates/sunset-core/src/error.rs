//! Error types for plan loading and validation.

use std::fmt;
use std::path::PathBuf;

use sunset_registry::RegistryError;

/// One structural problem in a plan document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted field path, e.g. `actions.0.steps.1.type`. Empty for the document root.
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Plan errors. All of them are fatal before execution starts.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The document does not match the plan schema. Lists every violation.
    #[error("invalid plan: {}", join_violations(.violations))]
    Schema { violations: Vec<SchemaViolation> },

    /// The document is not JSON at all.
    #[error("invalid plan JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to {action} plan file {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `whoami` failed during runtime validation.
    #[error("could not authenticate with registry: {source}")]
    Authentication {
        #[source]
        source: RegistryError,
    },
}

/// Result type for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;
