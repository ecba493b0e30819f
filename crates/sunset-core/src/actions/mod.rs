//! Registry and repository operations, one per step type.
//!
//! Actions never retry on their own. An OTP challenge surfaces as
//! [`ActionError::OtpRequired`] so the executor can obtain a code and repeat
//! the step.

pub mod archive_repo;
pub mod deprecate;
pub mod ownership;
pub mod tombstone;
pub mod unpublish;

use sunset_registry::RegistryError;

use crate::repo::RepoError;

/// Why an action did not complete.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The registry asked for a one-time password.
    #[error("OTP required for this operation")]
    OtpRequired,

    #[error(transparent)]
    Registry(RegistryError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    /// The action refused to run against the current package state.
    #[error("{0}")]
    Rejected(String),
}

impl From<RegistryError> for ActionError {
    fn from(err: RegistryError) -> Self {
        if err.is_otp_required() {
            Self::OtpRequired
        } else {
            Self::Registry(err)
        }
    }
}

impl ActionError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Success carries a one-line summary of what changed.
pub type ActionResult = Result<String, ActionError>;

pub use archive_repo::archive_repo;
pub use deprecate::{deprecate, undeprecate};
pub use ownership::{add_owner, remove_owner};
pub use tombstone::{resolve_target_version, tombstone, tombstone_files};
pub use unpublish::unpublish;
