//! Safety policies for destructive actions.

pub mod ownership;
pub mod unpublish;

pub use ownership::{validate_ownership, OwnershipValidation};
pub use unpublish::{
    check_unpublish_eligibility, evaluate, Eligibility, EligibilityCheck, EligibilityChecks,
    Signal, DOWNLOAD_THRESHOLD, RECENT_WINDOW_HOURS,
};
