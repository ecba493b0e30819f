//! Unpublish eligibility.
//!
//! A package published within the last 72 hours only needs to pass the
//! dependents check. Older packages must pass all four checks:
//!
//! | Check | Passes when |
//! |-------|-------------|
//! | `publishAge` | always (informational) |
//! | `weeklyDownloads` | under 300, or recent; unknown counts pass only when recent |
//! | `ownerCount` | single owner, or recent |
//! | `hasDependents` | no positive signal of dependents |

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sunset_registry::RegistryApi;
use tracing::debug;

use crate::discovery::DiscoveredPackage;

/// Weekly downloads at or above this block unpublishing an older package.
pub const DOWNLOAD_THRESHOLD: u64 = 300;

/// Publishes at most this old count as recent.
pub const RECENT_WINDOW_HOURS: f64 = 72.0;

/// A value that may not be known. Serializes as the value or `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal<T> {
    Known(T),
    Unknown,
}

impl<T> From<Option<T>> for Signal<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unknown, Self::Known)
    }
}

impl<T: Serialize> Serialize for Signal<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => value.serialize(serializer),
            Self::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityCheck<T> {
    pub passed: bool,
    pub value: T,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityChecks {
    pub publish_age: EligibilityCheck<String>,
    pub weekly_downloads: EligibilityCheck<Signal<u64>>,
    pub owner_count: EligibilityCheck<usize>,
    pub has_dependents: EligibilityCheck<Signal<bool>>,
}

impl EligibilityChecks {
    /// Check names with their outcome, in report order.
    pub fn summary(&self) -> [(&'static str, bool, &str); 4] {
        [
            ("publishAge", self.publish_age.passed, &self.publish_age.description),
            (
                "weeklyDownloads",
                self.weekly_downloads.passed,
                &self.weekly_downloads.description,
            ),
            ("ownerCount", self.owner_count.passed, &self.owner_count.description),
            (
                "hasDependents",
                self.has_dependents.passed,
                &self.has_dependents.description,
            ),
        ]
    }

    fn failed_names(&self) -> Vec<&'static str> {
        self.summary()
            .iter()
            .filter(|(_, passed, _)| !passed)
            .map(|(name, _, _)| *name)
            .collect()
    }
}

/// Outcome of an eligibility evaluation. Ineligible results always carry a reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub checks: EligibilityChecks,
}

/// Evaluate eligibility from known facts. Pure.
pub fn evaluate(
    package: &DiscoveredPackage,
    now: DateTime<Utc>,
    weekly_downloads: Signal<u64>,
    has_dependents: Signal<bool>,
) -> Eligibility {
    let hours = package.hours_since_publish(now);
    let recent = hours <= RECENT_WINDOW_HOURS;

    let publish_age = EligibilityCheck {
        passed: true,
        value: if recent {
            format!("{}h ago (within 72h window)", hours.max(0.0).round())
        } else {
            format!("{} days ago", (hours / 24.0).round())
        },
        description: if recent {
            "Published within 72h, relaxed unpublish rules apply".to_string()
        } else {
            "Published more than 72h ago, strict unpublish rules apply".to_string()
        },
    };

    let weekly_downloads = match weekly_downloads {
        Signal::Known(count) => {
            let under = count < DOWNLOAD_THRESHOLD;
            EligibilityCheck {
                passed: recent || under,
                value: Signal::Known(count),
                description: if under {
                    format!("{count} downloads/week (under {DOWNLOAD_THRESHOLD} threshold)")
                } else {
                    format!("{count} downloads/week (exceeds {DOWNLOAD_THRESHOLD} threshold)")
                },
            }
        }
        Signal::Unknown => EligibilityCheck {
            passed: recent,
            value: Signal::Unknown,
            description: if recent {
                "Download count unknown; allowed within the 72h window".to_string()
            } else {
                "Download count unknown; cannot confirm it is under the threshold".to_string()
            },
        },
    };

    let owners = package.owners.len();
    let owner_count = EligibilityCheck {
        passed: recent || owners == 1,
        value: owners,
        description: if owners == 1 {
            "Single owner".to_string()
        } else {
            format!("{owners} owners, may need coordination")
        },
    };

    let has_dependents = EligibilityCheck {
        passed: has_dependents != Signal::Known(true),
        value: has_dependents,
        description: match has_dependents {
            Signal::Unknown => "Cannot check dependents (registry verifies at unpublish time)",
            Signal::Known(true) => "Package has dependents that would break",
            Signal::Known(false) => "No known dependents",
        }
        .to_string(),
    };

    let checks = EligibilityChecks {
        publish_age,
        weekly_downloads,
        owner_count,
        has_dependents,
    };

    let eligible = if recent {
        checks.has_dependents.passed
    } else {
        checks.failed_names().is_empty()
    };

    let reason = (!eligible).then(|| {
        let mut failed = checks.failed_names();
        // The recent fast path can only fail on dependents.
        if recent {
            failed.retain(|name| *name == "hasDependents");
        }
        format!("Failed checks: {}", failed.join(", "))
    });

    Eligibility {
        eligible,
        reason,
        checks,
    }
}

/// Evaluate eligibility, fetching weekly downloads when the snapshot lacks them.
pub async fn check_unpublish_eligibility(
    registry: &dyn RegistryApi,
    package: &DiscoveredPackage,
    now: DateTime<Utc>,
) -> Eligibility {
    let downloads = match package.weekly_downloads {
        Some(count) => Some(count),
        None => registry.weekly_downloads(&package.name).await,
    };
    let dependents = package.dependents_count.map(|count| count > 0);

    let eligibility = evaluate(package, now, downloads.into(), dependents.into());
    debug!(
        package = %package.name,
        eligible = eligibility.eligible,
        reason = ?eligibility.reason,
        "unpublish eligibility"
    );
    eligibility
}
