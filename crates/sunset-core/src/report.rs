//! Plain-text renderings of validation, execution and policy results.

use std::fmt::Write as _;

use crate::discovery::DiscoveredPackage;
use crate::plan::model::{OverallStatus, PlanExecutionResult, StepStatus};
use crate::plan::validator::ValidationResult;
use crate::policy::{Eligibility, OwnershipValidation};

#[must_use]
pub fn format_progress_line(event: &crate::plan::ProgressEvent) -> String {
    format!("[{}/{}] {}", event.done, event.total, event.package)
}

#[must_use]
pub fn format_validation(result: &ValidationResult) -> String {
    let mut out = String::new();
    if result.valid {
        out.push_str("Plan is valid\n");
    } else {
        let _ = writeln!(out, "Plan has {} error(s):", result.errors.len());
        for issue in &result.errors {
            let _ = writeln!(out, "  x {} ({})", issue, issue.code);
        }
    }
    if !result.warnings.is_empty() {
        let _ = writeln!(out, "{} warning(s):", result.warnings.len());
        for issue in &result.warnings {
            let _ = writeln!(out, "  ! {} ({})", issue, issue.code);
        }
    }
    out
}

#[must_use]
pub fn format_execution(result: &PlanExecutionResult) -> String {
    let mut out = String::new();
    for package in &result.results {
        let marker = match package.overall_status {
            OverallStatus::Success => "ok",
            OverallStatus::Partial => "partial",
            OverallStatus::Failed => "FAILED",
        };
        let _ = writeln!(out, "{} [{}]", package.package, marker);
        for step in &package.steps {
            let status = match step.status {
                StepStatus::Success => "done",
                StepStatus::Skipped => "skip",
                StepStatus::Failed => "fail",
            };
            let detail = step
                .error
                .as_deref()
                .or(step.message.as_deref())
                .unwrap_or_default();
            let _ = writeln!(out, "  {status:<4} {}: {detail}", step.step.describe());
        }
    }

    let duration = result.completed_at - result.started_at;
    let summary = &result.summary;
    let _ = writeln!(
        out,
        "\n{} package(s): {} succeeded, {} partial, {} failed ({:.1}s)",
        summary.total,
        summary.succeeded,
        summary.partial,
        summary.failed,
        duration.num_milliseconds() as f64 / 1000.0
    );
    out
}

#[must_use]
pub fn format_eligibility(package: &DiscoveredPackage, eligibility: &Eligibility) -> String {
    let mut out = String::new();
    let verdict = if eligibility.eligible {
        "eligible for unpublish"
    } else {
        "NOT eligible for unpublish"
    };
    let _ = writeln!(out, "{}@{}: {verdict}", package.name, package.latest_version);
    for (name, passed, description) in eligibility.checks.summary() {
        let mark = if passed { "+" } else { "x" };
        let _ = writeln!(out, "  {mark} {name}: {description}");
    }
    if let Some(reason) = &eligibility.reason {
        let _ = writeln!(out, "  {reason}");
    }
    out
}

#[must_use]
pub fn format_ownership(package: &str, validation: &OwnershipValidation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{package} owners: {}", validation.owners.join(", "));
    for warning in &validation.warnings {
        let _ = writeln!(out, "  ! {warning}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::validator::{IssueCode, ValidationIssue};

    #[test]
    fn test_format_validation_lists_codes() {
        let result = ValidationResult {
            valid: false,
            errors: vec![ValidationIssue {
                package: Some("left-pad".into()),
                step: Some(0),
                message: "Cannot remove yourself as the only owner".into(),
                code: IssueCode::LastOwner,
            }],
            warnings: Vec::new(),
        };
        let text = format_validation(&result);
        assert!(text.starts_with("Plan has 1 error(s):"));
        assert!(text.contains(
            "[left-pad step 0] Cannot remove yourself as the only owner (LAST_OWNER)"
        ));
    }
}
