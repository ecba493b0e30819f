//! Structural validation of plan documents.
//!
//! Documents are checked against the embedded `plan_v1` JSON Schema and every
//! violation is collected, so a broken plan file is fixed in one pass.
//! Unknown keys are ignored.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::OnceLock;

use jsonschema::error::ValidationErrorKind;
use jsonschema::Draft;
use serde_json::Value;

use crate::error::{PlanError, PlanResult, SchemaViolation};
use crate::plan::model::Plan;

const PLAN_V1_SCHEMA_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/plan_v1.schema.json"
));

static VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn compiled_validator() -> Result<&'static jsonschema::Validator, &'static str> {
    VALIDATOR
        .get_or_init(|| {
            let schema: Value = serde_json::from_str(PLAN_V1_SCHEMA_JSON)
                .map_err(|e| format!("failed to parse embedded plan_v1 schema: {e}"))?;

            jsonschema::options()
                .with_draft(Draft::Draft202012)
                .should_validate_formats(true)
                .build(&schema)
                .map_err(|e| format!("failed to compile plan_v1 schema: {e}"))
        })
        .as_ref()
        .map_err(String::as_str)
}

/// Check a plan document and build the [`Plan`]. Fails with every violation.
pub fn parse_plan(document: Value) -> PlanResult<Plan> {
    let violations = validate_document(&document);
    if !violations.is_empty() {
        return Err(PlanError::Schema { violations });
    }

    serde_json::from_value(document).map_err(|e| PlanError::Schema {
        violations: vec![SchemaViolation::new("", e.to_string())],
    })
}

/// All schema violations in `document`, ordered by path; empty when it is a
/// valid plan.
pub fn validate_document(document: &Value) -> Vec<SchemaViolation> {
    let validator = match compiled_validator() {
        Ok(validator) => validator,
        Err(message) => return vec![SchemaViolation::new("", message)],
    };

    let mut violations: Vec<SchemaViolation> = validator
        .iter_errors(document)
        .map(|error| {
            let path = pointer_to_path(error.instance_path().as_str());
            match error.kind() {
                ValidationErrorKind::Required { property } => match property.as_str() {
                    Some(name) => SchemaViolation::new(join(&path, name), "required"),
                    None => SchemaViolation::new(path, error.to_string()),
                },
                _ => SchemaViolation::new(path, error.to_string()),
            }
        })
        .collect();

    violations.extend(duplicate_packages(document));
    violations.sort_by(|a, b| compare_paths(&a.path, &b.path));
    violations.dedup();
    violations
}

/// Package names must be unique; JSON Schema cannot say that.
fn duplicate_packages(document: &Value) -> Vec<SchemaViolation> {
    let Some(actions) = document.get("actions").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    actions
        .iter()
        .enumerate()
        .filter_map(|(i, action)| {
            let name = action.get("package")?.as_str()?;
            (!seen.insert(name)).then(|| {
                SchemaViolation::new(
                    format!("actions.{i}.package"),
                    format!("duplicate package '{name}'"),
                )
            })
        })
        .collect()
}

/// `/actions/0/steps` -> `actions.0.steps`.
fn pointer_to_path(pointer: &str) -> String {
    pointer
        .split('/')
        .skip(1)
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Segment-wise, with array indexes compared numerically.
fn compare_paths(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<usize>(), y.parse::<usize>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
