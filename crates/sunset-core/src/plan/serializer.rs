//! Plan files: pretty-printed camelCase JSON.

use std::path::Path;

use tokio::fs;
use tracing::info;

use crate::error::{PlanError, PlanResult};
use crate::plan::model::Plan;
use crate::plan::schema::parse_plan;

/// Serialize a plan the way it is stored on disk.
pub fn to_json(plan: &Plan) -> PlanResult<String> {
    Ok(serde_json::to_string_pretty(plan)?)
}

/// Parse and schema-check plan JSON.
pub fn from_json(content: &str) -> PlanResult<Plan> {
    let document: serde_json::Value = serde_json::from_str(content)?;
    parse_plan(document)
}

pub async fn save_plan(plan: &Plan, path: impl AsRef<Path>) -> PlanResult<()> {
    let path = path.as_ref();
    let mut content = to_json(plan)?;
    content.push('\n');

    fs::write(path, content).await.map_err(|source| PlanError::Io {
        action: "write",
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), actions = plan.actions.len(), "saved plan");
    Ok(())
}

pub async fn load_plan(path: impl AsRef<Path>) -> PlanResult<Plan> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| PlanError::Io {
            action: "read",
            path: path.to_path_buf(),
            source,
        })?;

    let plan = from_json(&content)?;
    info!(path = %path.display(), actions = plan.actions.len(), "loaded plan");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_json_is_json_error() {
        assert!(matches!(from_json("{not json"), Err(PlanError::Json(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_plan(dir.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(err, PlanError::Io { action: "read", .. }));
        assert!(err.to_string().contains("missing.json"));
    }
}
