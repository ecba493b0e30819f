use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use sunset_core::plan::{load_plan, Plan, ProgressEvent, ProgressSink};
use sunset_core::report::format_progress_line;
use sunset_core::PlanError;
use sunset_registry::{RegistryClient, RegistryConfig};

use super::args::RegistryArgs;

pub fn registry_client(args: &RegistryArgs) -> anyhow::Result<RegistryClient> {
    let mut config = RegistryConfig::from_env();
    if let Some(url) = &args.registry {
        config = config.with_url(url);
    }
    if let Some(token) = &args.token {
        config = config.with_token(token);
    }
    RegistryClient::new(config).context("failed to build registry client")
}

/// Load a plan file. Malformed or schema-invalid plans are reported and
/// yield `None`; I/O problems are fatal.
pub async fn load_checked(path: &Path) -> anyhow::Result<Option<Plan>> {
    match load_plan(path).await {
        Ok(plan) => Ok(Some(plan)),
        Err(PlanError::Schema { violations }) => {
            eprintln!("Invalid plan {}:", path.display());
            for violation in violations {
                eprintln!("  x {violation}");
            }
            Ok(None)
        }
        Err(PlanError::Json(e)) => {
            eprintln!("Invalid plan {}: {e}", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn stderr_progress() -> ProgressSink {
    Arc::new(|event: ProgressEvent| eprintln!("{}", format_progress_line(&event)))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
