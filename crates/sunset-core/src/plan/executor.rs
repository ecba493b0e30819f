//! Plan execution.
//!
//! Packages run in batches of `concurrency`. A batch fully resolves before
//! the next one starts. Inside a package, steps run in order and the first
//! failure skips everything after it.

use std::sync::Arc;

use chrono::Utc;
use sunset_registry::RegistryApi;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::actions::{self, ActionError, ActionResult};
use crate::otp::{OtpProvider, OtpSession};
use crate::plan::model::{
    ExecutionSummary, PackageAction, PackageResult, Plan, PlanExecutionResult, Step, StepResult,
    StepStatus,
};
use crate::repo::RepoArchiver;

pub const CASCADE_MESSAGE: &str = "Skipped due to previous failure";
pub const DRY_RUN_MESSAGE: &str = "[DRY RUN] Skipped";
pub const UNPUBLISH_DISABLED_MESSAGE: &str = "Unpublish disabled (use --enable-unpublish)";

/// Per-run overrides of the plan's own options.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    pub dry_run: Option<bool>,
    pub concurrency: Option<usize>,
    /// Initial OTP, e.g. from `--otp`.
    pub otp: Option<String>,
}

/// Emitted when a package finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub package: String,
    pub done: usize,
    pub total: usize,
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Split actions into consecutive batches of at most `concurrency`.
pub fn partition_batches(actions: &[PackageAction], concurrency: usize) -> Vec<&[PackageAction]> {
    actions.chunks(concurrency.max(1)).collect()
}

pub struct Executor {
    registry: Arc<dyn RegistryApi>,
    otp_provider: Arc<dyn OtpProvider>,
    archiver: Arc<dyn RepoArchiver>,
    progress: Option<ProgressSink>,
}

impl Executor {
    pub fn new(
        registry: Arc<dyn RegistryApi>,
        otp_provider: Arc<dyn OtpProvider>,
        archiver: Arc<dyn RepoArchiver>,
    ) -> Self {
        Self {
            registry,
            otp_provider,
            archiver,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub async fn execute(&self, plan: &Plan, options: ExecutorOptions) -> PlanExecutionResult {
        let started_at = Utc::now();
        let dry_run = options.dry_run.unwrap_or(plan.options.dry_run);
        let concurrency = options
            .concurrency
            .unwrap_or(plan.options.concurrency as usize)
            .max(1);

        let runner = PackageRunner {
            registry: self.registry.clone(),
            otp_provider: self.otp_provider.clone(),
            archiver: self.archiver.clone(),
            session: Arc::new(OtpSession::new(options.otp)),
            enable_unpublish: plan.options.enable_unpublish,
            dry_run,
        };

        info!(
            packages = plan.actions.len(),
            concurrency, dry_run, "executing plan"
        );

        let total = plan.actions.len();
        let mut results = Vec::with_capacity(total);
        for (batch_no, batch) in partition_batches(&plan.actions, concurrency)
            .into_iter()
            .enumerate()
        {
            debug!(batch = batch_no, size = batch.len(), "starting batch");
            let batch_results = runner.run_batch(batch).await;
            for result in batch_results {
                if let Some(ref sink) = self.progress {
                    sink(ProgressEvent {
                        package: result.package.clone(),
                        done: results.len() + 1,
                        total,
                    });
                }
                results.push(result);
            }
        }

        let summary = ExecutionSummary::from_results(&results);
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            partial = summary.partial,
            failed = summary.failed,
            "plan execution finished"
        );

        PlanExecutionResult {
            plan: plan.clone(),
            started_at,
            completed_at: Utc::now(),
            results,
            summary,
        }
    }
}

/// Everything one package task needs. Cheap to clone into a task.
#[derive(Clone)]
struct PackageRunner {
    registry: Arc<dyn RegistryApi>,
    otp_provider: Arc<dyn OtpProvider>,
    archiver: Arc<dyn RepoArchiver>,
    session: Arc<OtpSession>,
    enable_unpublish: bool,
    dry_run: bool,
}

impl PackageRunner {
    /// Run one batch concurrently. Results keep plan order.
    async fn run_batch(&self, batch: &[PackageAction]) -> Vec<PackageResult> {
        let mut join_set = JoinSet::new();
        for (slot, action) in batch.iter().enumerate() {
            let this = self.clone();
            let action = action.clone();
            join_set.spawn(async move { (slot, this.run_package(&action).await) });
        }

        let mut slots: Vec<Option<PackageResult>> = vec![None; batch.len()];
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((slot, result)) => slots[slot] = Some(result),
                Err(e) => error!(error = %e, "package task failed"),
            }
        }

        slots
            .into_iter()
            .zip(batch)
            .map(|(result, action)| result.unwrap_or_else(|| aborted(action)))
            .collect()
    }

    async fn run_package(&self, action: &PackageAction) -> PackageResult {
        let mut steps = Vec::with_capacity(action.steps.len());
        let mut failed = false;

        for step in &action.steps {
            let result = if failed {
                StepResult::skipped(step.clone(), CASCADE_MESSAGE)
            } else if self.dry_run {
                StepResult::success(step.clone(), DRY_RUN_MESSAGE)
            } else {
                self.run_step(&action.package, step).await
            };
            failed |= result.status == StepStatus::Failed;
            steps.push(result);
        }

        let result = PackageResult::new(&action.package, steps);
        info!(package = %result.package, status = ?result.overall_status, "package finished");
        result
    }

    async fn run_step(&self, package: &str, step: &Step) -> StepResult {
        if matches!(step, Step::Unpublish { .. }) && !self.enable_unpublish {
            return StepResult::skipped(step.clone(), UNPUBLISH_DISABLED_MESSAGE);
        }

        let otp = self.session.current().await;
        let outcome = match self.dispatch(package, step, otp.as_deref()).await {
            Err(ActionError::OtpRequired) => {
                debug!(package, step = step.type_name(), "registry requested an OTP");
                match self
                    .session
                    .refresh(otp.as_deref(), self.otp_provider.as_ref())
                    .await
                {
                    Ok(fresh) => self.dispatch(package, step, Some(fresh.as_str())).await,
                    Err(e) => Err(ActionError::rejected(format!(
                        "OTP required for this operation: {e}"
                    ))),
                }
            }
            other => other,
        };

        match outcome {
            Ok(message) => StepResult::success(step.clone(), message),
            Err(e) => {
                warn!(package, step = step.type_name(), error = %e, "step failed");
                StepResult::failed(step.clone(), e.to_string())
            }
        }
    }

    async fn dispatch(&self, package: &str, step: &Step, otp: Option<&str>) -> ActionResult {
        let registry = self.registry.as_ref();
        match step {
            Step::Deprecate { range, message } => {
                actions::deprecate(registry, package, range, message, otp).await
            }
            Step::Undeprecate { range } => actions::undeprecate(registry, package, range, otp).await,
            Step::Unpublish { version, force } => {
                actions::unpublish(registry, package, version.as_deref(), *force, otp).await
            }
            Step::Tombstone {
                target_version,
                message,
            } => actions::tombstone(registry, package, target_version, message, otp).await,
            Step::OwnerAdd { user } => actions::add_owner(registry, package, user, otp).await,
            Step::OwnerRemove { user } => actions::remove_owner(registry, package, user, otp).await,
            Step::ArchiveRepo {
                provider,
                repo,
                add_banner,
            } => {
                actions::archive_repo(self.archiver.as_ref(), package, *provider, repo, *add_banner)
                    .await
            }
        }
    }
}

fn aborted(action: &PackageAction) -> PackageResult {
    let steps = action
        .steps
        .iter()
        .map(|step| StepResult::failed(step.clone(), "package task aborted"))
        .collect();
    PackageResult::new(&action.package, steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_batches() {
        let actions: Vec<PackageAction> = (0..5)
            .map(|i| PackageAction::owner_add(format!("p{i}"), "bob"))
            .collect();

        let sizes: Vec<usize> = partition_batches(&actions, 2).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        assert_eq!(partition_batches(&actions, 0).len(), 5);
        assert_eq!(partition_batches(&actions, 10).len(), 1);
        assert!(partition_batches(&[], 3).is_empty());
    }
}
