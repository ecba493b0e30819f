//! Plans: model, persistence, validation and execution.

pub mod builder;
pub mod executor;
pub mod model;
pub mod schema;
pub mod serializer;
pub mod validator;

pub use builder::{
    add_action, confirmation_phrase, count_steps, create_plan, destructive_steps,
    has_destructive_actions, remove_action, StepCounts,
};
pub use executor::{partition_batches, Executor, ExecutorOptions, ProgressEvent, ProgressSink};
pub use model::{
    ExecutionSummary, OverallStatus, PackageAction, PackageResult, Plan, PlanExecutionResult,
    PlanOptions, RepoProvider, Step, StepResult, StepStatus, NEXT_MAJOR, PLAN_VERSION,
};
pub use schema::{parse_plan, validate_document};
pub use serializer::{from_json, load_plan, save_plan, to_json};
pub use validator::{validate_plan_runtime, IssueCode, ValidationIssue, ValidationResult};
