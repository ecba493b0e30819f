//! Plan engine for retiring packages on an npm-style registry.
//!
//! Work is split into a declarative [`plan::Plan`] that can be saved,
//! reviewed and validated, and an [`plan::Executor`] that applies it with
//! bounded concurrency and an OTP retry protocol.
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use sunset_core::otp::NoOtp;
//! use sunset_core::plan::{self, Executor, ExecutorOptions, PackageAction, PlanOptions};
//! use sunset_core::repo::GhCliArchiver;
//! use sunset_registry::{RegistryClient, RegistryConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(RegistryClient::new(RegistryConfig::from_env())?);
//! let plan = plan::create_plan(
//!     vec![PackageAction::deprecate("left-pad", "*", "No longer maintained")],
//!     registry.whoami().await?,
//!     PlanOptions::default(),
//! );
//!
//! let validation = plan::validate_plan_runtime(registry.as_ref(), &plan, Utc::now()).await?;
//! if validation.valid {
//!     let executor = Executor::new(registry, Arc::new(NoOtp), Arc::new(GhCliArchiver::default()));
//!     let result = executor.execute(&plan, ExecutorOptions::default()).await;
//!     println!("{} succeeded", result.summary.succeeded);
//! }
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod archive;
pub mod discovery;
pub mod error;
pub mod otp;
pub mod plan;
pub mod policy;
pub mod repo;
pub mod report;
pub mod versions;

pub use discovery::{discover_package, resolve_latest, DiscoveredPackage, PackageVersion};
pub use error::{PlanError, PlanResult, SchemaViolation};
