use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sunset",
    version,
    about = "Plan, validate and apply end-of-life actions for npm packages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a plan file for named packages or everything you maintain
    Plan(PlanArgs),
    /// Check a plan file against the live registry
    Validate(ValidateArgs),
    /// Validate, confirm and execute a plan file
    Apply(ApplyArgs),
    /// Show unpublish eligibility and ownership for packages
    Check(CheckArgs),
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    /// Registry base URL
    #[arg(long, env = "SUNSET_REGISTRY_URL")]
    pub registry: Option<String>,

    /// Bearer token (defaults to NPM_TOKEN, NODE_AUTH_TOKEN, then .npmrc)
    #[arg(long, hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanActionKind {
    Deprecate,
    Undeprecate,
    Tombstone,
    Unpublish,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Packages to include
    pub packages: Vec<String>,

    /// Include every package maintained by the current user
    #[arg(long, conflicts_with = "packages")]
    pub all: bool,

    #[arg(long, value_enum, default_value = "deprecate")]
    pub action: PlanActionKind,

    /// Deprecation or tombstone message
    #[arg(long, short, default_value = "This package is no longer maintained.")]
    pub message: String,

    /// Version range for deprecate/undeprecate
    #[arg(long, default_value = "*")]
    pub range: String,

    /// Tombstone version, or nextMajor
    #[arg(long, default_value = "nextMajor")]
    pub target_version: String,

    /// Version to unpublish; omit with --force to remove the whole package
    #[arg(long)]
    pub version: Option<String>,

    #[arg(long)]
    pub force: bool,

    /// Also archive the GitHub repository listed in package metadata
    #[arg(long)]
    pub archive_repo: bool,

    #[arg(long)]
    pub enable_unpublish: bool,

    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: u32,

    #[arg(long, short, default_value = "sunset-plan.json")]
    pub output: PathBuf,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(default_value = "sunset-plan.json")]
    pub plan: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[arg(default_value = "sunset-plan.json")]
    pub plan: PathBuf,

    /// Validate and report without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the yes/no prompt for non-destructive plans
    #[arg(long, short)]
    pub yes: bool,

    /// Confirmation phrase for destructive plans, e.g. "APPLY 4"
    #[arg(long)]
    pub confirm: Option<String>,

    /// Allow unpublish steps regardless of the plan's option
    #[arg(long)]
    pub enable_unpublish: bool,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// One-time password for the first write
    #[arg(long)]
    pub otp: Option<String>,

    /// Print the execution result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(required = true)]
    pub packages: Vec<String>,

    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,
}
