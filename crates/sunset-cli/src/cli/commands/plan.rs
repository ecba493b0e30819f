use anyhow::Context;
use sunset_core::plan::{
    count_steps, create_plan, save_plan, PackageAction, PlanOptions, RepoProvider, Step,
};
use sunset_core::repo::RepoRef;
use sunset_registry::RegistryClient;
use tracing::warn;

use crate::cli::args::{PlanActionKind, PlanArgs};
use crate::cli::helpers::registry_client;
use crate::exit_codes::{FAILED, SUCCESS};

pub async fn run(args: PlanArgs) -> anyhow::Result<i32> {
    let client = registry_client(&args.registry)?;
    let user = client
        .whoami()
        .await
        .context("could not authenticate with registry")?;

    let packages = if args.all {
        client
            .find_packages_by_maintainer(&user)
            .await
            .context("failed to list maintained packages")?
    } else {
        args.packages.clone()
    };
    if packages.is_empty() {
        eprintln!("No packages to plan. Name some packages or pass --all.");
        return Ok(FAILED);
    }

    let mut actions = Vec::with_capacity(packages.len());
    for package in &packages {
        let mut action = PackageAction::new(package, vec![primary_step(&args)]);
        if args.archive_repo {
            if let Some(step) = archive_step(&client, package).await {
                action = action.then(step);
            }
        }
        actions.push(action);
    }

    let plan = create_plan(
        actions,
        user,
        PlanOptions {
            dry_run: false,
            enable_unpublish: args.enable_unpublish,
            concurrency: args.concurrency,
        },
    );
    save_plan(&plan, &args.output).await?;

    let counts = count_steps(&plan);
    eprintln!(
        "Wrote {} ({} package(s), {} step(s))",
        args.output.display(),
        plan.actions.len(),
        counts.total
    );
    eprintln!("Next: sunset validate {}", args.output.display());
    Ok(SUCCESS)
}

fn primary_step(args: &PlanArgs) -> Step {
    match args.action {
        PlanActionKind::Deprecate => Step::Deprecate {
            range: args.range.clone(),
            message: args.message.clone(),
        },
        PlanActionKind::Undeprecate => Step::Undeprecate {
            range: args.range.clone(),
        },
        PlanActionKind::Tombstone => Step::Tombstone {
            target_version: args.target_version.clone(),
            message: args.message.clone(),
        },
        PlanActionKind::Unpublish => Step::Unpublish {
            version: args.version.clone(),
            force: args.force,
        },
    }
}

async fn archive_step(client: &RegistryClient, package: &str) -> Option<Step> {
    let packument = match client.packument(package).await {
        Ok(packument) => packument,
        Err(e) => {
            warn!(package, error = %e, "could not read repository; no archive step added");
            return None;
        }
    };
    let url = packument.repository_url()?;
    match RepoRef::parse(&url) {
        Some(repo) => Some(Step::ArchiveRepo {
            provider: RepoProvider::Github,
            repo: repo.to_string(),
            add_banner: true,
        }),
        None => {
            warn!(package, repository = %url, "not a GitHub repository; no archive step added");
            None
        }
    }
}
