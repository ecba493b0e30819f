use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use sunset_core::plan::{
    confirmation_phrase, count_steps, destructive_steps, has_destructive_actions,
    validate_plan_runtime, Executor, ExecutorOptions, Plan,
};
use sunset_core::repo::GhCliArchiver;
use sunset_core::report::{format_execution, format_validation};

use crate::cli::args::ApplyArgs;
use crate::cli::helpers::{load_checked, print_json, registry_client, stderr_progress};
use crate::cli::otp_prompt::otp_provider;
use crate::exit_codes::{ABORTED, FAILED, SUCCESS};

pub async fn run(args: ApplyArgs) -> anyhow::Result<i32> {
    let Some(mut plan) = load_checked(&args.plan).await? else {
        return Ok(FAILED);
    };
    if args.enable_unpublish {
        plan.options.enable_unpublish = true;
    }

    let client = Arc::new(registry_client(&args.registry)?);
    let validation = validate_plan_runtime(client.as_ref(), &plan, Utc::now()).await?;
    eprint!("{}", format_validation(&validation));
    if !validation.valid {
        return Ok(FAILED);
    }

    let dry_run = args.dry_run || plan.options.dry_run;
    if !dry_run && !confirm(&plan, &args)? {
        eprintln!("Aborted; nothing was changed.");
        return Ok(ABORTED);
    }

    let executor = Executor::new(client, otp_provider(), Arc::new(GhCliArchiver::default()))
        .with_progress(stderr_progress());
    let result = executor
        .execute(
            &plan,
            ExecutorOptions {
                dry_run: Some(dry_run),
                concurrency: args.concurrency.map(|c| c as usize),
                otp: args.otp.clone(),
            },
        )
        .await;

    if args.json {
        print_json(&result)?;
    } else {
        eprint!("{}", format_execution(&result));
    }
    Ok(if result.is_success() { SUCCESS } else { FAILED })
}

/// Destructive plans need the exact phrase, even with `--yes`.
fn confirm(plan: &Plan, args: &ApplyArgs) -> anyhow::Result<bool> {
    let theme = ColorfulTheme::default();

    if has_destructive_actions(plan) {
        let phrase = confirmation_phrase(plan);
        eprintln!("This plan contains destructive steps:");
        for (package, step) in destructive_steps(plan) {
            eprintln!("  {package}: {}", step.describe());
        }

        if let Some(given) = &args.confirm {
            return Ok(given.trim() == phrase);
        }
        if !std::io::stdin().is_terminal() {
            bail!("destructive plan needs --confirm \"{phrase}\" when not running interactively");
        }
        let typed: String = Input::with_theme(&theme)
            .with_prompt(format!("Type \"{phrase}\" to continue"))
            .allow_empty(true)
            .interact_text()?;
        return Ok(typed.trim() == phrase);
    }

    if args.yes {
        return Ok(true);
    }
    let counts = count_steps(plan);
    Ok(Confirm::with_theme(&theme)
        .with_prompt(format!(
            "Apply {} step(s) to {} package(s)?",
            counts.total,
            plan.actions.len()
        ))
        .default(false)
        .interact()
        .unwrap_or(false))
}
