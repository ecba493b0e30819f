use chrono::Utc;
use sunset_core::plan::validate_plan_runtime;
use sunset_core::report::format_validation;

use crate::cli::args::ValidateArgs;
use crate::cli::helpers::{load_checked, print_json, registry_client};
use crate::exit_codes::{FAILED, SUCCESS};

pub async fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let Some(plan) = load_checked(&args.plan).await? else {
        return Ok(FAILED);
    };
    let client = registry_client(&args.registry)?;
    let result = validate_plan_runtime(&client, &plan, Utc::now()).await?;

    if args.json {
        print_json(&result)?;
    } else {
        eprint!("{}", format_validation(&result));
    }
    Ok(if result.valid { SUCCESS } else { FAILED })
}
