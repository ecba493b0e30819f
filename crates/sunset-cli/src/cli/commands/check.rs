use chrono::Utc;
use serde_json::json;
use sunset_core::discover_package;
use sunset_core::policy::{check_unpublish_eligibility, validate_ownership};
use sunset_core::report::{format_eligibility, format_ownership};

use crate::cli::args::CheckArgs;
use crate::cli::helpers::{print_json, registry_client};
use crate::exit_codes::{FAILED, SUCCESS};

pub async fn run(args: CheckArgs) -> anyhow::Result<i32> {
    let client = registry_client(&args.registry)?;
    let user = client.verify_auth().await;
    let now = Utc::now();

    let mut reports = Vec::new();
    let mut failures = 0;
    for name in &args.packages {
        let package = match discover_package(&client, name, now).await {
            Ok(package) => package,
            Err(e) => {
                eprintln!("{name}: {e}");
                failures += 1;
                continue;
            }
        };
        let eligibility = check_unpublish_eligibility(&client, &package, now).await;
        let ownership = user.as_deref().map(|u| validate_ownership(&package, u));

        if args.json {
            reports.push(json!({
                "package": package,
                "eligibility": eligibility,
                "ownership": ownership,
            }));
        } else {
            eprint!("{}", format_eligibility(&package, &eligibility));
            if let Some(ownership) = &ownership {
                eprint!("{}", format_ownership(&package.name, ownership));
            }
        }
    }

    if args.json {
        print_json(&reports)?;
    }
    Ok(if failures == 0 { SUCCESS } else { FAILED })
}
