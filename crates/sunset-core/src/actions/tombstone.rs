//! Tombstone releases: a final major version that throws on import.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use sunset_registry::{PublishManifest, PublishPayload, RegistryApi};
use tracing::info;

use super::{ActionError, ActionResult};
use crate::archive;
use crate::discovery::resolve_latest;
use crate::plan::model::NEXT_MAJOR;
use crate::versions::next_major;

/// Error code thrown by a tombstoned package's entry point.
pub const TOMBSTONE_ERROR_CODE: &str = "ERR_PACKAGE_TOMBSTONED";

const KEYWORDS: [&str; 3] = ["tombstone", "deprecated", "unmaintained"];

/// Concrete version for a tombstone target. `nextMajor` follows `latest`.
pub fn resolve_target_version(target: &str, latest: &str) -> String {
    if target == NEXT_MAJOR {
        next_major(latest)
    } else {
        target.to_string()
    }
}

pub fn tombstone_description(package: &str, description: Option<&str>) -> String {
    format!(
        "[TOMBSTONE] {} - NO LONGER MAINTAINED",
        description.filter(|d| !d.is_empty()).unwrap_or(package)
    )
}

fn index_js(package: &str, message: &str) -> String {
    // JSON string literals are valid JavaScript string literals.
    let name = Value::from(package).to_string();
    let message = Value::from(message).to_string();
    format!(
        r#"'use strict';

const error = new Error(
  '[TOMBSTONE] "' + {name} + '" is no longer maintained.\n\n' +
  {message} + '\n\n' +
  'This release exists only to stop the package from being used.\n' +
  'Pin the last working version or fork it if you still depend on it.\n'
);

error.code = '{TOMBSTONE_ERROR_CODE}';

throw error;
"#
    )
}

fn readme_md(package: &str, message: &str) -> String {
    format!(
        r#"# {package}

> **This package is no longer maintained.**

{message}

This is a **tombstone release**: importing it throws `{TOMBSTONE_ERROR_CODE}`.

## Why does this release exist?

- It makes the end of maintenance impossible to miss.
- Projects that auto-update fail loudly instead of silently.
- The package name stays reserved.

## What now?

- Pin the last version published before this one.
- Fork the project if you need further development.
- Look for a maintained alternative.
"#
    )
}

/// Files of the tombstone tarball, keyed by archive path.
pub fn tombstone_files(
    package: &str,
    version: &str,
    description: &str,
    message: &str,
) -> BTreeMap<String, String> {
    let package_json = json!({
        "name": package,
        "version": version,
        "description": description,
        "main": "index.js",
        "scripts": {},
        "keywords": KEYWORDS,
        "license": "UNLICENSED",
        "deprecated": message,
    });

    BTreeMap::from([
        ("package/index.js".to_string(), index_js(package, message)),
        ("package/README.md".to_string(), readme_md(package, message)),
        (
            "package/package.json".to_string(),
            serde_json::to_string_pretty(&package_json).unwrap_or_default(),
        ),
    ])
}

/// Publish a tombstone release under the `latest` dist-tag.
pub async fn tombstone(
    registry: &dyn RegistryApi,
    package: &str,
    target_version: &str,
    message: &str,
    otp: Option<&str>,
) -> ActionResult {
    info!(package, "creating tombstone release");

    let packument = registry.packument(package).await?;
    let latest = resolve_latest(&packument);
    let version = resolve_target_version(target_version, &latest);

    if packument.has_version(&version) {
        return Err(ActionError::rejected(format!(
            "Version {version} already exists"
        )));
    }

    let description = tombstone_description(package, packument.description.as_deref());
    let files = tombstone_files(package, &version, &description, message);
    let tarball = archive::build(&files)
        .map_err(|e| ActionError::rejected(format!("failed to build tarball: {e}")))?;

    let mut manifest = PublishManifest::new(package, &version);
    manifest.description = Some(description);
    manifest.main = Some("index.js".to_string());
    manifest.deprecated = Some(message.to_string());
    manifest.readme = files.get("package/README.md").cloned();
    manifest.extra.insert("keywords".into(), json!(KEYWORDS));
    manifest.extra.insert("license".into(), json!("UNLICENSED"));

    let payload = PublishPayload::new(registry.registry_url(), manifest, &tarball, "latest");
    registry.publish(&payload, otp).await?;

    info!(package, version = %version, previous = %latest, "published tombstone release");
    Ok(format!("Published tombstone release {version}"))
}
