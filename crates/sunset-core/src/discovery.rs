//! Read-only package snapshots derived from registry documents.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sunset_registry::{Dist, Packument, RegistryApi};

use crate::versions::parse_version;

/// One published version.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersion {
    pub version: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    pub dist: Dist,
}

/// Snapshot of a package used for planning and policy checks.
///
/// Never persisted as part of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredPackage {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Newest first.
    pub versions: Vec<PackageVersion>,
    pub latest_version: String,
    pub last_publish: DateTime<Utc>,
    pub owners: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_downloads: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependents_count: Option<u64>,
    /// Deprecation message of the latest version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl DiscoveredPackage {
    /// Build a snapshot from a packument. `now` stands in for a missing publish time.
    pub fn from_packument(packument: &Packument, now: DateTime<Utc>) -> Self {
        let latest_version = resolve_latest(packument);

        let mut versions: Vec<PackageVersion> = packument
            .versions
            .iter()
            .map(|(version, data)| PackageVersion {
                version: version.clone(),
                published_at: packument.time.get(version).and_then(|t| parse_time(t)),
                deprecated: data.deprecated.clone().filter(|m| !m.is_empty()),
                dist: data.dist.clone(),
            })
            .collect();
        versions.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        let last_publish = packument
            .time
            .iter()
            .filter(|(key, _)| key.as_str() != "created" && key.as_str() != "modified")
            .filter_map(|(_, t)| parse_time(t))
            .max()
            .or_else(|| packument.time.get("modified").and_then(|t| parse_time(t)))
            .unwrap_or(now);

        let scope = packument
            .name
            .starts_with('@')
            .then(|| packument.name.split('/').next().map(String::from))
            .flatten();

        let deprecated = packument
            .versions
            .get(&latest_version)
            .and_then(|v| v.deprecated.clone())
            .filter(|m| !m.is_empty());

        Self {
            name: packument.name.clone(),
            scope,
            description: packument.description.clone(),
            versions,
            latest_version,
            last_publish,
            owners: packument.maintainer_names(),
            weekly_downloads: None,
            dependents_count: None,
            deprecated,
            repository: packument.repository_url(),
        }
    }

    /// Whether `user` is among the owners (case-insensitive).
    pub fn is_owner(&self, user: &str) -> bool {
        self.owners.iter().any(|o| o.eq_ignore_ascii_case(user))
    }

    /// Hours between the last publish and `now`.
    pub fn hours_since_publish(&self, now: DateTime<Utc>) -> f64 {
        (now - self.last_publish).num_seconds() as f64 / 3600.0
    }
}

/// Fetch a snapshot with weekly downloads filled in.
pub async fn discover_package(
    registry: &dyn RegistryApi,
    name: &str,
    now: DateTime<Utc>,
) -> sunset_registry::RegistryResult<DiscoveredPackage> {
    let packument = registry.packument(name).await?;
    let mut package = DiscoveredPackage::from_packument(&packument, now);
    package.weekly_downloads = registry.weekly_downloads(name).await;
    Ok(package)
}

/// The `latest` dist-tag, else the highest semver among published versions,
/// else `0.0.0`.
pub fn resolve_latest(packument: &Packument) -> String {
    if let Some(tagged) = packument.latest_version() {
        return tagged.to_string();
    }
    packument
        .versions
        .keys()
        .filter_map(|v| parse_version(v).map(|parsed| (parsed, v)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| "0.0.0".to_string())
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packument() -> Packument {
        serde_json::from_value(serde_json::json!({
            "_id": "@acme/widget",
            "name": "@acme/widget",
            "dist-tags": {"latest": "1.1.0"},
            "versions": {
                "1.0.0": {"name": "@acme/widget", "version": "1.0.0", "deprecated": "old"},
                "1.1.0": {"name": "@acme/widget", "version": "1.1.0", "deprecated": ""}
            },
            "time": {
                "created": "2020-01-01T00:00:00.000Z",
                "modified": "2024-06-01T00:00:00.000Z",
                "1.0.0": "2020-01-01T00:00:00.000Z",
                "1.1.0": "2021-03-04T05:06:07.000Z"
            },
            "maintainers": [{"name": "Alice"}, {"name": "bob"}],
            "repository": {"type": "git", "url": "git+https://github.com/acme/widget.git"}
        }))
        .unwrap()
    }

    #[test]
    fn test_from_packument() {
        let now = Utc::now();
        let pkg = DiscoveredPackage::from_packument(&packument(), now);

        assert_eq!(pkg.scope.as_deref(), Some("@acme"));
        assert_eq!(pkg.latest_version, "1.1.0");
        assert_eq!(pkg.versions[0].version, "1.1.0");
        assert_eq!(pkg.versions[1].deprecated.as_deref(), Some("old"));
        assert_eq!(pkg.deprecated, None);
        assert_eq!(
            pkg.last_publish,
            DateTime::parse_from_rfc3339("2021-03-04T05:06:07Z").unwrap()
        );
        assert_eq!(
            pkg.repository.as_deref(),
            Some("git+https://github.com/acme/widget.git")
        );
        assert!(pkg.is_owner("alice"));
        assert!(!pkg.is_owner("carol"));
    }

    #[test]
    fn test_missing_times_fall_back_to_now() {
        let packument: Packument =
            serde_json::from_value(serde_json::json!({"name": "bare"})).unwrap();
        let now = Utc::now();
        let pkg = DiscoveredPackage::from_packument(&packument, now);
        assert_eq!(pkg.last_publish, now);
        assert_eq!(pkg.latest_version, "0.0.0");
        assert!(pkg.scope.is_none());
    }

    #[test]
    fn test_latest_without_dist_tag_is_highest_semver() {
        let packument: Packument = serde_json::from_value(serde_json::json!({
            "name": "untagged",
            "versions": {
                "9.0.0": {"name": "untagged", "version": "9.0.0"},
                "10.0.0": {"name": "untagged", "version": "10.0.0"},
                "not-a-version": {"name": "untagged", "version": "not-a-version"}
            }
        }))
        .unwrap();

        assert_eq!(resolve_latest(&packument), "10.0.0");
        let pkg = DiscoveredPackage::from_packument(&packument, Utc::now());
        assert_eq!(pkg.latest_version, "10.0.0");
    }
}
