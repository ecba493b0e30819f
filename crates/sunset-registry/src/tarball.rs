//! Publish payloads: tarball digests and the attachment document.

use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha1::Sha1;
use sha2::{Digest, Sha512};

use crate::client::encode_package_name;
use crate::types::Dist;

/// Subresource-integrity string over raw tarball bytes (`sha512-<base64>`).
pub fn calculate_integrity(data: &[u8]) -> String {
    let digest = Sha512::digest(data);
    format!(
        "sha512-{}",
        base64::engine::general_purpose::STANDARD.encode(digest)
    )
}

/// Legacy hex SHA-1 over raw tarball bytes.
pub fn calculate_shasum(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Attachment file name for a version, e.g. `left-pad-2.0.0.tgz`.
///
/// Scoped packages use the bare name, as the registry does.
pub fn tarball_file_name(name: &str, version: &str) -> String {
    let bare = name.rsplit('/').next().unwrap_or(name);
    format!("{bare}-{version}.tgz")
}

/// Version manifest embedded in a publish payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishManifest {
    pub name: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,

    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(default)]
    pub dist: Dist,

    /// Any further `package.json` fields (`keywords`, `license`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PublishManifest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        let version = version.into();
        Self {
            id: format!("{name}@{version}"),
            name,
            version,
            description: None,
            main: None,
            deprecated: None,
            readme: None,
            dist: Dist::default(),
            extra: Map::new(),
        }
    }
}

/// Base64 tarball attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub content_type: String,
    pub data: String,
    pub length: usize,
}

/// Body of the initial-publish `PUT /<name>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishPayload {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,

    pub versions: BTreeMap<String, PublishManifest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,

    #[serde(rename = "_attachments")]
    pub attachments: BTreeMap<String, Attachment>,
}

impl PublishPayload {
    /// Build a payload for `tarball`, filling in `dist` and `_id` on the manifest.
    pub fn new(registry_url: &str, mut manifest: PublishManifest, tarball: &[u8], tag: &str) -> Self {
        let file_name = tarball_file_name(&manifest.name, &manifest.version);

        manifest.dist = Dist {
            tarball: format!(
                "{}/{}/-/{}",
                registry_url.trim_end_matches('/'),
                manifest.name,
                file_name
            ),
            shasum: calculate_shasum(tarball),
            integrity: Some(calculate_integrity(tarball)),
        };
        manifest.id = format!("{}@{}", manifest.name, manifest.version);

        let attachment = Attachment {
            content_type: "application/octet-stream".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(tarball),
            length: tarball.len(),
        };

        Self {
            id: manifest.name.clone(),
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            dist_tags: BTreeMap::from([(tag.to_string(), manifest.version.clone())]),
            readme: manifest.readme.clone(),
            versions: BTreeMap::from([(manifest.version.clone(), manifest)]),
            attachments: BTreeMap::from([(file_name, attachment)]),
        }
    }

    /// Request path for this payload.
    pub fn path(&self) -> String {
        format!("/{}", encode_package_name(&self.name))
    }
}
