//! In-memory registry for engine tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sunset_core::otp::{OtpError, OtpProvider};
use sunset_core::repo::{ArchiveReport, RepoArchiver, RepoError, RepoRef};
use sunset_registry::{
    Maintainer, Packument, PackumentVersion, PublishPayload, RegistryApi, RegistryError,
    RegistryResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Whoami,
    Get,
    Put,
    Publish,
    Delete,
    Downloads,
}

impl Method {
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Put | Self::Publish | Self::Delete)
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub package: String,
    pub otp: Option<String>,
    pub started: Instant,
    pub finished: Instant,
}

pub struct FakeRegistry {
    user: Option<String>,
    packuments: Mutex<BTreeMap<String, Packument>>,
    downloads: BTreeMap<String, u64>,
    delays: BTreeMap<String, Duration>,
    broken: BTreeSet<String>,
    otp_code: Option<String>,
    otp_challenges: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl FakeRegistry {
    pub fn new(user: &str) -> Self {
        Self {
            user: Some(user.to_string()),
            packuments: Mutex::new(BTreeMap::new()),
            downloads: BTreeMap::new(),
            delays: BTreeMap::new(),
            broken: BTreeSet::new(),
            otp_code: None,
            otp_challenges: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A registry whose token is rejected.
    pub fn unauthenticated() -> Self {
        Self {
            user: None,
            ..Self::new("")
        }
    }

    pub fn with_package(self, packument: Packument) -> Self {
        self.packuments
            .lock()
            .unwrap()
            .insert(packument.name.clone(), packument);
        self
    }

    pub fn with_downloads(mut self, name: &str, count: u64) -> Self {
        self.downloads.insert(name.to_string(), count);
        self
    }

    /// Every call for `name` takes at least `delay`.
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Reads of `name` fail with a 500.
    pub fn with_broken(mut self, name: &str) -> Self {
        self.broken.insert(name.to_string());
        self
    }

    /// Writes are rejected unless they carry `code`.
    pub fn requiring_otp(mut self, code: &str) -> Self {
        self.otp_code = Some(code.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method.is_mutation())
            .collect()
    }

    pub fn calls_for(&self, package: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.package == package)
            .collect()
    }

    pub fn otp_challenges(&self) -> usize {
        self.otp_challenges.load(Ordering::SeqCst)
    }

    pub fn stored(&self, name: &str) -> Option<Packument> {
        self.packuments.lock().unwrap().get(name).cloned()
    }

    async fn record(&self, method: Method, package: &str, otp: Option<&str>) {
        let started = Instant::now();
        if let Some(delay) = self.delays.get(package) {
            tokio::time::sleep(*delay).await;
        }
        self.calls.lock().unwrap().push(Call {
            method,
            package: package.to_string(),
            otp: otp.map(String::from),
            started,
            finished: Instant::now(),
        });
    }

    fn check_otp(&self, otp: Option<&str>) -> RegistryResult<()> {
        match &self.otp_code {
            Some(code) if otp != Some(code.as_str()) => {
                self.otp_challenges.fetch_add(1, Ordering::SeqCst);
                Err(RegistryError::OtpRequired)
            }
            _ => Ok(()),
        }
    }

    fn not_found(name: &str) -> RegistryError {
        RegistryError::Http {
            status: 404,
            message: format!("'{name}' is not in this registry."),
            body: String::new(),
        }
    }
}

#[async_trait]
impl RegistryApi for FakeRegistry {
    async fn whoami(&self) -> RegistryResult<String> {
        self.record(Method::Whoami, "", None).await;
        self.user.clone().ok_or(RegistryError::Unauthorized {
            status: 401,
            message: "invalid token".into(),
        })
    }

    async fn packument(&self, name: &str) -> RegistryResult<Packument> {
        self.record(Method::Get, name, None).await;
        if self.broken.contains(name) {
            return Err(RegistryError::Http {
                status: 500,
                message: "Internal Server Error".into(),
                body: String::new(),
            });
        }
        self.stored(name).ok_or_else(|| Self::not_found(name))
    }

    async fn put_packument(&self, packument: &Packument, otp: Option<&str>) -> RegistryResult<()> {
        self.record(Method::Put, &packument.name, otp).await;
        self.check_otp(otp)?;
        self.packuments
            .lock()
            .unwrap()
            .insert(packument.name.clone(), packument.clone());
        Ok(())
    }

    async fn publish(&self, payload: &PublishPayload, otp: Option<&str>) -> RegistryResult<()> {
        self.record(Method::Publish, &payload.name, otp).await;
        self.check_otp(otp)?;

        let mut packuments = self.packuments.lock().unwrap();
        let packument = packuments
            .get_mut(&payload.name)
            .ok_or_else(|| Self::not_found(&payload.name))?;
        for (version, manifest) in &payload.versions {
            packument.versions.insert(
                version.clone(),
                PackumentVersion {
                    name: manifest.name.clone(),
                    version: version.clone(),
                    deprecated: manifest.deprecated.clone(),
                    dist: manifest.dist.clone(),
                    extra: manifest.extra.clone(),
                },
            );
            packument
                .time
                .insert(version.clone(), Utc::now().to_rfc3339());
        }
        packument.dist_tags.extend(payload.dist_tags.clone());
        Ok(())
    }

    async fn unpublish_version(
        &self,
        name: &str,
        version: &str,
        otp: Option<&str>,
    ) -> RegistryResult<()> {
        self.record(Method::Delete, name, otp).await;
        self.check_otp(otp)?;
        let mut packuments = self.packuments.lock().unwrap();
        let packument = packuments.get_mut(name).ok_or_else(|| Self::not_found(name))?;
        packument.versions.remove(version);
        Ok(())
    }

    async fn unpublish_package(&self, name: &str, otp: Option<&str>) -> RegistryResult<()> {
        self.record(Method::Delete, name, otp).await;
        self.check_otp(otp)?;
        self.packuments
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(name))
    }

    async fn weekly_downloads(&self, name: &str) -> Option<u64> {
        self.record(Method::Downloads, name, None).await;
        self.downloads.get(name).copied()
    }

    fn registry_url(&self) -> &str {
        "https://registry.test"
    }
}

/// Packument with `owners` and versions published at the given times.
pub fn packument(name: &str, owners: &[&str], versions: &[(&str, DateTime<Utc>)]) -> Packument {
    let mut packument: Packument =
        serde_json::from_value(serde_json::json!({ "_id": name, "_rev": "1-abc", "name": name }))
            .unwrap();
    packument.maintainers = owners.iter().map(|o| Maintainer::new(*o)).collect();
    for (version, published) in versions {
        packument.versions.insert(
            version.to_string(),
            PackumentVersion {
                name: name.to_string(),
                version: version.to_string(),
                deprecated: None,
                dist: Default::default(),
                extra: Default::default(),
            },
        );
        packument
            .time
            .insert(version.to_string(), published.to_rfc3339());
    }
    if let Some((latest, _)) = versions.last() {
        packument
            .dist_tags
            .insert("latest".to_string(), latest.to_string());
    }
    packument
}

/// Packument with a single old `1.0.0` release.
pub fn old_package(name: &str, owners: &[&str]) -> Packument {
    packument(
        name,
        owners,
        &[("1.0.0", Utc::now() - chrono::Duration::days(400))],
    )
}

/// Hands out codes from a fixed value and counts how often it was asked.
pub struct CountingOtp {
    code: String,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl CountingOtp {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            delay: Duration::from_millis(10),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OtpProvider for CountingOtp {
    async fn get_otp(&self) -> Result<String, OtpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.code.clone())
    }
}

/// Records archive requests without touching any real repository.
#[derive(Default)]
pub struct RecordingArchiver {
    pub archived: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl RepoArchiver for RecordingArchiver {
    async fn archive(
        &self,
        repo: &RepoRef,
        _package: &str,
        add_banner: bool,
    ) -> Result<ArchiveReport, RepoError> {
        self.archived
            .lock()
            .unwrap()
            .push((repo.to_string(), add_banner));
        Ok(ArchiveReport {
            messages: vec![format!("Repository {repo} has been archived")],
            warnings: Vec::new(),
        })
    }
}
