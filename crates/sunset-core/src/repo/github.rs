//! [`RepoArchiver`] backed by the GitHub CLI.
//!
//! Arguments go straight to the `gh` process; nothing passes through a shell.

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{ArchiveReport, RepoArchiver, RepoError, RepoRef};

const BANNER_MARKER: &str = "This project is no longer maintained";

const BANNER: &str = "> [!CAUTION]
> **This project is no longer maintained.**
>
> The repository is archived and read-only.
> No further releases, fixes or support will follow.
>
> Fork the repository if you need to keep it going.

---

";

#[derive(Debug, Clone)]
pub struct GhCliArchiver {
    program: String,
}

impl Default for GhCliArchiver {
    fn default() -> Self {
        Self::new("gh")
    }
}

impl GhCliArchiver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, action: &'static str, args: &[&str]) -> Result<String, RepoError> {
        debug!(program = %self.program, ?args, "running gh");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RepoError::CliMissing,
                _ => RepoError::Command {
                    action,
                    message: e.to_string(),
                },
            })?;

        if !output.status.success() {
            return Err(RepoError::Command {
                action,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_json(&self, action: &'static str, args: &[&str]) -> Result<Value, RepoError> {
        let stdout = self.run(action, args).await?;
        serde_json::from_str(&stdout).map_err(|e| RepoError::Command {
            action,
            message: format!("unexpected output: {e}"),
        })
    }

    async fn ensure_ready(&self) -> Result<(), RepoError> {
        self.run("gh --version", &["--version"]).await?;
        self.run("gh auth status", &["auth", "status"])
            .await
            .map_err(|e| match e {
                RepoError::CliMissing => RepoError::CliMissing,
                _ => RepoError::NotAuthenticated,
            })?;
        Ok(())
    }

    async fn is_archived(&self, repo: &RepoRef) -> Result<bool, RepoError> {
        let endpoint = format!("repos/{repo}");
        let info = self
            .run_json("repository lookup", &["api", &endpoint])
            .await
            .map_err(|e| match e {
                RepoError::Command { .. } => RepoError::NotFound {
                    repo: repo.to_string(),
                },
                other => other,
            })?;
        Ok(info.get("archived").and_then(Value::as_bool).unwrap_or(false))
    }

    async fn add_banner(&self, repo: &RepoRef, package: &str) -> Result<String, RepoError> {
        let endpoint = format!("repos/{repo}/contents/README.md");
        let readme = self.run_json("README lookup", &["api", &endpoint]).await?;

        let sha = readme
            .get("sha")
            .and_then(Value::as_str)
            .ok_or_else(|| RepoError::Command {
                action: "README lookup",
                message: "README.md not found in repository".to_string(),
            })?;
        let encoded: String = readme
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let engine = base64::engine::general_purpose::STANDARD;
        let current = engine
            .decode(encoded)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|e| RepoError::Command {
                action: "README lookup",
                message: e.to_string(),
            })?;

        if current.contains(BANNER_MARKER) {
            return Ok("Banner already present in README".to_string());
        }

        let content = engine.encode(format!("{BANNER}{current}"));
        let message = format!("message=docs: add unmaintained banner for {package}");
        let content = format!("content={content}");
        let sha = format!("sha={sha}");
        self.run(
            "README update",
            &[
                "api", &endpoint, "-X", "PUT", "-f", &message, "-f", &content, "-f", &sha,
            ],
        )
        .await?;

        info!(repo = %repo, "added unmaintained banner to README.md");
        Ok("Added unmaintained banner to README.md".to_string())
    }
}

#[async_trait]
impl RepoArchiver for GhCliArchiver {
    async fn archive(
        &self,
        repo: &RepoRef,
        package: &str,
        add_banner: bool,
    ) -> Result<ArchiveReport, RepoError> {
        self.ensure_ready().await?;
        let mut report = ArchiveReport::default();
        let archived = self.is_archived(repo).await?;

        if add_banner {
            if archived {
                let warning =
                    "Cannot modify README of archived repository. Add banner before archiving.";
                warn!(repo = %repo, "{warning}");
                report.warnings.push(warning.to_string());
            } else {
                match self.add_banner(repo, package).await {
                    Ok(message) => report.messages.push(message),
                    Err(e) => {
                        warn!(repo = %repo, error = %e, "banner update failed");
                        report.warnings.push(format!("Banner update failed: {e}"));
                    }
                }
            }
        }

        if archived {
            report
                .messages
                .push("Repository is already archived".to_string());
            return Ok(report);
        }

        let endpoint = format!("repos/{repo}");
        self.run(
            "archive",
            &["api", &endpoint, "-X", "PATCH", "-f", "archived=true"],
        )
        .await?;
        info!(repo = %repo, "archived repository");
        report
            .messages
            .push(format!("Repository {repo} has been archived"));
        Ok(report)
    }
}
