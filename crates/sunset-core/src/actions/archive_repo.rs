use tracing::info;

use super::{ActionError, ActionResult};
use crate::plan::model::RepoProvider;
use crate::repo::{RepoArchiver, RepoRef};

/// Archive the source repository, optionally adding an unmaintained banner first.
pub async fn archive_repo(
    archiver: &dyn RepoArchiver,
    package: &str,
    provider: RepoProvider,
    repo: &str,
    add_banner: bool,
) -> ActionResult {
    if provider != RepoProvider::Github {
        return Err(ActionError::rejected(format!(
            "Provider \"{provider}\" is not yet supported. Only \"github\" is available."
        )));
    }

    let repo_ref = RepoRef::parse(repo).ok_or_else(|| {
        ActionError::rejected(format!(
            "Invalid repository format: {repo}. Expected \"owner/repo\" or GitHub URL."
        ))
    })?;

    info!(package, repo = %repo_ref, "archiving repository");
    let report = archiver.archive(&repo_ref, package, add_banner).await?;
    Ok(report.messages.join("; "))
}
