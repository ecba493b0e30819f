//! Source repository archiving.

mod github;

pub use github::GhCliArchiver;

use std::fmt;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("GitHub CLI (gh) is not installed. Install it from https://cli.github.com/")]
    CliMissing,

    #[error("Not authenticated with GitHub CLI. Run \"gh auth login\" first.")]
    NotAuthenticated,

    #[error("Repository {repo} not found or not accessible")]
    NotFound { repo: String },

    #[error("{action} failed: {message}")]
    Command {
        action: &'static str,
        message: String,
    },
}

/// `owner/name` of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Accepts `owner/name`, `github:owner/name` and GitHub URLs
    /// (`https://`, `git+https://`, `git@github.com:`), with or without `.git`.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let path = if let Some(idx) = input.find("github.com") {
            let rest = &input[idx + "github.com".len()..];
            rest.strip_prefix('/').or_else(|| rest.strip_prefix(':'))?
        } else if let Some(rest) = input.strip_prefix("github:") {
            rest
        } else if input.contains(':') {
            return None;
        } else {
            input
        };

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut parts = path.split('/');
        let owner = parts.next()?;
        let name = parts.next()?;
        if parts.next().is_some() || !is_segment(owner) || !is_segment(name) {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

fn is_segment(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// What an archive run did. Warnings never fail the step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
}

#[async_trait]
pub trait RepoArchiver: Send + Sync {
    async fn archive(
        &self,
        repo: &RepoRef,
        package: &str,
        add_banner: bool,
    ) -> Result<ArchiveReport, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_forms() {
        let expected = RepoRef {
            owner: "acme".into(),
            name: "widget".into(),
        };
        for input in [
            "acme/widget",
            "github:acme/widget",
            "https://github.com/acme/widget",
            "https://github.com/acme/widget/",
            "git+https://github.com/acme/widget.git",
            "git@github.com:acme/widget.git",
        ] {
            assert_eq!(RepoRef::parse(input), Some(expected.clone()), "{input}");
        }
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        for input in [
            "",
            "widget",
            "acme/widget/extra",
            "https://gitlab.com/acme/widget",
            "acme/",
            "acme/wid get",
        ] {
            assert_eq!(RepoRef::parse(input), None, "{input}");
        }
    }
}
