//! Token authentication for the registry.
//!
//! Tokens are resolved once, when the client is built. First match wins:
//!
//! 1. Explicit token (from config or CLI flag)
//! 2. `NPM_TOKEN`, then `NODE_AUTH_TOKEN`
//! 3. `.npmrc` in the current working directory
//! 4. `.npmrc` in the user's home directory
//!
//! An `.npmrc` is scanned line by line for an auth-token assignment such as
//! `//registry.npmjs.org/:_authToken=npm_xxx`.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Environment variables checked for a token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["NPM_TOKEN", "NODE_AUTH_TOKEN"];

const NPMRC_FILE: &str = ".npmrc";
const AUTH_TOKEN_KEY: &str = ":_authToken=";

/// Token provider for registry authentication.
#[derive(Clone, Default)]
pub enum TokenProvider {
    /// Static bearer token.
    Static(String),

    /// No authentication.
    #[default]
    None,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::None => f.write_str("None"),
        }
    }
}

impl TokenProvider {
    /// Create a static token provider.
    pub fn static_token(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// Resolve a token using the full lookup chain.
    pub fn resolve(explicit: Option<&str>) -> Self {
        let home_npmrc = dirs::home_dir().map(|home| home.join(NPMRC_FILE));
        let project_npmrc = std::env::current_dir()
            .ok()
            .map(|cwd| cwd.join(NPMRC_FILE));

        let npmrc_paths: Vec<PathBuf> = [project_npmrc, home_npmrc].into_iter().flatten().collect();

        Self::resolve_with(explicit, &npmrc_paths)
    }

    /// Resolve with an explicit list of `.npmrc` candidates (project first).
    pub fn resolve_with(explicit: Option<&str>, npmrc_paths: &[PathBuf]) -> Self {
        if let Some(token) = explicit.filter(|t| !t.trim().is_empty()) {
            debug!("using explicitly supplied token");
            return Self::Static(token.trim().to_string());
        }

        if let Some(provider) = Self::from_env() {
            return provider;
        }

        for path in npmrc_paths {
            if let Some(token) = read_npmrc_token(path) {
                debug!(path = %path.display(), "using token from .npmrc");
                return Self::Static(token);
            }
        }

        Self::None
    }

    /// Token from the environment, if any variable is set and non-empty.
    pub fn from_env() -> Option<Self> {
        for var in TOKEN_ENV_VARS {
            if let Ok(token) = std::env::var(var) {
                if !token.trim().is_empty() {
                    debug!(var, "using token from environment variable");
                    return Some(Self::Static(token.trim().to_string()));
                }
            }
        }
        None
    }

    /// Get the current token.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Static(token) => Some(token),
            Self::None => None,
        }
    }

    /// Check if authentication is configured.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

fn read_npmrc_token(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }

    match std::fs::read_to_string(path) {
        Ok(content) => parse_npmrc_token(&content),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "failed to read .npmrc");
            None
        }
    }
}

/// Find the first auth-token assignment in `.npmrc` content.
pub fn parse_npmrc_token(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && !line.starts_with(';'))
        .find_map(|line| {
            let idx = line.find(AUTH_TOKEN_KEY)?;
            let token = line[idx + AUTH_TOKEN_KEY.len()..].trim();
            (!token.is_empty()).then(|| token.to_string())
        })
}
