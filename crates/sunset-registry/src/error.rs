//! Error types for the registry client.

use std::time::Duration;

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry wants a one-time password for this write.
    ///
    /// Never retried by the transport; callers obtain a code and try again.
    #[error("OTP required for this operation")]
    OtpRequired,

    /// Authentication failed or token invalid.
    #[error("unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Rate limit exceeded and the attempt budget ran out.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Non-success status with the registry's own message.
    #[error("{message} (HTTP {status})")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    /// Network error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Invalid response from registry.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// The packument carried no revision token, so nothing can be deleted.
    #[error("could not get package revision for {name}")]
    MissingRevision { name: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl RegistryError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,

            // Auth issues
            Self::Unauthorized { .. } => 2,
            Self::OtpRequired => 2,

            // Registry refused the request
            Self::Http { .. } => 3,
            Self::MissingRevision { .. } => 3,

            // Network/transient
            Self::RateLimited { .. } => 5,
            Self::Network { .. } => 5,

            Self::InvalidResponse { .. } => 6,
        }
    }

    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    pub fn is_otp_required(&self) -> bool {
        matches!(self, Self::OtpRequired)
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
