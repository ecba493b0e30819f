//! One-time passwords for registry writes.
//!
//! A run shares one [`OtpSession`]. The first branch that hits an OTP
//! challenge asks the [`OtpProvider`] for a code; branches that were waiting
//! on the same stale code reuse the fresh one instead of asking again.

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// Environment variable naming a command that prints a current OTP.
pub const OTP_COMMAND_ENV: &str = "SUNSET_OTP_COMMAND";

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("no OTP available: {0}")]
    Unavailable(String),

    #[error("OTP command failed: {0}")]
    Command(String),

    #[error("OTP prompt failed: {0}")]
    Prompt(String),
}

#[async_trait]
pub trait OtpProvider: Send + Sync {
    async fn get_otp(&self) -> Result<String, OtpError>;
}

/// Always returns the same code.
#[derive(Debug, Clone)]
pub struct StaticOtp(pub String);

#[async_trait]
impl OtpProvider for StaticOtp {
    async fn get_otp(&self) -> Result<String, OtpError> {
        Ok(self.0.clone())
    }
}

/// Non-interactive runs without a code source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOtp;

#[async_trait]
impl OtpProvider for NoOtp {
    async fn get_otp(&self) -> Result<String, OtpError> {
        Err(OtpError::Unavailable(format!(
            "pass --otp or set {OTP_COMMAND_ENV}"
        )))
    }
}

/// Runs a command (e.g. a password manager CLI) and uses its trimmed stdout.
#[derive(Debug, Clone)]
pub struct CommandOtp {
    program: String,
    args: Vec<String>,
}

impl CommandOtp {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Whitespace-separated command line, e.g. `op item get npm --otp`.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn from_env() -> Option<Self> {
        std::env::var(OTP_COMMAND_ENV)
            .ok()
            .and_then(|line| Self::from_command_line(&line))
    }
}

#[async_trait]
impl OtpProvider for CommandOtp {
    async fn get_otp(&self) -> Result<String, OtpError> {
        debug!(program = %self.program, "requesting OTP from command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| OtpError::Command(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(OtpError::Command(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let code = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if code.is_empty() {
            return Err(OtpError::Command(format!(
                "{} printed nothing",
                self.program
            )));
        }
        Ok(code)
    }
}

/// Registry OTPs are six digits.
pub fn is_valid_otp(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// The run-wide OTP. Only one branch refreshes it at a time.
#[derive(Debug, Default)]
pub struct OtpSession {
    code: Mutex<Option<String>>,
}

impl OtpSession {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            code: Mutex::new(initial.filter(|c| !c.is_empty())),
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.code.lock().await.clone()
    }

    /// Replace `stale` with a fresh code. When another branch already
    /// replaced it, that code is returned and the provider is not asked.
    pub async fn refresh(
        &self,
        stale: Option<&str>,
        provider: &dyn OtpProvider,
    ) -> Result<String, OtpError> {
        let mut code = self.code.lock().await;
        if let Some(current) = code.as_deref() {
            if Some(current) != stale {
                debug!("reusing OTP obtained by another task");
                return Ok(current.to_string());
            }
        }

        let fresh = provider.get_otp().await?;
        *code = Some(fresh.clone());
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OtpProvider for Counting {
        async fn get_otp(&self) -> Result<String, OtpError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(format!("{:06}", 100_000 + n))
        }
    }

    #[test]
    fn test_is_valid_otp() {
        assert!(is_valid_otp("123456"));
        assert!(!is_valid_otp("12345"));
        assert!(!is_valid_otp("12345a"));
        assert!(!is_valid_otp("1234567"));
    }

    #[test]
    fn test_command_line_parsing() {
        let cmd = CommandOtp::from_command_line("op item get npm --otp").unwrap();
        assert_eq!(cmd.program, "op");
        assert_eq!(cmd.args, vec!["item", "get", "npm", "--otp"]);
        assert!(CommandOtp::from_command_line("   ").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_prompts_once() {
        let session = Arc::new(OtpSession::new(None));
        let provider = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });

        let mut handles = Vec::new();
        for _ in 0..4 {
            let session = session.clone();
            let provider = provider.clone();
            handles.push(tokio::spawn(async move {
                session.refresh(None, provider.as_ref()).await.unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "100000");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_rejected_code() {
        let session = OtpSession::new(Some("111111".into()));
        let provider = StaticOtp("222222".into());

        assert_eq!(
            session.refresh(Some("111111"), &provider).await.unwrap(),
            "222222"
        );
        assert_eq!(session.current().await.as_deref(), Some("222222"));
    }

    #[tokio::test]
    async fn test_no_otp_is_unavailable() {
        let session = OtpSession::new(None);
        assert!(matches!(
            session.refresh(None, &NoOtp).await,
            Err(OtpError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_command_otp_trims_stdout() {
        let provider = CommandOtp::new("echo", vec!["  654321  ".into()]);
        assert_eq!(provider.get_otp().await.unwrap(), "654321");
    }
}
