//! Interactive OTP entry.

use std::io::IsTerminal;
use std::sync::Arc;

use async_trait::async_trait;
use dialoguer::{theme::ColorfulTheme, Input};
use sunset_core::otp::{is_valid_otp, CommandOtp, NoOtp, OtpError, OtpProvider};

/// Asks on the terminal. Runs off the async workers since the prompt blocks.
pub struct PromptOtp;

#[async_trait]
impl OtpProvider for PromptOtp {
    async fn get_otp(&self) -> Result<String, OtpError> {
        tokio::task::spawn_blocking(|| {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt("Enter OTP code")
                .validate_with(|code: &String| -> Result<(), &str> {
                    if is_valid_otp(code.trim()) {
                        Ok(())
                    } else {
                        Err("expected a 6-digit code")
                    }
                })
                .interact_text()
                .map(|code| code.trim().to_string())
                .map_err(|e| OtpError::Prompt(e.to_string()))
        })
        .await
        .map_err(|e| OtpError::Prompt(e.to_string()))?
    }
}

/// `SUNSET_OTP_COMMAND` first, then a terminal prompt when one is available.
pub fn otp_provider() -> Arc<dyn OtpProvider> {
    if let Some(command) = CommandOtp::from_env() {
        return Arc::new(command);
    }
    if std::io::stdin().is_terminal() {
        Arc::new(PromptOtp)
    } else {
        Arc::new(NoOtp)
    }
}
