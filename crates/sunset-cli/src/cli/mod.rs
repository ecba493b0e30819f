pub mod args;
pub mod commands;
pub mod helpers;
pub mod otp_prompt;
