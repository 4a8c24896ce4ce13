//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use super::source::SourceConfig;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("source.host is required")]
    MissingHost,
    #[error("source.port must be non-zero")]
    ZeroPort,
    #[error("source.password is required for the ssh and serverquery backends")]
    MissingPassword,
    #[error("source.base_url must start with http:// or https://, got '{0}'")]
    InvalidBaseUrl(String),
    #[error("source.api_key is required for the webquery backend")]
    MissingApiKey,
    #[error("source.timeout_ms must be greater than zero")]
    ZeroTimeout,
    #[error("source.path does not exist: {0}")]
    FileNotFound(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match &config.source {
        SourceConfig::Ssh(ssh) => {
            if ssh.host.trim().is_empty() {
                errors.push(ValidationError::MissingHost);
            }
            if ssh.port == 0 {
                errors.push(ValidationError::ZeroPort);
            }
            if ssh.password.is_empty() {
                errors.push(ValidationError::MissingPassword);
            }
            if ssh.timeout_ms == 0 {
                errors.push(ValidationError::ZeroTimeout);
            }
        }
        SourceConfig::ServerQuery(sq) => {
            if sq.host.trim().is_empty() {
                errors.push(ValidationError::MissingHost);
            }
            if sq.port == 0 {
                errors.push(ValidationError::ZeroPort);
            }
            if sq.password.is_empty() {
                errors.push(ValidationError::MissingPassword);
            }
            if sq.timeout_ms == 0 {
                errors.push(ValidationError::ZeroTimeout);
            }
        }
        SourceConfig::WebQuery(wq) => {
            if !(wq.base_url.starts_with("http://") || wq.base_url.starts_with("https://")) {
                errors.push(ValidationError::InvalidBaseUrl(wq.base_url.clone()));
            }
            if wq.api_key.is_empty() {
                errors.push(ValidationError::MissingApiKey);
            }
            if wq.timeout_ms == 0 {
                errors.push(ValidationError::ZeroTimeout);
            }
        }
        SourceConfig::File(file) => {
            if !file.path.exists() {
                errors.push(ValidationError::FileNotFound(
                    file.path.display().to_string(),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
