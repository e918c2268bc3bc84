//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("executor.command cannot be empty")]
    EmptyCommand,

    #[error("executor.command[{index}] cannot be blank")]
    BlankArgument { index: usize },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("executor.env: invalid variable name '{0}'")]
    InvalidEnvName(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let command = &config.executor.command;
    if command.is_empty() {
        errors.push(ValidationError::EmptyCommand);
    }
    for (index, arg) in command.iter().enumerate() {
        if arg.trim().is_empty() {
            errors.push(ValidationError::BlankArgument { index });
        }
    }

    if config.executor.timeout_seconds == Some(0) {
        errors.push(ValidationError::NotPositive {
            field: "executor.timeout_seconds",
        });
    }

    for name in config.executor.env.keys() {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            errors.push(ValidationError::InvalidEnvName(name.clone()));
        }
    }

    if config.limits.requests_per_second == Some(0) {
        errors.push(ValidationError::NotPositive {
            field: "limits.requests_per_second",
        });
    }

    errors
}
