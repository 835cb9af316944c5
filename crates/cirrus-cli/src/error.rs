use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] cirrus_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Outbox(#[from] cirrus_outbox::OutboxError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// 2 for usage and validation problems, 1 for runtime failures.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Outbox(_) | Self::Serialization(_) | Self::Io(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_exit_two_and_runtime_errors_exit_one() {
        let usage = CliError::Validation(cirrus_core::ValidationError::EmptyLocationName);
        assert_eq!(usage.exit_code(), 2);

        let runtime = CliError::Outbox(cirrus_outbox::OutboxError::ConnectionError(
            String::from("unable to open database file"),
        ));
        assert_eq!(runtime.exit_code(), 1);
    }
}
