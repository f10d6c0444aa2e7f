/// Outcomes that end a command early without being failures of the engine
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CliError {
    /// The user backed out of a prompt
    #[error("{0}")]
    Cancelled(String),

    #[error("No remote server configured. Run `project-versioner remote setup` first")]
    RemoteNotConfigured,

    #[error("{0}")]
    InvalidInput(String),
}

impl CliError {
    pub fn cancelled(message: impl Into<String>) -> anyhow::Error {
        CliError::Cancelled(message.into()).into()
    }
}

/// True when `err` is a user cancellation rather than a failure.
pub fn is_cancellation(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<CliError>(), Some(CliError::Cancelled(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_cancellation_survives_context() {
        let err: anyhow::Result<()> = Err(CliError::cancelled("Snapshot cancelled"));
        let err = err.context("Snapshot failed").unwrap_err();
        assert!(is_cancellation(&err));

        let other = anyhow::anyhow!("disk full");
        assert!(!is_cancellation(&other));
    }
}
