pub mod config;
pub mod metrics;
pub mod remediation;
pub mod server;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("{program} exited with {status}")]
    NonZeroExit { program: String, status: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_names_the_program() {
        let err = Error::Spawn {
            program: "ansible-playbook".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to run ansible-playbook: No such file or directory"
        );
    }

    #[test]
    fn timeout_error_reports_duration() {
        let err = Error::Timeout {
            program: "sh".to_string(),
            timeout: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "sh did not finish within 2s");
    }
}
