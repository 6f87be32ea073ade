//! Remediation Runners
//!
//! The action triggered for every alert. The listener only knows whether the
//! action could be run; what it does is opaque.

pub mod playbook;

pub use playbook::PlaybookRunner;

use async_trait::async_trait;
use std::time::Duration;

use crate::Result;

/// Result of a remediation command that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemediationOutcome {
    pub success: bool,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
}

/// Something that performs the remediation action.
///
/// An `Err` means the action could not be carried out at all and is reported
/// to the caller as a failure. A completed run is always `Ok`, whatever its
/// exit status, unless the implementation is configured otherwise.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Remediator: Send + Sync {
    /// Human readable form of the action, used in logs
    fn describe(&self) -> String;

    /// Run the action and wait for it to finish
    async fn remediate(&self) -> Result<RemediationOutcome>;
}
