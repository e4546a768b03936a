/// Error taxonomy for the metric pipeline and the dashboard

use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    /// The operator quit the view. Treated as success by every caller.
    #[error("canceled by user")]
    CanceledByUser,

    /// The shared context was cancelled because another task finished first.
    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid pid: {0} does not exist")]
    InvalidPid(u32),

    #[error("invalid container: {0} does not exist")]
    InvalidContainer(String),

    #[error("metrics provider failed: {0}")]
    Provider(String),

    #[error("docker: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("terminal: {0}")]
    Terminal(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("task failed: {0}")]
    Task(String),
}

impl DashError {
    /// True for the two outcomes that are not failures of the view itself.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DashError::CanceledByUser | DashError::Cancelled)
    }
}

/// Failure of a single lifecycle action. Local to the action dialog.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("no such container: {0}")]
    NotFound(String),

    #[error("no such process: {0}")]
    NoSuchProcess(u32),

    #[error("action timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("{0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_classification() {
        assert!(DashError::CanceledByUser.is_cancellation());
        assert!(DashError::Cancelled.is_cancellation());
        assert!(!DashError::InvalidPid(7).is_cancellation());
        assert!(!DashError::Provider("boom".into()).is_cancellation());
    }

    #[test]
    fn test_action_error_messages() {
        assert_eq!(
            ActionError::NotFound("abc123".into()).to_string(),
            "no such container: abc123"
        );
        assert_eq!(
            ActionError::Timeout(Duration::from_millis(1500)).to_string(),
            "action timed out after 1500ms"
        );
        assert_eq!(ActionError::Failed("no such container".into()).to_string(), "no such container");
    }
}
