//! Per-event processing results.

use thiserror::Error;

/// Result of processing a single configuration event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Event applied successfully.
    Success,
    /// Event carried invalid data and was dropped.
    InvalidEntry,
    /// Event failed; the operation did not take effect.
    Failed,
    /// Event was intentionally not applied (e.g. a rejected rule); the
    /// event is consumed, nothing reached the forwarding plane.
    Ignore,
}

impl TaskStatus {
    /// Returns true if the event is consumed without error.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Ignore)
    }

    /// Returns true if the event failed and must be surfaced to the
    /// configuration source.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::InvalidEntry | TaskStatus::Failed)
    }
}

/// Error type for event processing failures.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// Event carried invalid data.
    #[error("invalid entry: {message}")]
    InvalidEntry { message: String },

    /// Programming the forwarding plane failed.
    #[error("programming failed: {message}")]
    Programming { message: String },

    /// Event was intentionally ignored.
    #[error("ignored: {reason}")]
    Ignored { reason: String },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl TaskError {
    pub fn invalid_entry(message: impl Into<String>) -> Self {
        TaskError::InvalidEntry {
            message: message.into(),
        }
    }

    pub fn programming(message: impl Into<String>) -> Self {
        TaskError::Programming {
            message: message.into(),
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        TaskError::Ignored {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TaskError::Internal {
            message: message.into(),
        }
    }

    /// Converts this error to a [`TaskStatus`].
    pub fn to_status(&self) -> TaskStatus {
        match self {
            TaskError::InvalidEntry { .. } => TaskStatus::InvalidEntry,
            TaskError::Programming { .. } | TaskError::Internal { .. } => TaskStatus::Failed,
            TaskError::Ignored { .. } => TaskStatus::Ignore,
        }
    }
}

/// Result type for event processing.
pub type TaskResult<T> = Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(TaskStatus::Success.is_success());
        assert!(TaskStatus::Ignore.is_success());
        assert!(TaskStatus::Failed.is_failure());
        assert!(TaskStatus::InvalidEntry.is_failure());
        assert!(!TaskStatus::Success.is_failure());
    }

    #[test]
    fn test_error_to_status() {
        assert_eq!(
            TaskError::invalid_entry("x").to_status(),
            TaskStatus::InvalidEntry
        );
        assert_eq!(TaskError::programming("x").to_status(), TaskStatus::Failed);
        assert_eq!(TaskError::ignored("x").to_status(), TaskStatus::Ignore);
    }
}
