//! Service error taxonomy shared by every use-case entry point.

use crate::reorder::{ReorderError, ReorderOp};
use crate::store::{StoreError, WriteAck};
use thiserror::Error;
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from project, item and element operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Target project, item or element does not exist.
    #[error("parent not found: {0}")]
    ParentNotFound(Uuid),
    /// Position argument rejected by the reorder engine.
    #[error("{operation} position {position} is out of range for {len} siblings")]
    IndexOutOfRange {
        operation: ReorderOp,
        position: i64,
        len: usize,
    },
    /// Another project already uses this name (case-insensitive).
    #[error("project name already exists: {0}")]
    NameConflict(String),
    /// Project ceiling reached.
    #[error("project limit of {limit} reached")]
    CapacityExceeded { limit: usize },
    /// Removing the member reference did not confirm exactly one document.
    #[error("pull of {member} was not confirmed ({ack}); siblings must be re-read")]
    PullFailed { member: Uuid, ack: WriteAck },
    /// Re-inserting the member reference did not confirm exactly one document.
    #[error("push of {member} was not confirmed ({ack}); siblings must be re-read")]
    PushFailed { member: Uuid, ack: WriteAck },
    /// Caller input rejected before any write.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Store-level failure.
    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    /// Stable snake_case tag for transport layers and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ParentNotFound(_) => "parent_not_found",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::NameConflict(_) => "name_conflict",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::PullFailed { .. } => "pull_failed",
            Self::PushFailed { .. } => "push_failed",
            Self::Validation(_) => "validation_error",
            Self::Store(_) => "store_error",
        }
    }

    /// Returns whether the sibling list may already be partially modified.
    pub fn requires_reread(&self) -> bool {
        matches!(self, Self::PullFailed { .. } | Self::PushFailed { .. })
    }
}

impl From<ReorderError> for ServiceError {
    fn from(value: ReorderError) -> Self {
        match value {
            ReorderError::IndexOutOfRange {
                operation,
                position,
                len,
            } => Self::IndexOutOfRange {
                operation,
                position,
                len,
            },
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::ParentMissing(parent) => Self::ParentNotFound(parent),
            StoreError::PullUnconfirmed { member, ack } => Self::PullFailed { member, ack },
            StoreError::PushUnconfirmed { member, ack } => Self::PushFailed { member, ack },
            other => Self::Store(other),
        }
    }
}
