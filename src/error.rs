use thiserror::Error;

/// Why the remote service rejected an otherwise-delivered request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("due-date string has invalid syntax")]
    WrongDateSyntax,
    #[error("project not found on the server")]
    ProjectNotFound,
    #[error("task not found on the server")]
    TaskNotFound,
    #[error("name must not be empty")]
    NameEmpty,
    #[error("server returned a malformed response")]
    InvalidResponse,
    #[error("unrecognized server error")]
    Unknown,
}

/// Failure raised by the persistence collaborator.
///
/// The engine treats any store failure as fatal to the in-progress pass;
/// there is no partial-pass recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("local store failure: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Everything that can abort a sync pass or a local mutation.
///
/// `RemoteUnavailable` and `RemoteRejected` surface unmodified to the caller
/// of [`crate::sync::SyncEngine::sync_all`]. `PermissionDenied` is checked
/// proactively before a gated operation, never discovered via a failed
/// remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("remote service unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("remote service rejected the request: {0}")]
    RemoteRejected(RejectReason),
    #[error(transparent)]
    LocalStore(#[from] StoreError),
    #[error("operation requires an entitlement the account does not have")]
    PermissionDenied,
}
