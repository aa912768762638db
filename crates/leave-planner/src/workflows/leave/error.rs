use axum::http::StatusCode;

use super::repository::RepositoryError;

/// Why a state-machine or uniqueness rule refused the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConflictKind {
    #[error("leave request for this employee and date already exists")]
    Duplicate,
    #[error("leave is already approved")]
    AlreadyApproved,
    #[error("leave is already rejected")]
    AlreadyRejected,
    #[error("leave has reached a terminal state and cannot change")]
    ImmutableTerminalState,
    #[error("employee already assigned to this project")]
    AlreadyAssigned,
    #[error("employee still owns leave requests")]
    EmployeeHasLeaves,
}

/// Why a resolved caller may not perform the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationDenial {
    #[error("acting employee does not exist")]
    UnknownActor,
    #[error("only approvers and admins may decide on leave")]
    InsufficientRole,
    #[error("self-approval forbidden")]
    SelfDecision,
    #[error("only approvers and admins may request leave for someone else")]
    OnBehalfForbidden,
}

/// Typed failures returned by the leave workflow and directory management.
#[derive(Debug, thiserror::Error)]
pub enum LeaveError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("caller identity could not be resolved")]
    Authentication,
    #[error("not authorized: {0}")]
    Authorization(#[from] AuthorizationDenial),
    #[error("conflict: {0}")]
    Conflict(#[from] ConflictKind),
    #[error("infrastructure failure: {0}")]
    Infrastructure(#[from] RepositoryError),
}

impl LeaveError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation(_) => StatusCode::BAD_REQUEST,
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::Authentication => StatusCode::UNAUTHORIZED,
            LeaveError::Authorization(_) => StatusCode::FORBIDDEN,
            LeaveError::Conflict(_) => StatusCode::CONFLICT,
            LeaveError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
