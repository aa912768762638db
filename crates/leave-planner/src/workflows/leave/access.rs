use std::sync::Arc;

use super::directory::Directory;
use super::domain::{Employee, EmployeeId, Role};
use super::error::{AuthorizationDenial, LeaveError};
use super::repository::RepositoryError;

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied(AuthorizationDenial),
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    pub fn into_result(self) -> Result<(), AuthorizationDenial> {
        match self {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied(reason) => Err(reason),
        }
    }
}

/// May an actor with `role` approve or reject a request? Role is checked before ownership.
pub fn authorize_decision(role: Role, is_self: bool) -> AccessDecision {
    if !role.may_decide() {
        AccessDecision::Denied(AuthorizationDenial::InsufficientRole)
    } else if is_self {
        AccessDecision::Denied(AuthorizationDenial::SelfDecision)
    } else {
        AccessDecision::Allowed
    }
}

/// Employees file their own leave; approvers and admins may file for anyone.
pub fn authorize_request_for(role: Role, is_self: bool) -> AccessDecision {
    if is_self || role.may_decide() {
        AccessDecision::Allowed
    } else {
        AccessDecision::Denied(AuthorizationDenial::OnBehalfForbidden)
    }
}

/// Resolves opaque caller identities (employee ids) against the directory.
pub struct AccessPolicy<D> {
    directory: Arc<D>,
}

impl<D> AccessPolicy<D>
where
    D: Directory + 'static,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// `None` when the token is not an employee id or names nobody.
    pub fn resolve_caller(&self, token: &str) -> Result<Option<Employee>, RepositoryError> {
        match token.parse::<EmployeeId>() {
            Ok(id) => self.directory.employee(&id),
            Err(_) => Ok(None),
        }
    }

    /// Like [`Self::resolve_caller`] but reports a missing or unknown identity as
    /// [`LeaveError::Authentication`].
    pub fn authenticate(&self, token: Option<&str>) -> Result<Employee, LeaveError> {
        let token = token.ok_or(LeaveError::Authentication)?;
        self.resolve_caller(token)?
            .ok_or(LeaveError::Authentication)
    }
}
