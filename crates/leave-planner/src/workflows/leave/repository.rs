use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::domain::{EmployeeId, LeaveFilter, LeaveId, LeaveRequest, LeaveStatus};

/// Storage abstraction for leave requests.
///
/// Implementations own the correctness of concurrent writes: `insert` must reject a second
/// request for the same (employee, date) atomically, and `transition` must only apply when the
/// stored status still equals `expected`.
pub trait LeaveRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when (employee, date) is already taken. Stores
    /// that also hold the directory fail with [`RepositoryError::NotFound`] for an unknown owner.
    fn insert(&self, leave: LeaveRequest) -> Result<LeaveRequest, RepositoryError>;

    fn fetch(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError>;

    fn find_by_employee_and_date(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, RepositoryError>;

    /// Leaves on `date` whose status is in `statuses` and whose owner is in `employees`.
    fn on_date(
        &self,
        date: NaiveDate,
        statuses: &[LeaveStatus],
        employees: &BTreeSet<EmployeeId>,
    ) -> Result<Vec<LeaveRequest>, RepositoryError>;

    fn list(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, RepositoryError>;

    /// Compare-and-set on status. Fails with [`RepositoryError::StatusChanged`] carrying the
    /// stored status when it no longer equals `expected`.
    fn transition(
        &self,
        expected: LeaveStatus,
        updated: LeaveRequest,
    ) -> Result<LeaveRequest, RepositoryError>;

    /// Whether any leave request references the employee.
    fn has_leaves_for(&self, employee_id: &EmployeeId) -> Result<bool, RepositoryError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record is still referenced")]
    InUse,
    #[error("record status changed concurrently to {}", .0.label())]
    StatusChanged(LeaveStatus),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
