use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::access::{authorize_decision, authorize_request_for, AccessPolicy};
use super::conflicts::{ConflictDetector, ConflictHint};
use super::directory::Directory;
use super::domain::{
    non_blank, Employee, EmployeeId, LeaveFilter, LeaveId, LeaveRequest, LeaveStatus, LeaveView,
};
use super::error::{AuthorizationDenial, ConflictKind, LeaveError};
use super::repository::{LeaveRepository, RepositoryError};

/// A leave request together with the advisory hints computed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub leave: LeaveRequest,
    pub conflict_hints: Vec<ConflictHint>,
}

impl LeaveOutcome {
    pub fn view(&self) -> LeaveWithConflicts {
        LeaveWithConflicts {
            leave: self.leave.view(),
            conflict_hints: self.conflict_hints.clone(),
        }
    }
}

/// Outbound shape for operations that can produce conflict hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveWithConflicts {
    pub leave: LeaveView,
    pub conflict_hints: Vec<ConflictHint>,
}

/// Service owning the leave request state machine.
pub struct LeaveWorkflowService<D, L> {
    directory: Arc<D>,
    leaves: Arc<L>,
    detector: ConflictDetector<D, L>,
    access: AccessPolicy<D>,
}

impl<D, L> LeaveWorkflowService<D, L>
where
    D: Directory + 'static,
    L: LeaveRepository + 'static,
{
    pub fn new(directory: Arc<D>, leaves: Arc<L>) -> Self {
        let detector = ConflictDetector::new(directory.clone(), leaves.clone());
        let access = AccessPolicy::new(directory.clone());
        Self {
            directory,
            leaves,
            detector,
            access,
        }
    }

    pub fn access(&self) -> &AccessPolicy<D> {
        &self.access
    }

    /// File a request for `requester` on `date`.
    ///
    /// Hints only count co-assignees' approved leave and are gathered before the single insert,
    /// so a failed read leaves nothing behind.
    pub fn create(
        &self,
        requester: &EmployeeId,
        date: NaiveDate,
    ) -> Result<LeaveOutcome, LeaveError> {
        if self.directory.employee(requester)?.is_none() {
            return Err(LeaveError::validation("employee does not exist"));
        }
        if self
            .leaves
            .find_by_employee_and_date(requester, date)?
            .is_some()
        {
            return Err(ConflictKind::Duplicate.into());
        }

        let conflict_hints = self.detector.compute_hints(requester, date, false)?;

        let leave = match self.leaves.insert(LeaveRequest::requested(*requester, date)) {
            Ok(leave) => leave,
            Err(RepositoryError::Conflict) => {
                warn!(employee_id = %requester, %date, "concurrent duplicate leave request lost");
                return Err(ConflictKind::Duplicate.into());
            }
            Err(RepositoryError::NotFound) => {
                warn!(employee_id = %requester, "employee removed while filing leave");
                return Err(LeaveError::validation("employee does not exist"));
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            leave_id = %leave.id,
            employee_id = %requester,
            %date,
            hints = conflict_hints.len(),
            "leave requested"
        );
        Ok(LeaveOutcome {
            leave,
            conflict_hints,
        })
    }

    /// File a request on behalf of `requester`; only approvers and admins may file for others.
    pub fn create_for(
        &self,
        caller: &Employee,
        requester: &EmployeeId,
        date: NaiveDate,
    ) -> Result<LeaveOutcome, LeaveError> {
        authorize_request_for(caller.role, caller.id == *requester).into_result()?;
        self.create(requester, date)
    }

    /// Approve a pending request. Hints include co-assignees' pending requests and describe the
    /// world before this approval is applied.
    pub fn approve(
        &self,
        leave_id: &LeaveId,
        acting: &EmployeeId,
    ) -> Result<LeaveOutcome, LeaveError> {
        let (actor, leave) = self.authorized_target(leave_id, acting)?;
        ensure_pending(LeaveStatus::Approved, leave.status)?;

        let conflict_hints = self
            .detector
            .compute_hints(&leave.employee_id, leave.date, true)?;

        let decided = leave.decided(LeaveStatus::Approved, actor.id, None);
        let leave = self.commit(LeaveStatus::Approved, decided)?;

        info!(
            leave_id = %leave.id,
            decided_by = %actor.id,
            hints = conflict_hints.len(),
            "leave approved"
        );
        Ok(LeaveOutcome {
            leave,
            conflict_hints,
        })
    }

    /// Reject a pending request. Blank comments are stored as absent.
    pub fn reject(
        &self,
        leave_id: &LeaveId,
        acting: &EmployeeId,
        comment: Option<&str>,
    ) -> Result<LeaveRequest, LeaveError> {
        let (actor, leave) = self.authorized_target(leave_id, acting)?;
        ensure_pending(LeaveStatus::Rejected, leave.status)?;

        let decided = leave.decided(LeaveStatus::Rejected, actor.id, non_blank(comment));
        let leave = self.commit(LeaveStatus::Rejected, decided)?;

        info!(leave_id = %leave.id, decided_by = %actor.id, "leave rejected");
        Ok(leave)
    }

    /// Leaves matching the filter, ordered by date then id.
    pub fn list(&self, filter: LeaveFilter) -> Result<Vec<LeaveRequest>, LeaveError> {
        let mut leaves = self.leaves.list(&filter)?;
        leaves.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(leaves)
    }

    pub fn get(&self, leave_id: &LeaveId) -> Result<LeaveRequest, LeaveError> {
        self.leaves
            .fetch(leave_id)?
            .ok_or(LeaveError::NotFound("leave"))
    }

    /// On-demand hints for a prospective request; nothing is stored.
    pub fn preview_conflicts(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
        include_requested: bool,
    ) -> Result<Vec<ConflictHint>, LeaveError> {
        if self.directory.employee(employee_id)?.is_none() {
            return Err(LeaveError::validation("employee does not exist"));
        }
        Ok(self
            .detector
            .compute_hints(employee_id, date, include_requested)?)
    }

    /// Actor exists and may decide, then the target exists, then it is not the actor's own.
    fn authorized_target(
        &self,
        leave_id: &LeaveId,
        acting: &EmployeeId,
    ) -> Result<(Employee, LeaveRequest), LeaveError> {
        let actor = self
            .directory
            .employee(acting)?
            .ok_or(AuthorizationDenial::UnknownActor)?;
        // Role only; ownership needs the target.
        authorize_decision(actor.role, false).into_result()?;

        let leave = self.get(leave_id)?;
        authorize_decision(actor.role, actor.id == leave.employee_id).into_result()?;
        Ok((actor, leave))
    }

    fn commit(&self, target: LeaveStatus, decided: LeaveRequest) -> Result<LeaveRequest, LeaveError> {
        match self.leaves.transition(LeaveStatus::Requested, decided) {
            Ok(leave) => Ok(leave),
            Err(RepositoryError::StatusChanged(current)) => {
                warn!(
                    current = current.label(),
                    target = target.label(),
                    "concurrent leave decision lost"
                );
                let kind = ensure_pending(target, current)
                    .err()
                    .unwrap_or(ConflictKind::ImmutableTerminalState);
                Err(kind.into())
            }
            Err(RepositoryError::NotFound) => Err(LeaveError::NotFound("leave")),
            Err(other) => Err(other.into()),
        }
    }
}

/// Only `Requested` may move; repeating a decision and reversing one are reported differently.
fn ensure_pending(target: LeaveStatus, current: LeaveStatus) -> Result<(), ConflictKind> {
    match (target, current) {
        (_, LeaveStatus::Requested) => Ok(()),
        (LeaveStatus::Approved, LeaveStatus::Approved) => Err(ConflictKind::AlreadyApproved),
        (LeaveStatus::Rejected, LeaveStatus::Rejected) => Err(ConflictKind::AlreadyRejected),
        _ => Err(ConflictKind::ImmutableTerminalState),
    }
}
