//! Single-day leave workflow: directory lookups, conflict hints, access policy, and the
//! request state machine (`Requested` -> `Approved` | `Rejected`).

pub mod access;
pub mod conflicts;
pub mod directory;
pub mod domain;
mod error;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use access::{authorize_decision, authorize_request_for, AccessDecision, AccessPolicy};
pub use conflicts::{ConflictDetector, ConflictEmployee, ConflictHint};
pub use directory::{
    AssignmentView, CoAssignee, Directory, DirectoryService, DirectoryStore, EmployeeDraft,
    ProjectDraft,
};
pub use domain::{
    Customer, CustomerId, Employee, EmployeeId, LeaveDecision, LeaveFilter, LeaveId,
    LeaveRequest, LeaveStatus, LeaveView, Project, ProjectAssignment, ProjectId, Role,
};
pub use error::{AuthorizationDenial, ConflictKind, LeaveError};
pub use memory::InMemoryStore;
pub use repository::{LeaveRepository, RepositoryError};
pub use router::{leave_router, CALLER_HEADER};
pub use service::{LeaveOutcome, LeaveWithConflicts, LeaveWorkflowService};
