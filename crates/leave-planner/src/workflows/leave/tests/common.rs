use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::leave::directory::{DirectoryService, EmployeeDraft, ProjectDraft};
use crate::workflows::leave::domain::{
    Customer, Employee, EmployeeId, LeaveFilter, LeaveId, LeaveRequest, LeaveStatus, Project,
    Role,
};
use crate::workflows::leave::memory::InMemoryStore;
use crate::workflows::leave::repository::{LeaveRepository, RepositoryError};
use crate::workflows::leave::service::LeaveWorkflowService;
use crate::workflows::leave::leave_router;

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// 2025-09-10, the day used across the workflow scenarios.
pub(super) fn scenario_day() -> NaiveDate {
    date(2025, 9, 10)
}

/// Services wired over one shared in-memory store.
pub(super) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub workflow: Arc<LeaveWorkflowService<InMemoryStore, InMemoryStore>>,
    pub directory: Arc<DirectoryService<InMemoryStore, InMemoryStore>>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::default());
        Self {
            workflow: Arc::new(LeaveWorkflowService::new(store.clone(), store.clone())),
            directory: Arc::new(DirectoryService::new(store.clone(), store.clone())),
            store,
        }
    }

    pub fn router(&self) -> Router {
        leave_router(self.workflow.clone(), self.directory.clone())
    }

    pub fn employee(&self, name: &str, role: Role) -> Employee {
        self.directory
            .register_employee(EmployeeDraft {
                name: name.to_string(),
                job_title: None,
                role: Some(role),
            })
            .expect("employee registers")
    }

    pub fn customer(&self, name: &str) -> Customer {
        self.directory
            .register_customer(name)
            .expect("customer registers")
    }

    pub fn project(&self, name: &str, start: NaiveDate, end: Option<NaiveDate>) -> Project {
        let customer = self.customer("Layer 2");
        self.directory
            .create_project(ProjectDraft {
                name: name.to_string(),
                customer_id: customer.id,
                start_date: start,
                end_date: end,
            })
            .expect("project creates")
    }

    pub fn assign(&self, project: &Project, employee: &Employee) {
        self.directory
            .assign_employee(&project.id, &employee.id)
            .expect("assignment succeeds");
    }

    /// Files a request and approves it with `approver`.
    pub fn approved_leave(&self, owner: &Employee, approver: &Employee, day: NaiveDate) -> LeaveId {
        let created = self.workflow.create(&owner.id, day).expect("create");
        self.workflow
            .approve(&created.leave.id, &approver.id)
            .expect("approve");
        created.leave.id
    }

    pub fn stored(&self, leave_id: &LeaveId) -> LeaveRequest {
        self.store
            .fetch(leave_id)
            .expect("fetch succeeds")
            .expect("leave present")
    }
}

/// The A/B scenario: both on Project P (open-ended from 2025-09-01) plus an approver.
pub(super) struct Scenario {
    pub fixture: Fixture,
    pub a: Employee,
    pub b: Employee,
    pub approver: Employee,
    pub project: Project,
}

pub(super) fn scenario() -> Scenario {
    let fixture = Fixture::new();
    let a = fixture.employee("Lily", Role::Employee);
    let b = fixture.employee("Sara", Role::Employee);
    let approver = fixture.employee("Morgan", Role::Approver);
    let project = fixture.project("Project P", date(2025, 9, 1), None);
    fixture.assign(&project, &a);
    fixture.assign(&project, &b);
    Scenario {
        fixture,
        a,
        b,
        approver,
        project,
    }
}

/// Leave repository whose backend is down.
#[derive(Default)]
pub(super) struct UnavailableLeaves;

impl UnavailableLeaves {
    fn down<T>() -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("leave store offline".to_string()))
    }
}

impl LeaveRepository for UnavailableLeaves {
    fn insert(&self, _leave: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        Self::down()
    }

    fn fetch(&self, _id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError> {
        Self::down()
    }

    fn find_by_employee_and_date(
        &self,
        _employee_id: &EmployeeId,
        _date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, RepositoryError> {
        Self::down()
    }

    fn on_date(
        &self,
        _date: NaiveDate,
        _statuses: &[LeaveStatus],
        _employees: &BTreeSet<EmployeeId>,
    ) -> Result<Vec<LeaveRequest>, RepositoryError> {
        Self::down()
    }

    fn list(&self, _filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        Self::down()
    }

    fn transition(
        &self,
        _expected: LeaveStatus,
        _updated: LeaveRequest,
    ) -> Result<LeaveRequest, RepositoryError> {
        Self::down()
    }

    fn has_leaves_for(&self, _employee_id: &EmployeeId) -> Result<bool, RepositoryError> {
        Self::down()
    }
}

/// Repository that always loses the race: the pre-check sees nothing, the insert conflicts,
/// and every transition finds the request already approved.
pub(super) struct RacingLeaves {
    inner: Arc<InMemoryStore>,
}

impl RacingLeaves {
    pub fn over(inner: Arc<InMemoryStore>) -> Self {
        Self { inner }
    }

    pub fn seed(&self, leave: LeaveRequest) -> LeaveRequest {
        self.inner.insert(leave).expect("seed insert")
    }
}

impl LeaveRepository for RacingLeaves {
    fn insert(&self, _leave: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find_by_employee_and_date(
        &self,
        _employee_id: &EmployeeId,
        _date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, RepositoryError> {
        Ok(None)
    }

    fn on_date(
        &self,
        date: NaiveDate,
        statuses: &[LeaveStatus],
        employees: &BTreeSet<EmployeeId>,
    ) -> Result<Vec<LeaveRequest>, RepositoryError> {
        self.inner.on_date(date, statuses, employees)
    }

    fn list(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        self.inner.list(filter)
    }

    fn transition(
        &self,
        _expected: LeaveStatus,
        _updated: LeaveRequest,
    ) -> Result<LeaveRequest, RepositoryError> {
        Err(RepositoryError::StatusChanged(LeaveStatus::Approved))
    }

    fn has_leaves_for(&self, employee_id: &EmployeeId) -> Result<bool, RepositoryError> {
        self.inner.has_leaves_for(employee_id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("valid json")
}

pub(super) async fn assert_error_response(response: Response, status: StatusCode, needle: &str) {
    assert_eq!(response.status(), status);
    let body = read_json_body(response).await;
    let message = body["error"].as_str().expect("error message");
    assert!(
        message.contains(needle),
        "expected `{needle}` in `{message}`"
    );
}
