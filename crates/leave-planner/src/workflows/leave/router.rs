use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::directory::{DirectoryService, DirectoryStore, EmployeeDraft, ProjectDraft};
use super::domain::{EmployeeId, LeaveFilter, LeaveId, LeaveRequest, LeaveView, ProjectId};
use super::error::LeaveError;
use super::repository::LeaveRepository;
use super::service::LeaveWorkflowService;

/// Header carrying the caller's employee id.
pub const CALLER_HEADER: &str = "x-employee-id";

pub struct RouterState<D, L> {
    pub workflow: Arc<LeaveWorkflowService<D, L>>,
    pub directory: Arc<DirectoryService<D, L>>,
}

impl<D, L> Clone for RouterState<D, L> {
    fn clone(&self) -> Self {
        Self {
            workflow: self.workflow.clone(),
            directory: self.directory.clone(),
        }
    }
}

/// Router builder exposing the leave workflow and directory management over HTTP.
pub fn leave_router<D, L>(
    workflow: Arc<LeaveWorkflowService<D, L>>,
    directory: Arc<DirectoryService<D, L>>,
) -> Router
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    Router::new()
        .route(
            "/api/leaves",
            get(list_leaves_handler::<D, L>).post(create_leave_handler::<D, L>),
        )
        .route(
            "/api/leaves/conflicts",
            get(conflicts_handler::<D, L>),
        )
        .route("/api/leaves/:leave_id", get(get_leave_handler::<D, L>))
        .route(
            "/api/leaves/:leave_id/approve",
            post(approve_handler::<D, L>),
        )
        .route(
            "/api/leaves/:leave_id/reject",
            post(reject_handler::<D, L>),
        )
        .route(
            "/api/employees",
            get(list_employees_handler::<D, L>).post(register_employee_handler::<D, L>),
        )
        .route(
            "/api/employees/:employee_id",
            get(get_employee_handler::<D, L>)
                .put(update_employee_handler::<D, L>)
                .delete(remove_employee_handler::<D, L>),
        )
        .route(
            "/api/customers",
            get(list_customers_handler::<D, L>).post(register_customer_handler::<D, L>),
        )
        .route(
            "/api/projects",
            get(list_projects_handler::<D, L>).post(create_project_handler::<D, L>),
        )
        .route(
            "/api/projects/:project_id",
            get(get_project_handler::<D, L>)
                .put(update_project_handler::<D, L>)
                .delete(remove_project_handler::<D, L>),
        )
        .route(
            "/api/projects/:project_id/assignments",
            get(list_assignments_handler::<D, L>).post(assign_employee_handler::<D, L>),
        )
        .with_state(RouterState {
            workflow,
            directory,
        })
}

pub(crate) fn error_response(err: LeaveError) -> Response {
    let status = err.status_code();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "leave workflow infrastructure failure");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn caller_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LeaveQuery {
    employee_id: Option<EmployeeId>,
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConflictQuery {
    employee_id: EmployeeId,
    date: NaiveDate,
    #[serde(default)]
    include_requested: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLeaveBody {
    pub(crate) employee_id: EmployeeId,
    pub(crate) date: NaiveDate,
}

/// Reject accepts either `{"comment": "..."}` or a bare JSON string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RejectBody {
    Text(String),
    Payload {
        #[serde(default)]
        comment: Option<String>,
    },
}

impl RejectBody {
    fn comment(&self) -> Option<&str> {
        match self {
            RejectBody::Text(text) => Some(text),
            RejectBody::Payload { comment } => comment.as_deref(),
        }
    }
}

/// An empty body carries no comment; anything else must parse.
fn parse_reject_body(raw: &[u8]) -> Result<Option<RejectBody>, LeaveError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(raw)
        .map(Some)
        .map_err(|err| LeaveError::validation(format!("invalid reject body: {err}")))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerBody {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignBody {
    employee_id: EmployeeId,
}

fn leave_views(leaves: Vec<LeaveRequest>) -> Vec<LeaveView> {
    leaves.iter().map(LeaveRequest::view).collect()
}

pub(crate) async fn list_leaves_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Query(query): Query<LeaveQuery>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    let filter = LeaveFilter {
        employee_id: query.employee_id,
        date: query.date,
    };
    match state.workflow.list(filter) {
        Ok(leaves) => (StatusCode::OK, Json(leave_views(leaves))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_leave_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Path(leave_id): Path<LeaveId>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.workflow.get(&leave_id) {
        Ok(leave) => (StatusCode::OK, Json(leave.view())).into_response(),
        Err(err) => error_response(err),
    }
}

/// Every filing needs a caller; filing for someone else requires an approver or admin.
pub(crate) async fn create_leave_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    headers: HeaderMap,
    Json(body): Json<CreateLeaveBody>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    let outcome = state
        .workflow
        .access()
        .authenticate(caller_token(&headers))
        .and_then(|caller| {
            state
                .workflow
                .create_for(&caller, &body.employee_id, body.date)
        });

    match outcome {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approve_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    headers: HeaderMap,
    Path(leave_id): Path<LeaveId>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    let outcome = state
        .workflow
        .access()
        .authenticate(caller_token(&headers))
        .and_then(|caller| state.workflow.approve(&leave_id, &caller.id));

    match outcome {
        Ok(outcome) => (StatusCode::OK, Json(outcome.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reject_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    headers: HeaderMap,
    Path(leave_id): Path<LeaveId>,
    body: Bytes,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    let outcome = state
        .workflow
        .access()
        .authenticate(caller_token(&headers))
        .and_then(|caller| {
            let body = parse_reject_body(&body)?;
            let comment = body.as_ref().and_then(RejectBody::comment);
            state.workflow.reject(&leave_id, &caller.id, comment)
        });

    match outcome {
        Ok(leave) => (StatusCode::OK, Json(leave.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn conflicts_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Query(query): Query<ConflictQuery>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state
        .workflow
        .preview_conflicts(&query.employee_id, query.date, query.include_requested)
    {
        Ok(hints) => (StatusCode::OK, Json(hints)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_employees_handler<D, L>(
    State(state): State<RouterState<D, L>>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.employees() {
        Ok(employees) => (StatusCode::OK, Json(employees)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn register_employee_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Json(draft): Json<EmployeeDraft>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.register_employee(draft) {
        Ok(employee) => (StatusCode::CREATED, Json(employee)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_employee_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Path(employee_id): Path<EmployeeId>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.employee(&employee_id) {
        Ok(employee) => (StatusCode::OK, Json(employee)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_employee_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Path(employee_id): Path<EmployeeId>,
    Json(draft): Json<EmployeeDraft>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.update_employee(&employee_id, draft) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn remove_employee_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Path(employee_id): Path<EmployeeId>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.remove_employee(&employee_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_customers_handler<D, L>(
    State(state): State<RouterState<D, L>>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.customers() {
        Ok(customers) => (StatusCode::OK, Json(customers)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn register_customer_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Json(body): Json<CustomerBody>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.register_customer(&body.name) {
        Ok(customer) => (StatusCode::CREATED, Json(customer)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_projects_handler<D, L>(
    State(state): State<RouterState<D, L>>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.projects() {
        Ok(projects) => (StatusCode::OK, Json(projects)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_project_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Json(draft): Json<ProjectDraft>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.create_project(draft) {
        Ok(project) => (StatusCode::CREATED, Json(project)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_project_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Path(project_id): Path<ProjectId>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.project(&project_id) {
        Ok(project) => (StatusCode::OK, Json(project)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_project_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Path(project_id): Path<ProjectId>,
    Json(draft): Json<ProjectDraft>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.update_project(&project_id, draft) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn remove_project_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Path(project_id): Path<ProjectId>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.remove_project(&project_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_assignments_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Path(project_id): Path<ProjectId>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state.directory.assignments(&project_id) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assign_employee_handler<D, L>(
    State(state): State<RouterState<D, L>>,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<AssignBody>,
) -> Response
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    match state
        .directory
        .assign_employee(&project_id, &body.employee_id)
    {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}
