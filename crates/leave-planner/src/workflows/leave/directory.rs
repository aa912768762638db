use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    non_blank, Customer, CustomerId, Employee, EmployeeId, Project, ProjectAssignment, ProjectId,
    Role, MAX_NAME_LEN,
};
use super::error::{ConflictKind, LeaveError};
use super::repository::{LeaveRepository, RepositoryError};

/// One (project, other employee) pairing returned by [`Directory::co_assignees`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoAssignee {
    pub project_id: ProjectId,
    pub project_name: String,
    pub employee_id: EmployeeId,
    pub employee_name: String,
}

/// Narrow read contract the workflow, conflict detector, and access policy depend on.
pub trait Directory: Send + Sync {
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;

    /// Projects the employee is assigned to whose window covers `date`.
    fn active_projects_for(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<BTreeSet<ProjectId>, RepositoryError>;

    /// Every other employee assigned to any of `project_ids`.
    fn co_assignees(
        &self,
        project_ids: &BTreeSet<ProjectId>,
        excluding: &EmployeeId,
    ) -> Result<Vec<CoAssignee>, RepositoryError>;
}

/// Write side of the directory. Assignment uniqueness is the store's responsibility.
pub trait DirectoryStore: Directory {
    fn employees(&self) -> Result<Vec<Employee>, RepositoryError>;
    fn insert_employee(&self, employee: Employee) -> Result<Employee, RepositoryError>;
    fn update_employee(&self, employee: Employee) -> Result<Employee, RepositoryError>;
    /// Removes the employee together with their project assignments. Fails with
    /// [`RepositoryError::InUse`] when a leave request still references them; stores that also
    /// hold leaves make the check and the removal one step.
    fn remove_employee_if_no_leaves(&self, id: &EmployeeId) -> Result<(), RepositoryError>;

    fn customer(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;
    fn customers(&self) -> Result<Vec<Customer>, RepositoryError>;
    fn insert_customer(&self, customer: Customer) -> Result<Customer, RepositoryError>;

    fn project(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError>;
    fn projects(&self) -> Result<Vec<Project>, RepositoryError>;
    fn insert_project(&self, project: Project) -> Result<Project, RepositoryError>;
    fn update_project(&self, project: Project) -> Result<Project, RepositoryError>;
    /// Removes the project together with its assignments.
    fn remove_project(&self, id: &ProjectId) -> Result<(), RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the pair already exists.
    fn assign(&self, assignment: ProjectAssignment) -> Result<ProjectAssignment, RepositoryError>;
    fn assignments_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ProjectAssignment>, RepositoryError>;
}

/// Input for registering or updating an employee.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDraft {
    pub name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Input for creating or updating a project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub name: String,
    pub customer_id: CustomerId,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Assignment listing row with the employee's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub employee_id: EmployeeId,
    pub employee_name: String,
}

/// Validated management operations over employees, customers, projects, and assignments.
pub struct DirectoryService<D, L> {
    store: Arc<D>,
    leaves: Arc<L>,
}

impl<D, L> DirectoryService<D, L>
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    pub fn new(store: Arc<D>, leaves: Arc<L>) -> Self {
        Self { store, leaves }
    }

    pub fn register_employee(&self, draft: EmployeeDraft) -> Result<Employee, LeaveError> {
        let employee = Employee {
            id: EmployeeId::new(),
            name: required_name(&draft.name)?,
            job_title: non_blank(draft.job_title.as_deref()),
            role: draft.role.unwrap_or_default(),
        };
        let stored = self.store.insert_employee(employee)?;
        info!(employee_id = %stored.id, role = stored.role.label(), "employee registered");
        Ok(stored)
    }

    pub fn update_employee(
        &self,
        id: &EmployeeId,
        draft: EmployeeDraft,
    ) -> Result<Employee, LeaveError> {
        let current = self.employee(id)?;
        let updated = Employee {
            id: current.id,
            name: required_name(&draft.name)?,
            job_title: non_blank(draft.job_title.as_deref()),
            role: draft.role.unwrap_or(current.role),
        };
        Ok(self.store.update_employee(updated)?)
    }

    pub fn remove_employee(&self, id: &EmployeeId) -> Result<(), LeaveError> {
        self.employee(id)?;
        if self.leaves.has_leaves_for(id)? {
            return Err(ConflictKind::EmployeeHasLeaves.into());
        }
        match self.store.remove_employee_if_no_leaves(id) {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(LeaveError::NotFound("employee")),
            Err(RepositoryError::InUse) => Err(ConflictKind::EmployeeHasLeaves.into()),
            Err(other) => Err(other.into()),
        }
    }

    pub fn employee(&self, id: &EmployeeId) -> Result<Employee, LeaveError> {
        self.store
            .employee(id)?
            .ok_or(LeaveError::NotFound("employee"))
    }

    pub fn employees(&self) -> Result<Vec<Employee>, LeaveError> {
        let mut employees = self.store.employees()?;
        employees.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(employees)
    }

    pub fn register_customer(&self, name: &str) -> Result<Customer, LeaveError> {
        let customer = Customer {
            id: CustomerId::new(),
            name: required_name(name)?,
        };
        Ok(self.store.insert_customer(customer)?)
    }

    pub fn customers(&self) -> Result<Vec<Customer>, LeaveError> {
        let mut customers = self.store.customers()?;
        customers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(customers)
    }

    pub fn create_project(&self, draft: ProjectDraft) -> Result<Project, LeaveError> {
        let project = self.validated_project(ProjectId::new(), draft)?;
        let stored = self.store.insert_project(project)?;
        info!(project_id = %stored.id, "project created");
        Ok(stored)
    }

    pub fn update_project(&self, id: &ProjectId, draft: ProjectDraft) -> Result<Project, LeaveError> {
        self.project(id)?;
        let project = self.validated_project(*id, draft)?;
        Ok(self.store.update_project(project)?)
    }

    pub fn remove_project(&self, id: &ProjectId) -> Result<(), LeaveError> {
        match self.store.remove_project(id) {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(LeaveError::NotFound("project")),
            Err(other) => Err(other.into()),
        }
    }

    pub fn project(&self, id: &ProjectId) -> Result<Project, LeaveError> {
        self.store
            .project(id)?
            .ok_or(LeaveError::NotFound("project"))
    }

    pub fn projects(&self) -> Result<Vec<Project>, LeaveError> {
        let mut projects = self.store.projects()?;
        projects.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(projects)
    }

    /// Project existence is checked before the employee, then uniqueness at the store.
    pub fn assign_employee(
        &self,
        project_id: &ProjectId,
        employee_id: &EmployeeId,
    ) -> Result<ProjectAssignment, LeaveError> {
        self.project(project_id)?;
        if self.store.employee(employee_id)?.is_none() {
            return Err(LeaveError::validation("employee does not exist"));
        }

        let assignment = ProjectAssignment {
            employee_id: *employee_id,
            project_id: *project_id,
        };
        match self.store.assign(assignment) {
            Ok(stored) => {
                info!(%project_id, %employee_id, "employee assigned to project");
                Ok(stored)
            }
            Err(RepositoryError::Conflict) => Err(ConflictKind::AlreadyAssigned.into()),
            Err(other) => Err(other.into()),
        }
    }

    pub fn assignments(&self, project_id: &ProjectId) -> Result<Vec<AssignmentView>, LeaveError> {
        self.project(project_id)?;
        let mut rows = Vec::new();
        for assignment in self.store.assignments_for_project(project_id)? {
            if let Some(employee) = self.store.employee(&assignment.employee_id)? {
                rows.push(AssignmentView {
                    employee_id: employee.id,
                    employee_name: employee.name,
                });
            }
        }
        rows.sort_by(|a, b| {
            a.employee_name
                .cmp(&b.employee_name)
                .then(a.employee_id.cmp(&b.employee_id))
        });
        Ok(rows)
    }

    fn validated_project(&self, id: ProjectId, draft: ProjectDraft) -> Result<Project, LeaveError> {
        let name = required_name(&draft.name)?;
        if self.store.customer(&draft.customer_id)?.is_none() {
            return Err(LeaveError::validation("customer does not exist"));
        }

        let project = Project {
            id,
            name,
            customer_id: draft.customer_id,
            start_date: draft.start_date,
            end_date: draft.end_date,
        };
        if !project.has_valid_window() {
            return Err(LeaveError::validation(
                "project end date must not precede its start date",
            ));
        }
        Ok(project)
    }
}

fn required_name(raw: &str) -> Result<String, LeaveError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LeaveError::validation("name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(LeaveError::validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
