use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;

use super::directory::{CoAssignee, Directory, DirectoryStore};
use super::domain::{
    Customer, CustomerId, Employee, EmployeeId, LeaveFilter, LeaveId, LeaveRequest, LeaveStatus,
    Project, ProjectAssignment, ProjectId,
};
use super::repository::{LeaveRepository, RepositoryError};

#[derive(Default)]
struct DirectoryTables {
    employees: HashMap<EmployeeId, Employee>,
    customers: HashMap<CustomerId, Customer>,
    projects: HashMap<ProjectId, Project>,
    assignments: BTreeSet<ProjectAssignment>,
}

#[derive(Default)]
struct LeaveTables {
    by_id: HashMap<LeaveId, LeaveRequest>,
    by_owner_and_date: HashMap<(EmployeeId, NaiveDate), LeaveId>,
}

/// Process-local store backing both the directory and the leave repository.
///
/// Every check-and-write happens under one lock per table group, which makes the
/// (employee, date) and (employee, project) uniqueness and status compare-and-set atomic.
/// Writes spanning both groups lock the directory before the leaves.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    directory: Arc<Mutex<DirectoryTables>>,
    leaves: Arc<Mutex<LeaveTables>>,
}

impl InMemoryStore {
    fn directory(&self) -> Result<MutexGuard<'_, DirectoryTables>, RepositoryError> {
        self.directory
            .lock()
            .map_err(|_| RepositoryError::Unavailable("directory lock poisoned".to_string()))
    }

    fn leaves(&self) -> Result<MutexGuard<'_, LeaveTables>, RepositoryError> {
        self.leaves
            .lock()
            .map_err(|_| RepositoryError::Unavailable("leave lock poisoned".to_string()))
    }

    fn both(
        &self,
    ) -> Result<(MutexGuard<'_, DirectoryTables>, MutexGuard<'_, LeaveTables>), RepositoryError>
    {
        let directory = self.directory()?;
        let leaves = self.leaves()?;
        Ok((directory, leaves))
    }
}

impl Directory for InMemoryStore {
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.directory()?.employees.get(id).cloned())
    }

    fn active_projects_for(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<BTreeSet<ProjectId>, RepositoryError> {
        let tables = self.directory()?;
        Ok(tables
            .assignments
            .iter()
            .filter(|assignment| assignment.employee_id == *employee_id)
            .filter(|assignment| {
                tables
                    .projects
                    .get(&assignment.project_id)
                    .is_some_and(|project| project.covers(date))
            })
            .map(|assignment| assignment.project_id)
            .collect())
    }

    fn co_assignees(
        &self,
        project_ids: &BTreeSet<ProjectId>,
        excluding: &EmployeeId,
    ) -> Result<Vec<CoAssignee>, RepositoryError> {
        let tables = self.directory()?;
        let rows = tables
            .assignments
            .iter()
            .filter(|assignment| {
                assignment.employee_id != *excluding && project_ids.contains(&assignment.project_id)
            })
            .filter_map(|assignment| {
                let project = tables.projects.get(&assignment.project_id)?;
                let employee = tables.employees.get(&assignment.employee_id)?;
                Some(CoAssignee {
                    project_id: project.id,
                    project_name: project.name.clone(),
                    employee_id: employee.id,
                    employee_name: employee.name.clone(),
                })
            })
            .collect();
        Ok(rows)
    }
}

impl DirectoryStore for InMemoryStore {
    fn employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self.directory()?.employees.values().cloned().collect())
    }

    fn insert_employee(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        let mut tables = self.directory()?;
        if tables.employees.contains_key(&employee.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    fn update_employee(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        let mut tables = self.directory()?;
        match tables.employees.get_mut(&employee.id) {
            Some(slot) => {
                *slot = employee.clone();
                Ok(employee)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn remove_employee_if_no_leaves(&self, id: &EmployeeId) -> Result<(), RepositoryError> {
        let (mut tables, leaves) = self.both()?;
        if !tables.employees.contains_key(id) {
            return Err(RepositoryError::NotFound);
        }
        if leaves.by_owner_and_date.keys().any(|(owner, _)| owner == id) {
            return Err(RepositoryError::InUse);
        }
        tables.employees.remove(id);
        tables
            .assignments
            .retain(|assignment| assignment.employee_id != *id);
        Ok(())
    }

    fn customer(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.directory()?.customers.get(id).cloned())
    }

    fn customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        Ok(self.directory()?.customers.values().cloned().collect())
    }

    fn insert_customer(&self, customer: Customer) -> Result<Customer, RepositoryError> {
        let mut tables = self.directory()?;
        if tables.customers.contains_key(&customer.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    fn project(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError> {
        Ok(self.directory()?.projects.get(id).cloned())
    }

    fn projects(&self) -> Result<Vec<Project>, RepositoryError> {
        Ok(self.directory()?.projects.values().cloned().collect())
    }

    fn insert_project(&self, project: Project) -> Result<Project, RepositoryError> {
        let mut tables = self.directory()?;
        if tables.projects.contains_key(&project.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    fn update_project(&self, project: Project) -> Result<Project, RepositoryError> {
        let mut tables = self.directory()?;
        match tables.projects.get_mut(&project.id) {
            Some(slot) => {
                *slot = project.clone();
                Ok(project)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn remove_project(&self, id: &ProjectId) -> Result<(), RepositoryError> {
        let mut tables = self.directory()?;
        if tables.projects.remove(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables
            .assignments
            .retain(|assignment| assignment.project_id != *id);
        Ok(())
    }

    fn assign(&self, assignment: ProjectAssignment) -> Result<ProjectAssignment, RepositoryError> {
        let mut tables = self.directory()?;
        if !tables.assignments.insert(assignment) {
            return Err(RepositoryError::Conflict);
        }
        Ok(assignment)
    }

    fn assignments_for_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ProjectAssignment>, RepositoryError> {
        Ok(self
            .directory()?
            .assignments
            .iter()
            .filter(|assignment| assignment.project_id == *project_id)
            .copied()
            .collect())
    }
}

impl LeaveRepository for InMemoryStore {
    fn insert(&self, leave: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        let (directory, mut tables) = self.both()?;
        if !directory.employees.contains_key(&leave.employee_id) {
            return Err(RepositoryError::NotFound);
        }
        let key = (leave.employee_id, leave.date);
        if tables.by_owner_and_date.contains_key(&key) || tables.by_id.contains_key(&leave.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.by_owner_and_date.insert(key, leave.id);
        tables.by_id.insert(leave.id, leave.clone());
        Ok(leave)
    }

    fn fetch(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError> {
        Ok(self.leaves()?.by_id.get(id).cloned())
    }

    fn find_by_employee_and_date(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, RepositoryError> {
        let tables = self.leaves()?;
        Ok(tables
            .by_owner_and_date
            .get(&(*employee_id, date))
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    fn on_date(
        &self,
        date: NaiveDate,
        statuses: &[LeaveStatus],
        employees: &BTreeSet<EmployeeId>,
    ) -> Result<Vec<LeaveRequest>, RepositoryError> {
        let tables = self.leaves()?;
        Ok(employees
            .iter()
            .filter_map(|employee_id| tables.by_owner_and_date.get(&(*employee_id, date)))
            .filter_map(|id| tables.by_id.get(id))
            .filter(|leave| statuses.contains(&leave.status))
            .cloned()
            .collect())
    }

    fn list(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        Ok(self
            .leaves()?
            .by_id
            .values()
            .filter(|leave| filter.matches(leave))
            .cloned()
            .collect())
    }

    fn transition(
        &self,
        expected: LeaveStatus,
        updated: LeaveRequest,
    ) -> Result<LeaveRequest, RepositoryError> {
        let mut tables = self.leaves()?;
        let slot = tables
            .by_id
            .get_mut(&updated.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot.status != expected {
            return Err(RepositoryError::StatusChanged(slot.status));
        }
        *slot = updated.clone();
        Ok(updated)
    }

    fn has_leaves_for(&self, employee_id: &EmployeeId) -> Result<bool, RepositoryError> {
        Ok(self
            .leaves()?
            .by_owner_and_date
            .keys()
            .any(|(owner, _)| owner == employee_id))
    }
}
