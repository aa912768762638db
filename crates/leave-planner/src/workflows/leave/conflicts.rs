//! Advisory conflict hints: who else on the requester's active projects is away that day.
//!
//! Hints never block an operation. Creation-time checks only count approved absences of
//! co-assignees; approval-time checks also count their still-pending requests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::directory::Directory;
use super::domain::{EmployeeId, LeaveStatus, ProjectId};
use super::repository::{LeaveRepository, RepositoryError};

/// An employee named by a conflict hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEmployee {
    pub employee_id: EmployeeId,
    pub employee_name: String,
}

/// One project on which the requester would overlap with absent colleagues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictHint {
    pub project_id: ProjectId,
    pub project_name: String,
    pub employees: Vec<ConflictEmployee>,
}

const APPROVED: &[LeaveStatus] = &[LeaveStatus::Approved];
const APPROVED_OR_PENDING: &[LeaveStatus] = &[LeaveStatus::Approved, LeaveStatus::Requested];

/// Statuses that count as an absence for the given check.
pub fn conflicting_statuses(include_requested: bool) -> &'static [LeaveStatus] {
    if include_requested {
        APPROVED_OR_PENDING
    } else {
        APPROVED
    }
}

pub struct ConflictDetector<D, L> {
    directory: Arc<D>,
    leaves: Arc<L>,
}

impl<D, L> ConflictDetector<D, L>
where
    D: Directory + 'static,
    L: LeaveRepository + 'static,
{
    pub fn new(directory: Arc<D>, leaves: Arc<L>) -> Self {
        Self { directory, leaves }
    }

    /// Hints are ordered by project id, employees within a hint by employee id.
    pub fn compute_hints(
        &self,
        requester: &EmployeeId,
        date: NaiveDate,
        include_requested: bool,
    ) -> Result<Vec<ConflictHint>, RepositoryError> {
        let active_projects = self.directory.active_projects_for(requester, date)?;
        if active_projects.is_empty() {
            return Ok(Vec::new());
        }

        let co_assignees = self.directory.co_assignees(&active_projects, requester)?;
        if co_assignees.is_empty() {
            return Ok(Vec::new());
        }

        let team: BTreeSet<EmployeeId> = co_assignees.iter().map(|row| row.employee_id).collect();
        let absent: BTreeSet<EmployeeId> = self
            .leaves
            .on_date(date, conflicting_statuses(include_requested), &team)?
            .into_iter()
            .map(|leave| leave.employee_id)
            .collect();
        if absent.is_empty() {
            return Ok(Vec::new());
        }

        let mut grouped: BTreeMap<ProjectId, (String, BTreeMap<EmployeeId, String>)> =
            BTreeMap::new();
        for row in co_assignees
            .into_iter()
            .filter(|row| absent.contains(&row.employee_id))
        {
            grouped
                .entry(row.project_id)
                .or_insert_with(|| (row.project_name, BTreeMap::new()))
                .1
                .entry(row.employee_id)
                .or_insert(row.employee_name);
        }

        let hints: Vec<ConflictHint> = grouped
            .into_iter()
            .map(|(project_id, (project_name, employees))| ConflictHint {
                project_id,
                project_name,
                employees: employees
                    .into_iter()
                    .map(|(employee_id, employee_name)| ConflictEmployee {
                        employee_id,
                        employee_name,
                    })
                    .collect(),
            })
            .collect();

        debug!(
            %requester,
            %date,
            include_requested,
            hints = hints.len(),
            "conflict hints computed"
        );
        Ok(hints)
    }
}
