use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(raw.trim()).map(Self)
            }
        }
    };
}

entity_id!(
    /// Identifier wrapper for directory employees.
    EmployeeId
);
entity_id!(CustomerId);
entity_id!(
    /// Identifier wrapper for customer projects.
    ProjectId
);
entity_id!(
    /// Identifier wrapper for leave requests.
    LeaveId
);

/// Longest display name accepted for employees, customers, and projects.
pub const MAX_NAME_LEN: usize = 200;

/// Closed set of roles; a role only gates decisions, it never grants ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Employee,
    Approver,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Approver => "approver",
            Role::Admin => "admin",
        }
    }

    /// Approvers and admins may approve or reject leave.
    pub const fn may_decide(self) -> bool {
        matches!(self, Role::Approver | Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub job_title: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub customer_id: CustomerId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl Project {
    /// True when `date` lies inside the project's window; open-ended projects never end.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| date <= end)
    }

    pub fn has_valid_window(&self) -> bool {
        self.end_date.map_or(true, |end| end >= self.start_date)
    }
}

/// "This employee works on this project"; the window comes from the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAssignment {
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
}

/// Lifecycle of a leave request. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveStatus {
    Requested,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeaveStatus::Requested => "requested",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Requested)
    }
}

/// Who decided, when, and why. Only present once a request left `Requested`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDecision {
    pub decided_by: EmployeeId,
    pub decided_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: LeaveId,
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub status: LeaveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<LeaveDecision>,
}

impl LeaveRequest {
    pub fn requested(employee_id: EmployeeId, date: NaiveDate) -> Self {
        Self {
            id: LeaveId::new(),
            employee_id,
            date,
            status: LeaveStatus::Requested,
            decision: None,
        }
    }

    /// Copy of this request moved into a terminal status.
    pub(crate) fn decided(
        &self,
        status: LeaveStatus,
        decided_by: EmployeeId,
        comment: Option<String>,
    ) -> Self {
        Self {
            status,
            decision: Some(LeaveDecision {
                decided_by,
                decided_at: Utc::now(),
                comment,
            }),
            ..self.clone()
        }
    }

    pub fn view(&self) -> LeaveView {
        LeaveView {
            id: self.id,
            employee_id: self.employee_id,
            date: self.date,
            status: self.status,
        }
    }
}

/// Outbound shape of a leave request, without decision metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveView {
    pub id: LeaveId,
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub status: LeaveStatus,
}

/// Optional filters for leave listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaveFilter {
    pub employee_id: Option<EmployeeId>,
    pub date: Option<NaiveDate>,
}

impl LeaveFilter {
    pub fn matches(&self, leave: &LeaveRequest) -> bool {
        self.employee_id.map_or(true, |id| leave.employee_id == id)
            && self.date.map_or(true, |date| leave.date == date)
    }
}

/// Trim free text, treating blank input as absent.
pub fn non_blank(text: Option<&str>) -> Option<String> {
    text
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
