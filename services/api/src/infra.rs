use chrono::NaiveDate;
use leave_planner::workflows::leave::{
    DirectoryService, DirectoryStore, EmployeeDraft, LeaveError, LeaveRepository, ProjectDraft,
    Role,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Start date of the sample "Migration" project.
pub(crate) fn migration_start() -> Result<NaiveDate, LeaveError> {
    NaiveDate::from_ymd_opt(2025, 9, 1)
        .ok_or_else(|| LeaveError::Validation("sample project start date is invalid".to_string()))
}

/// Populate an empty directory with a sample team. Returns `false` when employees exist.
pub(crate) fn seed_demo_directory<D, L>(
    directory: &DirectoryService<D, L>,
) -> Result<bool, LeaveError>
where
    D: DirectoryStore + 'static,
    L: LeaveRepository + 'static,
{
    if !directory.employees()?.is_empty() {
        info!("directory already populated; skipping demo seed");
        return Ok(false);
    }

    let customer = directory.register_customer("Layer 2")?;
    let project = directory.create_project(ProjectDraft {
        name: "Migration".to_string(),
        customer_id: customer.id,
        start_date: migration_start()?,
        end_date: None,
    })?;

    let team = [
        ("Lily", Some("Developer"), Role::Employee),
        ("Sara", Some("QA"), Role::Employee),
        ("Morgan", Some("Delivery Lead"), Role::Approver),
    ];
    for (name, job_title, role) in team {
        let employee = directory.register_employee(EmployeeDraft {
            name: name.to_string(),
            job_title: job_title.map(str::to_string),
            role: Some(role),
        })?;
        if role == Role::Employee {
            directory.assign_employee(&project.id, &employee.id)?;
        }
    }

    info!(project_id = %project.id, "seeded demo directory");
    Ok(true)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
