use crate::infra::{migration_start, seed_demo_directory};
use chrono::{Duration, NaiveDate};
use clap::Args;
use leave_planner::error::AppError;
use leave_planner::workflows::leave::{
    ConflictHint, DirectoryService, Employee, InMemoryStore, LeaveError, LeaveWorkflowService,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Leave date (YYYY-MM-DD). Defaults to nine days into the sample project.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let date = match args.date {
        Some(date) => date,
        None => migration_start()? + Duration::days(9),
    };

    let store = Arc::new(InMemoryStore::default());
    let workflow = LeaveWorkflowService::new(store.clone(), store.clone());
    let directory = DirectoryService::new(store.clone(), store);
    seed_demo_directory(&directory)?;

    let employees = directory.employees()?;
    let lily = find(&employees, "Lily")?;
    let sara = find(&employees, "Sara")?;
    let approver = find(&employees, "Morgan")?;

    println!("Leave planner demo for {date}");
    println!(
        "Team: {} and {} on Migration, {} approving",
        lily.name, sara.name, approver.name
    );

    let lily_leave = workflow.create(&lily.id, date)?;
    println!(
        "\n1. {} requests leave -> {}",
        lily.name,
        lily_leave.leave.status.label()
    );
    render_hints(&lily_leave.conflict_hints);

    let sara_leave = workflow.create(&sara.id, date)?;
    println!(
        "2. {} requests leave -> {}",
        sara.name,
        sara_leave.leave.status.label()
    );
    render_hints(&sara_leave.conflict_hints);

    let approved = workflow.approve(&lily_leave.leave.id, &approver.id)?;
    println!(
        "3. {} approves {}'s leave -> {}",
        approver.name,
        lily.name,
        approved.leave.status.label()
    );
    render_hints(&approved.conflict_hints);

    let approved = workflow.approve(&sara_leave.leave.id, &approver.id)?;
    println!(
        "4. {} approves {}'s leave -> {}",
        approver.name,
        sara.name,
        approved.leave.status.label()
    );
    render_hints(&approved.conflict_hints);

    match workflow.approve(&lily_leave.leave.id, &approver.id) {
        Ok(_) => println!("5. Repeated approval unexpectedly succeeded"),
        Err(err) => println!("5. Repeating the approval is refused: {err}"),
    }

    match workflow.approve(&sara_leave.leave.id, &sara.id) {
        Ok(_) => println!("6. {} unexpectedly decided on leave", sara.name),
        Err(err) => println!("6. {} tries to approve: {err}", sara.name),
    }

    Ok(())
}

fn find<'a>(employees: &'a [Employee], name: &str) -> Result<&'a Employee, LeaveError> {
    employees
        .iter()
        .find(|employee| employee.name == name)
        .ok_or(LeaveError::NotFound("employee"))
}

fn render_hints(hints: &[ConflictHint]) {
    if hints.is_empty() {
        println!("   no overlapping absences");
        return;
    }
    for hint in hints {
        let names: Vec<&str> = hint
            .employees
            .iter()
            .map(|entry| entry.employee_name.as_str())
            .collect();
        println!("   {} also away: {}", hint.project_name, names.join(", "));
    }
}
