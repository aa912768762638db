use std::sync::{Arc, Barrier};
use std::thread;

use super::common::*;
use crate::workflows::leave::directory::DirectoryService;
use crate::workflows::leave::domain::{
    EmployeeId, LeaveFilter, LeaveId, LeaveRequest, LeaveStatus, Role,
};
use crate::workflows::leave::memory::InMemoryStore;
use crate::workflows::leave::repository::LeaveRepository;
use crate::workflows::leave::{
    AuthorizationDenial, ConflictKind, EmployeeDraft, LeaveError, LeaveWorkflowService,
};

#[test]
fn create_files_a_pending_request() {
    let s = scenario();
    let outcome = s
        .fixture
        .workflow
        .create(&s.a.id, scenario_day())
        .expect("create succeeds");

    assert_eq!(outcome.leave.status, LeaveStatus::Requested);
    assert_eq!(outcome.leave.employee_id, s.a.id);
    assert_eq!(outcome.leave.date, scenario_day());
    assert!(outcome.leave.decision.is_none());
    assert!(outcome.conflict_hints.is_empty());
    assert_eq!(s.fixture.stored(&outcome.leave.id), outcome.leave);
}

#[test]
fn create_rejects_unknown_employee() {
    let fixture = Fixture::new();
    match fixture.workflow.create(&EmployeeId::new(), scenario_day()) {
        Err(LeaveError::Validation(message)) => assert!(message.contains("employee")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn second_request_for_same_day_is_a_duplicate() {
    let s = scenario();
    let workflow = &s.fixture.workflow;
    workflow.create(&s.a.id, scenario_day()).expect("first");

    assert!(matches!(
        workflow.create(&s.a.id, scenario_day()),
        Err(LeaveError::Conflict(ConflictKind::Duplicate))
    ));
    let leaves = workflow
        .list(LeaveFilter {
            employee_id: Some(s.a.id),
            date: None,
        })
        .expect("list");
    assert_eq!(leaves.len(), 1);
}

#[test]
fn rejected_request_still_blocks_the_day() {
    let s = scenario();
    let workflow = &s.fixture.workflow;
    let created = workflow.create(&s.a.id, scenario_day()).expect("create");
    workflow
        .reject(&created.leave.id, &s.approver.id, None)
        .expect("reject");

    assert!(matches!(
        workflow.create(&s.a.id, scenario_day()),
        Err(LeaveError::Conflict(ConflictKind::Duplicate))
    ));
}

#[test]
fn concurrent_duplicate_creates_store_exactly_one() {
    let s = scenario();
    let workflow = s.fixture.workflow.clone();
    let barrier = Arc::new(Barrier::new(8));

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let workflow = workflow.clone();
                let barrier = barrier.clone();
                let requester = s.a.id;
                scope.spawn(move || {
                    barrier.wait();
                    workflow.create(&requester, scenario_day())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread joins"))
            .collect()
    });

    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().filter(|result| result.is_err()).all(|result| matches!(
        result,
        Err(LeaveError::Conflict(ConflictKind::Duplicate))
    )));
    let stored = workflow
        .list(LeaveFilter {
            employee_id: Some(s.a.id),
            date: Some(scenario_day()),
        })
        .expect("list");
    assert_eq!(stored.len(), 1);
}

#[test]
fn lost_insert_race_reports_duplicate() {
    let store = Arc::new(InMemoryStore::default());
    let leaves = Arc::new(RacingLeaves::over(store.clone()));
    let directory = DirectoryService::new(store.clone(), leaves.clone());
    let workflow = LeaveWorkflowService::new(store.clone(), leaves);
    let employee = directory
        .register_employee(EmployeeDraft {
            name: "Lily".to_string(),
            job_title: None,
            role: None,
        })
        .expect("register");

    assert!(matches!(
        workflow.create(&employee.id, scenario_day()),
        Err(LeaveError::Conflict(ConflictKind::Duplicate))
    ));
}

#[test]
fn approve_records_the_decision() {
    let s = scenario();
    let workflow = &s.fixture.workflow;
    let created = workflow.create(&s.a.id, scenario_day()).expect("create");

    let outcome = workflow
        .approve(&created.leave.id, &s.approver.id)
        .expect("approve");

    assert_eq!(outcome.leave.status, LeaveStatus::Approved);
    let decision = outcome.leave.decision.as_ref().expect("decision recorded");
    assert_eq!(decision.decided_by, s.approver.id);
    assert!(decision.comment.is_none());
    assert_eq!(s.fixture.stored(&created.leave.id), outcome.leave);
}

#[test]
fn admins_may_decide_too() {
    let s = scenario();
    let admin = s.fixture.employee("Avery", Role::Admin);
    let created = s
        .fixture
        .workflow
        .create(&s.a.id, scenario_day())
        .expect("create");

    let rejected = s
        .fixture
        .workflow
        .reject(&created.leave.id, &admin.id, Some("coverage"))
        .expect("admin rejects");
    assert_eq!(rejected.status, LeaveStatus::Rejected);
}

#[test]
fn employees_cannot_decide() {
    let s = scenario();
    let workflow = &s.fixture.workflow;
    let created = workflow.create(&s.a.id, scenario_day()).expect("create");

    assert!(matches!(
        workflow.approve(&created.leave.id, &s.b.id),
        Err(LeaveError::Authorization(AuthorizationDenial::InsufficientRole))
    ));
    assert!(matches!(
        workflow.reject(&created.leave.id, &s.b.id, None),
        Err(LeaveError::Authorization(AuthorizationDenial::InsufficientRole))
    ));
    assert_eq!(
        s.fixture.stored(&created.leave.id).status,
        LeaveStatus::Requested
    );
}

#[test]
fn role_is_checked_before_the_target_is_loaded() {
    let s = scenario();
    assert!(matches!(
        s.fixture.workflow.approve(&LeaveId::new(), &s.b.id),
        Err(LeaveError::Authorization(AuthorizationDenial::InsufficientRole))
    ));
    assert!(matches!(
        s.fixture.workflow.approve(&LeaveId::new(), &s.approver.id),
        Err(LeaveError::NotFound("leave"))
    ));

    let own = s
        .fixture
        .workflow
        .create(&s.b.id, scenario_day())
        .expect("create");
    assert!(matches!(
        s.fixture.workflow.reject(&own.leave.id, &s.b.id, None),
        Err(LeaveError::Authorization(AuthorizationDenial::InsufficientRole))
    ));
}

#[test]
fn unknown_actor_is_not_authorized() {
    let s = scenario();
    let created = s
        .fixture
        .workflow
        .create(&s.a.id, scenario_day())
        .expect("create");

    assert!(matches!(
        s.fixture.workflow.approve(&created.leave.id, &EmployeeId::new()),
        Err(LeaveError::Authorization(AuthorizationDenial::UnknownActor))
    ));
}

#[test]
fn approvers_cannot_decide_their_own_request() {
    let s = scenario();
    let workflow = &s.fixture.workflow;
    let created = workflow
        .create(&s.approver.id, scenario_day())
        .expect("create");

    match workflow.approve(&created.leave.id, &s.approver.id) {
        Err(err @ LeaveError::Authorization(AuthorizationDenial::SelfDecision)) => {
            assert!(err.to_string().contains("self-approval forbidden"));
        }
        other => panic!("expected self-approval denial, got {other:?}"),
    }
    assert!(matches!(
        workflow.reject(&created.leave.id, &s.approver.id, None),
        Err(LeaveError::Authorization(AuthorizationDenial::SelfDecision))
    ));
    assert_eq!(
        s.fixture.stored(&created.leave.id).status,
        LeaveStatus::Requested
    );
}

#[test]
fn terminal_states_never_change() {
    let s = scenario();
    let workflow = &s.fixture.workflow;

    let approved = s.fixture.approved_leave(&s.a, &s.approver, scenario_day());
    let before = s.fixture.stored(&approved);
    assert!(matches!(
        workflow.approve(&approved, &s.approver.id),
        Err(LeaveError::Conflict(ConflictKind::AlreadyApproved))
    ));
    assert!(matches!(
        workflow.reject(&approved, &s.approver.id, Some("late")),
        Err(LeaveError::Conflict(ConflictKind::ImmutableTerminalState))
    ));
    assert_eq!(s.fixture.stored(&approved), before);

    let created = workflow
        .create(&s.b.id, scenario_day())
        .expect("create");
    workflow
        .reject(&created.leave.id, &s.approver.id, None)
        .expect("reject");
    let before = s.fixture.stored(&created.leave.id);
    assert!(matches!(
        workflow.reject(&created.leave.id, &s.approver.id, None),
        Err(LeaveError::Conflict(ConflictKind::AlreadyRejected))
    ));
    assert!(matches!(
        workflow.approve(&created.leave.id, &s.approver.id),
        Err(LeaveError::Conflict(ConflictKind::ImmutableTerminalState))
    ));
    assert_eq!(s.fixture.stored(&created.leave.id), before);
}

#[test]
fn blank_reject_comment_is_stored_as_absent() {
    let s = scenario();
    let workflow = &s.fixture.workflow;

    let blank = workflow.create(&s.a.id, scenario_day()).expect("create");
    let rejected = workflow
        .reject(&blank.leave.id, &s.approver.id, Some("   "))
        .expect("reject");
    assert_eq!(rejected.status, LeaveStatus::Rejected);
    assert!(rejected
        .decision
        .as_ref()
        .expect("decision")
        .comment
        .is_none());

    let commented = workflow
        .create(&s.b.id, scenario_day())
        .expect("create");
    let rejected = workflow
        .reject(&commented.leave.id, &s.approver.id, Some("  release week "))
        .expect("reject");
    assert_eq!(
        rejected.decision.expect("decision").comment.as_deref(),
        Some("release week")
    );
}

#[test]
fn concurrent_decisions_have_a_single_winner() {
    let s = scenario();
    let second_approver = s.fixture.employee("Robin", Role::Approver);
    let created = s
        .fixture
        .workflow
        .create(&s.a.id, scenario_day())
        .expect("create");
    let leave_id = created.leave.id;
    let workflow = s.fixture.workflow.clone();
    let barrier = Barrier::new(2);

    let (approved, rejected) = thread::scope(|scope| {
        let approve = scope.spawn(|| {
            barrier.wait();
            workflow.approve(&leave_id, &s.approver.id).map(|outcome| outcome.leave)
        });
        let reject = scope.spawn(|| {
            barrier.wait();
            workflow.reject(&leave_id, &second_approver.id, Some("coverage"))
        });
        (
            approve.join().expect("approve thread"),
            reject.join().expect("reject thread"),
        )
    });

    let stored = s.fixture.stored(&leave_id);
    match (approved, rejected) {
        (Ok(winner), Err(LeaveError::Conflict(ConflictKind::ImmutableTerminalState)))
        | (Err(LeaveError::Conflict(ConflictKind::ImmutableTerminalState)), Ok(winner)) => {
            assert_eq!(stored, winner);
        }
        other => panic!("expected exactly one decision to win, got {other:?}"),
    }
}

#[test]
fn lost_transition_race_reports_the_winning_state() {
    let store = Arc::new(InMemoryStore::default());
    let leaves = Arc::new(RacingLeaves::over(store.clone()));
    let directory = DirectoryService::new(store.clone(), leaves.clone());
    let workflow = LeaveWorkflowService::new(store.clone(), leaves.clone());
    let register = |name: &str, role| {
        directory
            .register_employee(EmployeeDraft {
                name: name.to_string(),
                job_title: None,
                role: Some(role),
            })
            .expect("register")
    };
    let owner = register("Lily", Role::Employee);
    let approver = register("Morgan", Role::Approver);
    let leave = leaves.seed(LeaveRequest::requested(owner.id, scenario_day()));

    assert!(matches!(
        workflow.approve(&leave.id, &approver.id),
        Err(LeaveError::Conflict(ConflictKind::AlreadyApproved))
    ));
    assert!(matches!(
        workflow.reject(&leave.id, &approver.id, None),
        Err(LeaveError::Conflict(ConflictKind::ImmutableTerminalState))
    ));
}

#[test]
fn storage_failures_surface_as_infrastructure_errors() {
    let store = Arc::new(InMemoryStore::default());
    let directory = DirectoryService::new(store.clone(), Arc::new(UnavailableLeaves));
    let workflow = LeaveWorkflowService::new(store.clone(), Arc::new(UnavailableLeaves));
    let employee = directory
        .register_employee(EmployeeDraft {
            name: "Lily".to_string(),
            job_title: None,
            role: None,
        })
        .expect("register");

    assert!(matches!(
        workflow.create(&employee.id, scenario_day()),
        Err(LeaveError::Infrastructure(_))
    ));
    assert!(matches!(
        workflow.list(LeaveFilter::default()),
        Err(LeaveError::Infrastructure(_))
    ));
    assert!(matches!(
        directory.remove_employee(&employee.id),
        Err(LeaveError::Infrastructure(_))
    ));
}

#[test]
fn filing_for_someone_else_requires_a_decider() {
    let s = scenario();
    let workflow = &s.fixture.workflow;

    assert!(matches!(
        workflow.create_for(&s.b, &s.a.id, scenario_day()),
        Err(LeaveError::Authorization(AuthorizationDenial::OnBehalfForbidden))
    ));
    workflow
        .create_for(&s.a, &s.a.id, scenario_day())
        .expect("own request");
    let filed = workflow
        .create_for(&s.approver, &s.b.id, scenario_day())
        .expect("approver files for b");
    assert_eq!(filed.leave.employee_id, s.b.id);
    assert_eq!(filed.leave.status, LeaveStatus::Requested);
}

#[test]
fn list_filters_and_orders_by_date() {
    let s = scenario();
    let workflow = &s.fixture.workflow;
    workflow.create(&s.a.id, date(2025, 9, 12)).expect("create");
    workflow.create(&s.a.id, date(2025, 9, 10)).expect("create");
    workflow.create(&s.b.id, date(2025, 9, 10)).expect("create");

    let mine = workflow
        .list(LeaveFilter {
            employee_id: Some(s.a.id),
            date: None,
        })
        .expect("list");
    let dates: Vec<_> = mine.iter().map(|leave| leave.date).collect();
    assert_eq!(dates, vec![date(2025, 9, 10), date(2025, 9, 12)]);

    let that_day = workflow
        .list(LeaveFilter {
            employee_id: None,
            date: Some(date(2025, 9, 10)),
        })
        .expect("list");
    assert_eq!(that_day.len(), 2);
    assert_eq!(workflow.list(LeaveFilter::default()).expect("list").len(), 3);
}

#[test]
fn get_reports_missing_leave() {
    let fixture = Fixture::new();
    assert!(matches!(
        fixture.workflow.get(&LeaveId::new()),
        Err(LeaveError::NotFound("leave"))
    ));
}

#[test]
fn stored_leaves_are_visible_through_the_repository() {
    let s = scenario();
    let approved = s.fixture.approved_leave(&s.a, &s.approver, scenario_day());
    assert!(s.fixture.store.has_leaves_for(&s.a.id).expect("query"));
    assert_eq!(
        s.fixture.stored(&approved).status,
        LeaveStatus::Approved
    );
}
