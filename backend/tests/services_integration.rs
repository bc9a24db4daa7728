//! End-to-end service workflow against the in-memory repository: catalog,
//! scheduling, completion, compliance and planning.

use chrono::{NaiveDate, NaiveTime};

use training_hub::api::*;
use training_hub::db::repositories::LocalRepository;
use training_hub::db::repository::{RepositoryError, TrainingRepository};
use training_hub::db::services::{self, AddParticipantRequest};
use training_hub::services::compliance::{self, Code95Status};
use training_hub::services::i18n::Language;
use training_hub::services::planning::{self, CandidateReason, ConvertPlanRequest};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn day_session(day: NaiveDate) -> TrainingSession {
    TrainingSession::new(
        day,
        NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
        NaiveTime::from_hms_opt(16, 30, 0).unwrap(),
    )
}

struct Fixture {
    repo: LocalRepository,
    adr: CertificateDefinition,
    course: Course,
    anna: Employee,
    bram: Employee,
    cor: Employee,
}

async fn driver(repo: &LocalRepository, number: &str, first: &str, last: &str) -> Employee {
    let mut draft = EmployeeDraft::new(number, first, last);
    draft.is_driver = true;
    draft.department = Some("Transport".into());
    services::create_employee(repo, &draft).await.unwrap()
}

async fn fixture() -> Fixture {
    let repo = LocalRepository::new();
    let provider = services::create_provider(&repo, &ProviderDraft::new("Opleidingscentrum Noord"))
        .await
        .unwrap();
    let adr = services::create_certificate(&repo, &CertificateDefinitionDraft::new("ADR", Some(60)))
        .await
        .unwrap();
    let mut course = CourseDraft::new("ADR basis", 8.0);
    course.provider_id = Some(provider.id);
    course.certificate_id = Some(adr.id);
    course.code95_points = 7;
    course.max_participants = Some(2);
    let course = services::create_course(&repo, &course).await.unwrap();

    let anna = driver(&repo, "D-001", "Anna", "Bakker").await;
    let bram = driver(&repo, "D-002", "Bram", "Jansen").await;
    let cor = driver(&repo, "D-003", "Cor", "Visser").await;

    Fixture {
        repo,
        adr,
        course,
        anna,
        bram,
        cor,
    }
}

#[tokio::test]
async fn test_schedule_complete_and_track_compliance() {
    let f = fixture().await;
    let repo = &f.repo;

    services::create_availability(
        repo,
        f.cor.id,
        &AvailabilityDraft::new(AvailabilityKind::Vacation, date(2026, 3, 1), date(2026, 3, 5)),
    )
    .await
    .unwrap();

    let training = services::create_training(
        repo,
        &TrainingDraft::new(f.course.id, vec![day_session(date(2026, 3, 2))]),
    )
    .await
    .unwrap();

    services::add_participant(repo, training.id, &AddParticipantRequest::new(f.anna.id))
        .await
        .unwrap();
    let unavailable =
        services::add_participant(repo, training.id, &AddParticipantRequest::new(f.cor.id))
            .await
            .unwrap_err();
    assert!(matches!(unavailable, RepositoryError::Conflict { .. }));
    assert!(unavailable.message().contains("2026-03-02"));

    services::add_participant(repo, training.id, &AddParticipantRequest::new(f.bram.id))
        .await
        .unwrap();
    let mut forced = AddParticipantRequest::new(f.cor.id);
    forced.override_availability = true;
    let full = services::add_participant(repo, training.id, &forced)
        .await
        .unwrap_err();
    assert!(full.message().contains("is full"));

    let summary = services::complete_training(repo, training.id, date(2026, 3, 2))
        .await
        .unwrap();
    assert_eq!(summary.training.status, TrainingStatus::Completed);
    assert_eq!(summary.completed.len(), 2);
    assert_eq!(summary.licenses_issued.len(), 2);
    assert!(summary
        .licenses_issued
        .iter()
        .all(|l| l.expires_on == Some(date(2031, 3, 2)) && l.source_training_id == Some(training.id)));

    let anna = compliance::employee_compliance(repo, f.anna.id, date(2026, 3, 10), Language::En)
        .await
        .unwrap();
    assert_eq!(anna.licenses.len(), 1);
    assert_eq!(anna.licenses[0].status, ExpiryStatus::Valid);
    assert_eq!(anna.code95.points, 7);
    assert_eq!(anna.code95.status, Code95Status::InProgress);
    assert_eq!(anna.code95.cycle_start, Some(date(2026, 3, 2)));
    assert!(!anna.needs_attention);

    // Seven weeks before the licenses lapse both graduates need attention.
    let attention =
        compliance::compliance_overview(repo, date(2031, 1, 15), Language::Nl, true)
            .await
            .unwrap();
    let mut ids: Vec<_> = attention.iter().map(|e| e.employee_id).collect();
    ids.sort();
    assert_eq!(ids, vec![f.anna.id, f.bram.id]);
    assert!(attention
        .iter()
        .all(|e| e.code95.status == Code95Status::AtRisk && e.code95.status_label == "Risico"));
}

#[tokio::test]
async fn test_suggest_plan_and_convert() {
    let f = fixture().await;
    let repo = &f.repo;

    services::create_license(repo, f.anna.id, &LicenseDraft::new(f.adr.id, date(2021, 3, 1)))
        .await
        .unwrap();
    services::create_license(repo, f.bram.id, &LicenseDraft::new(f.adr.id, date(2025, 6, 1)))
        .await
        .unwrap();

    let candidates = planning::suggest_candidates(repo, f.adr.id, 90, date(2026, 2, 1))
        .await
        .unwrap();
    let reasons: Vec<_> = candidates.iter().map(|c| (c.employee_id, c.reason)).collect();
    assert_eq!(
        reasons,
        vec![
            (f.cor.id, CandidateReason::Missing),
            (f.anna.id, CandidateReason::Expiring),
        ]
    );

    let mut draft = PlanDraft::new("ADR voorjaar");
    draft.course_id = Some(f.course.id);
    draft.certificate_id = Some(f.adr.id);
    draft.items = vec![
        PlanItem::new(f.cor.id),
        PlanItem::new(f.anna.id),
        PlanItem::new(f.bram.id),
    ];
    let plan = services::create_plan(repo, &draft).await.unwrap();

    let request = ConvertPlanRequest {
        course_id: None,
        provider_id: None,
        title: None,
        location: Some("Zwolle".into()),
        instructor: None,
        max_participants: None,
        sessions: vec![day_session(date(2026, 2, 16)), day_session(date(2026, 2, 17))],
    };
    let outcome = planning::convert_plan(repo, plan.id, &request).await.unwrap();
    assert_eq!(outcome.plan.status, PlanStatus::Converted);
    assert_eq!(outcome.plan.converted_training_id, Some(outcome.training.id));
    assert_eq!(outcome.training.title.as_deref(), Some("ADR voorjaar"));
    assert_eq!(outcome.participants.len(), 2);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].employee_id, f.bram.id);

    let enrolled = repo.list_participants(outcome.training.id).await.unwrap();
    assert_eq!(enrolled.len(), 2);

    let again = planning::convert_plan(repo, plan.id, &request).await.unwrap_err();
    assert!(matches!(again, RepositoryError::Conflict { .. }));
}

#[tokio::test]
async fn test_cancelled_training_is_closed_for_enrollment() {
    let f = fixture().await;
    let repo = &f.repo;
    let training = services::create_training(
        repo,
        &TrainingDraft::new(f.course.id, vec![day_session(date(2026, 5, 11))]),
    )
    .await
    .unwrap();

    let cancelled = services::cancel_training(repo, training.id).await.unwrap();
    assert_eq!(cancelled.status, TrainingStatus::Cancelled);
    let err = services::add_participant(repo, training.id, &AddParticipantRequest::new(f.anna.id))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict { .. }));

    let completed = services::complete_training(repo, training.id, date(2026, 5, 11)).await;
    assert!(completed.is_err());
}
