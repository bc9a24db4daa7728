#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};

    use crate::api::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{
        ComplianceRepository, PersonnelRepository, PlanningRepository, RepositoryError,
        TrainingRepository,
    };
    use crate::db::services::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session(day: NaiveDate) -> TrainingSession {
        TrainingSession::new(
            day,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(16, 30, 0).unwrap(),
        )
    }

    async fn employee(repo: &LocalRepository, number: &str) -> Employee {
        create_employee(repo, &EmployeeDraft::new(number, "Jan", number))
            .await
            .unwrap()
    }

    /// Course with 7 Code 95 points awarding a 60-month certificate.
    async fn code95_course(repo: &LocalRepository, max: Option<u32>) -> Course {
        let certificate = create_certificate(
            repo,
            &CertificateDefinitionDraft::new("Code 95 module", Some(60)),
        )
        .await
        .unwrap();
        let mut draft = CourseDraft::new("Defensive driving", 7.0);
        draft.code95_points = 7;
        draft.certificate_id = Some(certificate.id);
        draft.max_participants = max;
        create_course(repo, &draft).await.unwrap()
    }

    async fn training_on(repo: &LocalRepository, course: &Course, days: &[NaiveDate]) -> Training {
        let draft = TrainingDraft::new(course.id, days.iter().copied().map(session).collect());
        create_training(repo, &draft).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_employee_rejects_blank_number() {
        let repo = LocalRepository::new();
        let err = create_employee(&repo, &EmployeeDraft::new("  ", "Jan", "Jansen"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_create_course_with_unknown_provider() {
        let repo = LocalRepository::new();
        let mut draft = CourseDraft::new("Forklift", 4.0);
        draft.provider_id = Some(ProviderId(99));
        let err = create_course(&repo, &draft).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        assert!(err.message().starts_with("provider_id"));
    }

    #[tokio::test]
    async fn test_add_participant_happy_path() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        let emp = employee(&repo, "E1").await;

        let participant = add_participant(&repo, training.id, &AddParticipantRequest::new(emp.id))
            .await
            .unwrap();
        assert_eq!(participant.status, ParticipantStatus::Enrolled);
        assert_eq!(participant.code95_points_awarded, 0);
    }

    #[tokio::test]
    async fn test_add_participant_rejects_duplicate() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        let emp = employee(&repo, "E1").await;
        let request = AddParticipantRequest::new(emp.id);

        add_participant(&repo, training.id, &request).await.unwrap();
        let err = add_participant(&repo, training.id, &request).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_add_participant_rejects_inactive_employee() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        let mut draft = EmployeeDraft::new("E9", "Piet", "Smit");
        draft.active = false;
        let emp = create_employee(&repo, &draft).await.unwrap();

        let err = add_participant(&repo, training.id, &AddParticipantRequest::new(emp.id))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_capacity_falls_back_to_course() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, Some(1)).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        let a = employee(&repo, "A").await;
        let b = employee(&repo, "B").await;

        add_participant(&repo, training.id, &AddParticipantRequest::new(a.id))
            .await
            .unwrap();
        let err = add_participant(&repo, training.id, &AddParticipantRequest::new(b.id))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
        assert!(err.message().contains("full"));
    }

    #[tokio::test]
    async fn test_repository_refuses_seat_beyond_capacity() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, Some(1)).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        let a = employee(&repo, "A").await;
        let b = employee(&repo, "B").await;

        repo.add_participant(training.id, &ParticipantDraft::new(a.id))
            .await
            .unwrap();
        let err = repo
            .add_participant(training.id, &ParticipantDraft::new(b.id))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
        assert!(err.message().contains("1 of 1 seats"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enrollment_never_overbooks() {
        let repo = Arc::new(LocalRepository::new());
        let course = code95_course(&repo, None).await;
        let mut draft = TrainingDraft::new(course.id, vec![session(date(2026, 3, 2))]);
        draft.max_participants = Some(1);
        let training_id = create_training(repo.as_ref(), &draft).await.unwrap().id;

        let mut handles = Vec::new();
        for i in 0..16 {
            let emp = employee(&repo, &format!("C{}", i)).await;
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                add_participant(repo.as_ref(), training_id, &AddParticipantRequest::new(emp.id))
                    .await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(err) => assert!(matches!(err, RepositoryError::Conflict { .. })),
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(repo.list_participants(training_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_participant_frees_seat() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let mut draft = TrainingDraft::new(course.id, vec![session(date(2026, 3, 2))]);
        draft.max_participants = Some(1);
        let training = create_training(&repo, &draft).await.unwrap();
        let a = employee(&repo, "A").await;
        let b = employee(&repo, "B").await;

        let first = add_participant(&repo, training.id, &AddParticipantRequest::new(a.id))
            .await
            .unwrap();
        update_participant(
            &repo,
            first.id,
            &ParticipantUpdate {
                status: ParticipantStatus::Cancelled,
                notes: Some("sick".into()),
            },
        )
        .await
        .unwrap();

        assert!(add_participant(&repo, training.id, &AddParticipantRequest::new(b.id))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_availability_blocks_enrollment_unless_overridden() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2), date(2026, 3, 9)]).await;
        let emp = employee(&repo, "E1").await;
        create_availability(
            &repo,
            emp.id,
            &AvailabilityDraft::new(AvailabilityKind::Vacation, date(2026, 3, 7), date(2026, 3, 14)),
        )
        .await
        .unwrap();

        let mut request = AddParticipantRequest::new(emp.id);
        let err = add_participant(&repo, training.id, &request).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
        assert!(err.message().contains("2026-03-09"));

        request.override_availability = true;
        add_participant(&repo, training.id, &request).await.unwrap();

        let conflicts = availability_conflicts(&repo, training.id).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].date, date(2026, 3, 9));
        assert_eq!(conflicts[0].kind, AvailabilityKind::Vacation);
        assert!(conflicts[0].participant_id.is_some());
    }

    #[tokio::test]
    async fn test_complete_training_awards_points_and_licenses() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        let attended = employee(&repo, "A").await;
        let no_show = employee(&repo, "B").await;

        add_participant(&repo, training.id, &AddParticipantRequest::new(attended.id))
            .await
            .unwrap();
        let absent = add_participant(&repo, training.id, &AddParticipantRequest::new(no_show.id))
            .await
            .unwrap();
        update_participant(
            &repo,
            absent.id,
            &ParticipantUpdate {
                status: ParticipantStatus::NoShow,
                notes: None,
            },
        )
        .await
        .unwrap();

        let summary = complete_training(&repo, training.id, date(2026, 3, 2))
            .await
            .unwrap();
        assert_eq!(summary.training.status, TrainingStatus::Completed);
        assert_eq!(summary.completed.len(), 1);
        assert_eq!(summary.completed[0].code95_points_awarded, 7);
        assert_eq!(summary.licenses_issued.len(), 1);

        let license = &summary.licenses_issued[0];
        assert_eq!(license.employee_id, attended.id);
        assert_eq!(license.expires_on, Some(date(2031, 3, 2)));
        assert_eq!(license.source_training_id, Some(training.id));

        assert!(repo.list_licenses_for_employee(no_show.id).await.unwrap().is_empty());
        let absent = repo.get_participant(absent.id).await.unwrap();
        assert_eq!(absent.status, ParticipantStatus::NoShow);
        assert_eq!(absent.code95_points_awarded, 0);
    }

    #[tokio::test]
    async fn test_interrupted_completion_can_be_retried() {
        let mut failures = 0;
        for n in 0..30 {
            let repo = LocalRepository::new();
            let course = code95_course(&repo, None).await;
            let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
            let a = employee(&repo, "A").await;
            let b = employee(&repo, "B").await;
            for emp in [&a, &b] {
                add_participant(&repo, training.id, &AddParticipantRequest::new(emp.id))
                    .await
                    .unwrap();
            }

            repo.fail_after(n);
            let summary = match complete_training(&repo, training.id, date(2026, 3, 2)).await {
                Ok(summary) => summary,
                Err(err) => {
                    failures += 1;
                    assert!(matches!(err, RepositoryError::ConnectionError { .. }));
                    repo.set_healthy(true);
                    complete_training(&repo, training.id, date(2026, 3, 2))
                        .await
                        .unwrap()
                }
            };
            repo.set_healthy(true);

            assert_eq!(summary.training.status, TrainingStatus::Completed);
            assert_eq!(summary.completed.len(), 2, "step {}", n);
            assert_eq!(summary.licenses_issued.len(), 2, "step {}", n);
            for emp in [&a, &b] {
                let issued: Vec<_> = repo
                    .list_licenses_for_employee(emp.id)
                    .await
                    .unwrap()
                    .into_iter()
                    .filter(|l| l.source_training_id == Some(training.id))
                    .collect();
                assert_eq!(issued.len(), 1, "step {}", n);
            }
        }
        assert!(failures > 0);
    }

    #[tokio::test]
    async fn test_completed_training_is_frozen() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        complete_training(&repo, training.id, date(2026, 3, 2))
            .await
            .unwrap();

        let again = complete_training(&repo, training.id, date(2026, 3, 3)).await;
        assert!(matches!(again, Err(RepositoryError::Conflict { .. })));

        let edit = update_training(&repo, training.id, &training.to_draft()).await;
        assert!(matches!(edit, Err(RepositoryError::Conflict { .. })));

        let emp = employee(&repo, "late").await;
        let join = add_participant(&repo, training.id, &AddParticipantRequest::new(emp.id)).await;
        assert!(matches!(join, Err(RepositoryError::Conflict { .. })));

        assert!(cancel_training(&repo, training.id).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_training_keeps_participants() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        let emp = employee(&repo, "E1").await;
        add_participant(&repo, training.id, &AddParticipantRequest::new(emp.id))
            .await
            .unwrap();

        let cancelled = cancel_training(&repo, training.id).await.unwrap();
        assert_eq!(cancelled.status, TrainingStatus::Cancelled);
        assert_eq!(repo.list_participants(training.id).await.unwrap().len(), 1);

        // idempotent
        assert!(cancel_training(&repo, training.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_license_derives_expiry() {
        let repo = LocalRepository::new();
        let certificate = create_certificate(
            &repo,
            &CertificateDefinitionDraft::new("ADR basic", Some(24)),
        )
        .await
        .unwrap();
        let emp = employee(&repo, "E1").await;

        let license = create_license(&repo, emp.id, &LicenseDraft::new(certificate.id, date(2025, 1, 31)))
            .await
            .unwrap();
        assert_eq!(license.expires_on, Some(date(2027, 1, 31)));
    }

    #[tokio::test]
    async fn test_converted_plan_is_frozen() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        let plan = create_plan(&repo, &PlanDraft::new("Spring batch")).await.unwrap();
        repo.mark_plan_converted(plan.id, training.id).await.unwrap();

        let err = update_plan(&repo, plan.id, &PlanDraft::new("Renamed"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_plan_cannot_start_converted() {
        let repo = LocalRepository::new();
        let mut draft = PlanDraft::new("Shortcut");
        draft.status = PlanStatus::Converted;
        assert!(matches!(
            create_plan(&repo, &draft).await,
            Err(RepositoryError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_profile_checks_employee_link() {
        let repo = LocalRepository::new();
        let mut draft = ProfileDraft::new("planner@example.nl", "Planner", Role::Planner);
        draft.employee_id = Some(EmployeeId(404));
        let err = create_profile(&repo, &draft).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_delete_employee_reports_cascade() {
        let repo = LocalRepository::new();
        let course = code95_course(&repo, None).await;
        let training = training_on(&repo, &course, &[date(2026, 3, 2)]).await;
        let emp = employee(&repo, "A").await;
        let other = employee(&repo, "B").await;

        let participant = add_participant(&repo, training.id, &AddParticipantRequest::new(emp.id))
            .await
            .unwrap();
        let certificate = course.certificate_id.unwrap();
        let license = create_license(&repo, emp.id, &LicenseDraft::new(certificate, date(2025, 1, 1)))
            .await
            .unwrap();
        let leave = create_availability(
            &repo,
            emp.id,
            &AvailabilityDraft::new(AvailabilityKind::Leave, date(2026, 4, 1), date(2026, 4, 3)),
        )
        .await
        .unwrap();
        let mut plan = PlanDraft::new("Autumn");
        plan.items = vec![PlanItem::new(emp.id)];
        let plan = create_plan(&repo, &plan).await.unwrap();
        let untouched = create_plan(&repo, &PlanDraft::new("Empty")).await.unwrap();
        add_participant(&repo, training.id, &AddParticipantRequest::new(other.id))
            .await
            .unwrap();

        let cascade = delete_employee(&repo, emp.id).await.unwrap();
        assert_eq!(cascade.participants, vec![participant.id]);
        assert_eq!(cascade.licenses, vec![license.id]);
        assert_eq!(cascade.availability, vec![leave.id]);
        assert_eq!(cascade.plans, vec![plan.id]);
        assert!(!cascade.plans.contains(&untouched.id));
        assert!(repo.get_employee(emp.id).await.is_err());
        assert_eq!(repo.list_participants(training.id).await.unwrap().len(), 1);

        assert!(matches!(
            delete_employee(&repo, emp.id).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }
}
