//! Preliminary plans: candidate suggestions and conversion into a training.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::api::*;
use crate::db::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::db::services::{self, AddParticipantRequest, AvailabilityConflict};
use crate::define_text_enum;

pub const DEFAULT_HORIZON_DAYS: u32 = 90;
/// Ten years; suggestions further out are not meaningful.
pub const MAX_HORIZON_DAYS: u32 = 3650;

define_text_enum!(
    /// Why an employee needs a certificate (re)issued.
    CandidateReason {
        Expired => "expired",
        Missing => "missing",
        Expiring => "expiring",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub employee_id: EmployeeId,
    pub employee_number: String,
    pub name: String,
    pub department: Option<String>,
    pub reason: CandidateReason,
    pub expires_on: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SuggestionQuery {
    pub certificate_id: CertificateId,
    #[serde(default = "default_horizon")]
    pub horizon_days: u32,
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_DAYS
}

/// Active employees whose license for `certificate_id` is missing, expired
/// or expires within `horizon_days` of `today`.
///
/// Expired licenses come first (longest overdue first), then missing ones,
/// then those expiring soonest. A certificate held without expiry never
/// produces a candidate. `horizon_days` above [`MAX_HORIZON_DAYS`] is a
/// validation error.
pub async fn suggest_candidates<R: FullRepository + ?Sized>(
    repo: &R,
    certificate_id: CertificateId,
    horizon_days: u32,
    today: NaiveDate,
) -> RepositoryResult<Vec<Candidate>> {
    if horizon_days > MAX_HORIZON_DAYS {
        return Err(RepositoryError::validation(format!(
            "horizon_days: must be at most {}",
            MAX_HORIZON_DAYS
        )));
    }
    let horizon = today
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .ok_or_else(|| {
            RepositoryError::validation(format!(
                "horizon_days: {} days after {} is out of range",
                horizon_days, today
            ))
        })?;
    repo.get_certificate(certificate_id).await?;

    // Latest expiry per employee; `Some(None)` means held without expiry.
    let mut held: HashMap<EmployeeId, Option<NaiveDate>> = HashMap::new();
    for license in repo.list_licenses().await? {
        if license.certificate_id != certificate_id {
            continue;
        }
        let entry = held.entry(license.employee_id).or_insert(license.expires_on);
        *entry = match (*entry, license.expires_on) {
            (None, _) | (_, None) => None,
            (Some(a), Some(b)) => Some(a.max(b)),
        };
    }

    let mut candidates = Vec::new();
    for employee in repo.list_employees().await? {
        if !employee.active {
            continue;
        }
        let (reason, expires_on) = match held.get(&employee.id) {
            None => (CandidateReason::Missing, None),
            Some(None) => continue,
            Some(Some(expiry)) if *expiry < today => (CandidateReason::Expired, Some(*expiry)),
            Some(Some(expiry)) if *expiry <= horizon => (CandidateReason::Expiring, Some(*expiry)),
            Some(Some(_)) => continue,
        };
        candidates.push(Candidate {
            employee_id: employee.id,
            employee_number: employee.employee_number.clone(),
            name: employee.full_name(),
            department: employee.department.clone(),
            reason,
            expires_on,
            days_remaining: expires_on.map(|e| (e - today).num_days()),
        });
    }

    candidates.sort_by(|a, b| {
        a.reason
            .cmp(&b.reason)
            .then_with(|| a.expires_on.cmp(&b.expires_on))
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(candidates)
}

/// Scheduling details for the training a plan turns into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertPlanRequest {
    /// Required unless the plan already names a course.
    #[serde(default)]
    pub course_id: Option<CourseId>,
    #[serde(default)]
    pub provider_id: Option<ProviderId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    pub sessions: Vec<TrainingSession>,
}

/// A plan item that could not become a participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub employee_id: EmployeeId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    pub plan: PreliminaryPlan,
    pub training: Training,
    pub participants: Vec<TrainingParticipant>,
    pub skipped: Vec<SkippedItem>,
    pub conflicts: Vec<AvailabilityConflict>,
}

/// Turn a draft or finalized plan into a scheduled training.
///
/// Every plan item is enrolled. Availability clashes do not stop the
/// conversion and are reported in the outcome; items rejected for another
/// reason (inactive employee, full training) are listed as skipped.
///
/// When a step after the training was created fails, the training is
/// deleted again and the plan stays unconverted, so the call can be retried.
pub async fn convert_plan<R: FullRepository + ?Sized>(
    repo: &R,
    plan_id: PlanId,
    request: &ConvertPlanRequest,
) -> RepositoryResult<ConversionOutcome> {
    let plan = repo.get_plan(plan_id).await?;
    if plan.status == PlanStatus::Converted {
        return Err(RepositoryError::conflict(format!(
            "plan {} was already converted into training {}",
            plan_id,
            plan.converted_training_id
                .map_or_else(|| "-".to_string(), |t| t.to_string())
        )));
    }
    let course_id = request.course_id.or(plan.course_id).ok_or_else(|| {
        RepositoryError::validation("course_id: the plan has no course; pass one to convert")
    })?;
    if plan.items.is_empty() {
        return Err(RepositoryError::validation(
            "items: a plan needs at least one employee to convert",
        ));
    }

    let draft = TrainingDraft {
        course_id,
        provider_id: request.provider_id,
        title: request.title.clone().or_else(|| Some(plan.name.clone())),
        location: request.location.clone(),
        instructor: request.instructor.clone(),
        status: TrainingStatus::Planned,
        max_participants: request.max_participants,
        sessions: request.sessions.clone(),
        notes: plan.notes.clone(),
    };
    let training = services::create_training(repo, &draft).await?;

    match enroll_plan(repo, &plan, training).await {
        Ok(outcome) => {
            info!(
                "Plan {} converted into training {} ({} enrolled, {} skipped, {} conflicts)",
                plan_id,
                outcome.training.id,
                outcome.participants.len(),
                outcome.skipped.len(),
                outcome.conflicts.len()
            );
            Ok(outcome)
        }
        Err((training_id, err)) => {
            warn!(
                "Plan {}: conversion failed, removing training {}: {}",
                plan_id, training_id, err
            );
            if let Err(cleanup) = repo.delete_training(training_id).await {
                warn!(
                    "Plan {}: could not remove training {}: {}",
                    plan_id, training_id, cleanup
                );
            }
            Err(err)
        }
    }
}

/// Enroll the plan's employees into `training` and mark the plan converted.
/// Errors carry the training id so the caller can undo the creation.
async fn enroll_plan<R: FullRepository + ?Sized>(
    repo: &R,
    plan: &PreliminaryPlan,
    training: Training,
) -> Result<ConversionOutcome, (TrainingId, RepositoryError)> {
    let training_id = training.id;
    let fail = |err: RepositoryError| (training_id, err);

    let mut participants = Vec::with_capacity(plan.items.len());
    let mut skipped = Vec::new();
    for item in &plan.items {
        let mut enrollment = AddParticipantRequest::new(item.employee_id);
        enrollment.participant.notes = item.notes.clone();
        enrollment.override_availability = true;
        match services::add_participant(repo, training_id, &enrollment).await {
            Ok(participant) => participants.push(participant),
            Err(
                err @ (RepositoryError::ValidationError { .. } | RepositoryError::Conflict { .. }),
            ) => {
                warn!(
                    "Plan {}: employee {} not enrolled: {}",
                    plan.id,
                    item.employee_id,
                    err.message()
                );
                skipped.push(SkippedItem {
                    employee_id: item.employee_id,
                    reason: err.message().to_string(),
                });
            }
            Err(err) => return Err(fail(err)),
        }
    }

    let conflicts = services::availability_conflicts(repo, training_id)
        .await
        .map_err(fail)?;
    let plan = repo
        .mark_plan_converted(plan.id, training_id)
        .await
        .map_err(fail)?;
    Ok(ConversionOutcome {
        plan,
        training,
        participants,
        skipped,
        conflicts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{PlanningRepository, TrainingRepository};
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn employee(repo: &LocalRepository, number: &str, last: &str) -> Employee {
        services::create_employee(repo, &EmployeeDraft::new(number, "Test", last))
            .await
            .unwrap()
    }

    async fn license(
        repo: &LocalRepository,
        employee: EmployeeId,
        certificate: CertificateId,
        expires_on: NaiveDate,
    ) {
        let mut draft = LicenseDraft::new(certificate, date(2020, 1, 1));
        draft.expires_on = Some(expires_on);
        services::create_license(repo, employee, &draft).await.unwrap();
    }

    #[tokio::test]
    async fn test_suggest_candidates_orders_by_urgency() {
        let repo = LocalRepository::new();
        let cert = services::create_certificate(
            &repo,
            &CertificateDefinitionDraft::new("Forklift", Some(60)),
        )
        .await
        .unwrap();
        let expired = employee(&repo, "1", "Expired").await;
        let missing = employee(&repo, "2", "Missing").await;
        let expiring = employee(&repo, "3", "Expiring").await;
        let fine = employee(&repo, "4", "Fine").await;
        license(&repo, expired.id, cert.id, date(2025, 12, 1)).await;
        license(&repo, expiring.id, cert.id, date(2026, 2, 1)).await;
        license(&repo, fine.id, cert.id, date(2027, 1, 1)).await;

        let candidates = suggest_candidates(&repo, cert.id, 90, date(2026, 1, 1))
            .await
            .unwrap();
        let ids: Vec<_> = candidates.iter().map(|c| c.employee_id).collect();
        assert_eq!(ids, vec![expired.id, missing.id, expiring.id]);
        assert_eq!(candidates[0].days_remaining, Some(-31));
        assert_eq!(candidates[1].reason, CandidateReason::Missing);
    }

    #[tokio::test]
    async fn test_oversized_horizon_is_rejected() {
        let repo = LocalRepository::new();
        let cert = services::create_certificate(
            &repo,
            &CertificateDefinitionDraft::new("Forklift", Some(60)),
        )
        .await
        .unwrap();
        employee(&repo, "1", "Anyone").await;

        let err = suggest_candidates(&repo, cert.id, u32::MAX, date(2026, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        assert!(err.message().starts_with("horizon_days"));

        let err = suggest_candidates(&repo, cert.id, 30, NaiveDate::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));

        let at_limit = suggest_candidates(&repo, cert.id, MAX_HORIZON_DAYS, date(2026, 1, 1))
            .await
            .unwrap();
        assert_eq!(at_limit.len(), 1);
    }

    #[tokio::test]
    async fn test_renewed_license_removes_candidate() {
        let repo = LocalRepository::new();
        let cert = services::create_certificate(
            &repo,
            &CertificateDefinitionDraft::new("ADR", Some(24)),
        )
        .await
        .unwrap();
        let emp = employee(&repo, "1", "Renewed").await;
        license(&repo, emp.id, cert.id, date(2025, 6, 1)).await;
        license(&repo, emp.id, cert.id, date(2027, 6, 1)).await;

        let candidates = suggest_candidates(&repo, cert.id, 90, date(2026, 1, 1))
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    fn request(course_id: Option<CourseId>) -> ConvertPlanRequest {
        ConvertPlanRequest {
            course_id,
            provider_id: None,
            title: None,
            location: Some("Depot Noord".into()),
            instructor: None,
            max_participants: None,
            sessions: vec![TrainingSession::new(
                date(2026, 5, 4),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            )],
        }
    }

    #[tokio::test]
    async fn test_convert_plan_enrolls_items_and_reports_conflicts() {
        let repo = LocalRepository::new();
        let course = services::create_course(&repo, &CourseDraft::new("ADR refresher", 8.0))
            .await
            .unwrap();
        let a = employee(&repo, "1", "Available").await;
        let b = employee(&repo, "2", "OnLeave").await;
        services::create_availability(
            &repo,
            b.id,
            &AvailabilityDraft::new(AvailabilityKind::Leave, date(2026, 5, 1), date(2026, 5, 8)),
        )
        .await
        .unwrap();

        let mut draft = PlanDraft::new("May batch");
        draft.course_id = Some(course.id);
        draft.items = vec![PlanItem::new(a.id), PlanItem::new(b.id)];
        let plan = services::create_plan(&repo, &draft).await.unwrap();

        let outcome = convert_plan(&repo, plan.id, &request(None)).await.unwrap();
        assert_eq!(outcome.plan.status, PlanStatus::Converted);
        assert_eq!(outcome.plan.converted_training_id, Some(outcome.training.id));
        assert_eq!(outcome.training.title.as_deref(), Some("May batch"));
        assert_eq!(outcome.participants.len(), 2);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].employee_id, b.id);
        assert_eq!(
            repo.list_participants(outcome.training.id).await.unwrap().len(),
            2
        );

        let again = convert_plan(&repo, plan.id, &request(None)).await;
        assert!(matches!(again, Err(RepositoryError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_convert_plan_requires_course_and_items() {
        let repo = LocalRepository::new();
        let emp = employee(&repo, "1", "Solo").await;
        let mut draft = PlanDraft::new("No course");
        draft.items = vec![PlanItem::new(emp.id)];
        let plan = services::create_plan(&repo, &draft).await.unwrap();
        let err = convert_plan(&repo, plan.id, &request(None)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));

        let course = services::create_course(&repo, &CourseDraft::new("Empty", 2.0))
            .await
            .unwrap();
        let empty = services::create_plan(&repo, &PlanDraft::new("Empty plan"))
            .await
            .unwrap();
        let err = convert_plan(&repo, empty.id, &request(Some(course.id)))
            .await
            .unwrap_err();
        assert!(err.message().starts_with("items"));
    }

    #[tokio::test]
    async fn test_convert_plan_skips_inactive_employees() {
        let repo = LocalRepository::new();
        let course = services::create_course(&repo, &CourseDraft::new("VCA", 8.0))
            .await
            .unwrap();
        let mut inactive = EmployeeDraft::new("9", "Old", "Timer");
        inactive.active = false;
        let gone = services::create_employee(&repo, &inactive).await.unwrap();
        let here = employee(&repo, "1", "Present").await;

        let mut draft = PlanDraft::new("Mixed");
        draft.items = vec![PlanItem::new(gone.id), PlanItem::new(here.id)];
        let plan = services::create_plan(&repo, &draft).await.unwrap();

        let outcome = convert_plan(&repo, plan.id, &request(Some(course.id)))
            .await
            .unwrap();
        assert_eq!(outcome.participants.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].employee_id, gone.id);
    }

    #[tokio::test]
    async fn test_failed_conversion_leaves_no_training_and_can_be_retried() {
        let mut failures = 0;
        for n in 0..40 {
            let repo = LocalRepository::new();
            let course = services::create_course(&repo, &CourseDraft::new("Tachograph", 7.0))
                .await
                .unwrap();
            let a = employee(&repo, "1", "First").await;
            let b = employee(&repo, "2", "Second").await;
            let mut draft = PlanDraft::new("Retry batch");
            draft.course_id = Some(course.id);
            draft.items = vec![PlanItem::new(a.id), PlanItem::new(b.id)];
            let plan = services::create_plan(&repo, &draft).await.unwrap();

            repo.fail_after(n);
            let outcome = match convert_plan(&repo, plan.id, &request(None)).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    failures += 1;
                    assert!(matches!(err, RepositoryError::ConnectionError { .. }));
                    repo.set_healthy(true);
                    let unchanged = repo.get_plan(plan.id).await.unwrap();
                    assert_ne!(unchanged.status, PlanStatus::Converted, "step {}", n);
                    assert!(repo.list_trainings().await.unwrap().is_empty(), "step {}", n);
                    convert_plan(&repo, plan.id, &request(None)).await.unwrap()
                }
            };
            repo.set_healthy(true);

            assert_eq!(outcome.participants.len(), 2, "step {}", n);
            assert_eq!(repo.list_trainings().await.unwrap().len(), 1, "step {}", n);
            assert_eq!(
                repo.list_participants(outcome.training.id).await.unwrap().len(),
                2
            );
            let plan = repo.get_plan(plan.id).await.unwrap();
            assert_eq!(plan.converted_training_id, Some(outcome.training.id));
        }
        assert!(failures > 0);
    }
}
