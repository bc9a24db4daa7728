//! Scheduled trainings, their sessions and participants.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_optional, ValidationError, ValidationResult};
use crate::api::{CourseId, EmployeeId, ParticipantId, ProviderId, TrainingId};
use crate::define_text_enum;

define_text_enum!(
    /// Lifecycle of a scheduled training.
    TrainingStatus {
        Planned => "planned",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
);

impl Default for TrainingStatus {
    fn default() -> Self {
        TrainingStatus::Planned
    }
}

impl TrainingStatus {
    /// Whether participants can still be added or changed.
    pub fn is_open(&self) -> bool {
        matches!(self, TrainingStatus::Planned | TrainingStatus::Confirmed)
    }
}

define_text_enum!(
    /// Enrollment state of one employee in one training.
    ParticipantStatus {
        Enrolled => "enrolled",
        Attended => "attended",
        Completed => "completed",
        NoShow => "no_show",
        Cancelled => "cancelled",
    }
);

impl Default for ParticipantStatus {
    fn default() -> Self {
        ParticipantStatus::Enrolled
    }
}

impl ParticipantStatus {
    /// Cancelled enrollments free their seat.
    pub fn occupies_seat(&self) -> bool {
        !matches!(self, ParticipantStatus::Cancelled)
    }
}

/// One day of a training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TrainingSession {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            date,
            start_time,
            end_time,
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end_time - self.start_time).num_minutes() as f64 / 60.0
    }
}

/// Sessions must exist, end after they start and fall on distinct dates.
pub fn validate_sessions(sessions: &[TrainingSession]) -> ValidationResult {
    if sessions.is_empty() {
        return Err(ValidationError::new(
            "sessions",
            "a training needs at least one session",
        ));
    }
    let mut seen = HashSet::new();
    for (index, session) in sessions.iter().enumerate() {
        if session.end_time <= session.start_time {
            return Err(ValidationError::new(
                "sessions",
                format!("session {} ends before it starts", index + 1),
            ));
        }
        if !seen.insert(session.date) {
            return Err(ValidationError::new(
                "sessions",
                format!("more than one session on {}", session.date),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDraft {
    pub course_id: CourseId,
    #[serde(default)]
    pub provider_id: Option<ProviderId>,
    /// Overrides the course title in listings and the calendar.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub status: TrainingStatus,
    #[serde(default)]
    pub max_participants: Option<u32>,
    pub sessions: Vec<TrainingSession>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TrainingDraft {
    pub fn new(course_id: CourseId, sessions: Vec<TrainingSession>) -> Self {
        Self {
            course_id,
            provider_id: None,
            title: None,
            location: None,
            instructor: None,
            status: TrainingStatus::Planned,
            max_participants: None,
            sessions,
            notes: None,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        validate_sessions(&self.sessions)?;
        if self.max_participants == Some(0) {
            return Err(ValidationError::new(
                "max_participants",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Training {
    pub id: TrainingId,
    pub course_id: CourseId,
    pub provider_id: Option<ProviderId>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    pub status: TrainingStatus,
    pub max_participants: Option<u32>,
    /// Always sorted by date.
    pub sessions: Vec<TrainingSession>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Training {
    pub fn from_draft(id: TrainingId, draft: &TrainingDraft, now: DateTime<Utc>) -> Self {
        let mut sessions = draft.sessions.clone();
        sessions.sort_by_key(|s| (s.date, s.start_time));
        Self {
            id,
            course_id: draft.course_id,
            provider_id: draft.provider_id,
            title: normalize_optional(draft.title.clone()),
            location: normalize_optional(draft.location.clone()),
            instructor: normalize_optional(draft.instructor.clone()),
            status: draft.status,
            max_participants: draft.max_participants,
            sessions,
            notes: normalize_optional(draft.notes.clone()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: &TrainingDraft, now: DateTime<Utc>) {
        let created_at = self.created_at;
        *self = Self::from_draft(self.id, draft, now);
        self.created_at = created_at;
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.sessions.first().map(|s| s.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.sessions.last().map(|s| s.date)
    }

    pub fn total_hours(&self) -> f64 {
        self.sessions.iter().map(TrainingSession::duration_hours).sum()
    }

    /// Whether any session falls inside `[from, to]` (either bound optional).
    pub fn overlaps(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        self.sessions.iter().any(|s| {
            from.map_or(true, |f| s.date >= f) && to.map_or(true, |t| s.date <= t)
        })
    }

    /// Draft carrying the current values, used for partial updates.
    pub fn to_draft(&self) -> TrainingDraft {
        TrainingDraft {
            course_id: self.course_id,
            provider_id: self.provider_id,
            title: self.title.clone(),
            location: self.location.clone(),
            instructor: self.instructor.clone(),
            status: self.status,
            max_participants: self.max_participants,
            sessions: self.sessions.clone(),
            notes: self.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantDraft {
    pub employee_id: EmployeeId,
    #[serde(default)]
    pub status: ParticipantStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ParticipantDraft {
    pub fn new(employee_id: EmployeeId) -> Self {
        Self {
            employee_id,
            status: ParticipantStatus::Enrolled,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParticipant {
    pub id: ParticipantId,
    pub training_id: TrainingId,
    pub employee_id: EmployeeId,
    pub status: ParticipantStatus,
    pub code95_points_awarded: u32,
    pub notes: Option<String>,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingParticipant {
    pub fn from_draft(
        id: ParticipantId,
        training_id: TrainingId,
        draft: &ParticipantDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            training_id,
            employee_id: draft.employee_id,
            status: draft.status,
            code95_points_awarded: 0,
            notes: normalize_optional(draft.notes.clone()),
            enrolled_at: now,
            updated_at: now,
        }
    }
}
