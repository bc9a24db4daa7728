//! Calendar view: one event per training session.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::api::*;
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::services::filtering::title_of;
use crate::services::i18n::{Language, Localized};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    /// `"{training}-{session index}"`
    pub id: String,
    pub training_id: TrainingId,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: TrainingStatus,
    pub color: &'static str,
    pub status_label: &'static str,
    pub location: Option<String>,
    pub provider_name: Option<String>,
    pub participant_count: usize,
    pub capacity: Option<u32>,
}

/// Inclusive date window; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct CalendarWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl CalendarWindow {
    fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }
}

pub fn status_color(status: TrainingStatus) -> &'static str {
    match status {
        TrainingStatus::Planned => "#3b82f6",
        TrainingStatus::Confirmed => "#22c55e",
        TrainingStatus::Completed => "#6b7280",
        TrainingStatus::Cancelled => "#ef4444",
    }
}

/// Everything the transformation looks up besides the trainings.
#[derive(Debug, Clone, Default)]
pub struct CalendarLookup {
    pub courses: HashMap<CourseId, Course>,
    pub provider_names: HashMap<ProviderId, String>,
    pub participant_counts: HashMap<TrainingId, usize>,
}

impl CalendarLookup {
    fn course_titles(&self) -> HashMap<CourseId, String> {
        self.courses
            .iter()
            .map(|(id, c)| (*id, c.title.clone()))
            .collect()
    }
}

/// Expand trainings into session events inside `window`, sorted by start
/// then training id.
pub fn build_events(
    trainings: &[Training],
    lookup: &CalendarLookup,
    window: CalendarWindow,
    lang: Language,
) -> Vec<CalendarEvent> {
    let titles = lookup.course_titles();
    let mut events = Vec::new();
    for training in trainings {
        let course = lookup.courses.get(&training.course_id);
        let base_title = title_of(training, &titles);
        let provider_name = training
            .provider_id
            .or_else(|| course.and_then(|c| c.provider_id))
            .and_then(|id| lookup.provider_names.get(&id).cloned());
        let capacity = training
            .max_participants
            .or_else(|| course.and_then(|c| c.max_participants));
        let participant_count = lookup
            .participant_counts
            .get(&training.id)
            .copied()
            .unwrap_or(0);
        let total = training.sessions.len();

        for (index, session) in training.sessions.iter().enumerate() {
            if !window.contains(session.date) {
                continue;
            }
            let title = if total > 1 {
                format!("{} ({}/{})", base_title, index + 1, total)
            } else {
                base_title.to_string()
            };
            events.push(CalendarEvent {
                id: format!("{}-{}", training.id, index),
                training_id: training.id,
                title,
                start: session.starts_at(),
                end: session.ends_at(),
                status: training.status,
                color: status_color(training.status),
                status_label: training.status.label(lang),
                location: training.location.clone(),
                provider_name: provider_name.clone(),
                participant_count,
                capacity,
            });
        }
    }
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.training_id.cmp(&b.training_id)));
    events
}

/// Load trainings touching `window` and expand them into events.
pub async fn calendar_events<R: FullRepository + ?Sized>(
    repo: &R,
    window: CalendarWindow,
    lang: Language,
) -> RepositoryResult<Vec<CalendarEvent>> {
    let trainings: Vec<Training> = repo
        .list_trainings()
        .await?
        .into_iter()
        .filter(|t| t.overlaps(window.from, window.to))
        .collect();

    let mut lookup = CalendarLookup {
        courses: repo
            .list_courses()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect(),
        provider_names: repo
            .list_providers()
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect(),
        participant_counts: HashMap::new(),
    };
    for training in &trainings {
        let seats = repo
            .list_participants(training.id)
            .await?
            .iter()
            .filter(|p| p.status.occupies_seat())
            .count();
        lookup.participant_counts.insert(training.id, seats);
    }

    Ok(build_events(&trainings, &lookup, window, lang))
}
