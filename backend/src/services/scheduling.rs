//! Session date and time helpers used when scheduling a training.
//!
//! Trainings run on business days. Every generator here moves dates that
//! land on a Saturday or Sunday to the following Monday; public holidays are
//! not considered.

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::api::{TrainingSession, ValidationError};
use crate::define_text_enum;
pub use crate::models::validate_sessions;

/// Upper bound for generated series.
pub const MAX_GENERATED_SESSIONS: u32 = 60;

define_text_enum!(
    /// How consecutive sessions of a series are spaced.
    Recurrence {
        Daily => "daily",
        Weekly => "weekly",
    }
);

/// `date + days`, or a validation error on `field` past the last
/// representable date.
fn add_days(date: NaiveDate, days: u64, field: &'static str) -> Result<NaiveDate, ValidationError> {
    date.checked_add_days(Days::new(days)).ok_or_else(|| {
        ValidationError::new(field, format!("{} is too far in the future to schedule", date))
    })
}

/// `date` itself on a weekday, otherwise the following Monday.
pub fn next_business_day(date: NaiveDate) -> Result<NaiveDate, ValidationError> {
    match date.weekday() {
        Weekday::Sat => add_days(date, 2, "date"),
        Weekday::Sun => add_days(date, 1, "date"),
        _ => Ok(date),
    }
}

/// One week after `date`, moved to Monday when that is a weekend day.
pub fn next_weekly_date(date: NaiveDate) -> Result<NaiveDate, ValidationError> {
    next_business_day(add_days(date, 7, "date")?)
}

/// The business day after `date`.
fn following_business_day(date: NaiveDate) -> Result<NaiveDate, ValidationError> {
    next_business_day(add_days(date, 1, "date")?)
}

/// Copy the times of `sessions[source_index]` onto every session.
pub fn copy_time_to_all_sessions(
    sessions: &mut [TrainingSession],
    source_index: usize,
) -> Result<(), ValidationError> {
    let source = sessions.get(source_index).copied().ok_or_else(|| {
        ValidationError::new(
            "source_index",
            format!("no session at position {}", source_index + 1),
        )
    })?;
    for session in sessions.iter_mut() {
        session.start_time = source.start_time;
        session.end_time = source.end_time;
    }
    Ok(())
}

/// Generate `count` sessions starting at `first_date` (moved off a weekend).
///
/// # Errors
/// Returns a validation error when `count` is zero or above
/// [`MAX_GENERATED_SESSIONS`], when `end` is not after `start`, or when the
/// series runs past the last representable date.
pub fn generate_sessions(
    first_date: NaiveDate,
    count: u32,
    recurrence: Recurrence,
    start: NaiveTime,
    end: NaiveTime,
) -> Result<Vec<TrainingSession>, ValidationError> {
    if count == 0 || count > MAX_GENERATED_SESSIONS {
        return Err(ValidationError::new(
            "count",
            format!("must be between 1 and {}", MAX_GENERATED_SESSIONS),
        ));
    }
    if end <= start {
        return Err(ValidationError::new("end_time", "must be after start_time"));
    }

    let mut sessions = Vec::with_capacity(count as usize);
    let mut date = next_business_day(first_date)
        .map_err(|e| ValidationError::new("first_date", e.message))?;
    for index in 0..count {
        sessions.push(TrainingSession::new(date, start, end));
        if index + 1 < count {
            date = match recurrence {
                Recurrence::Daily => following_business_day(date),
                Recurrence::Weekly => next_weekly_date(date),
            }
            .map_err(|e| ValidationError::new("first_date", e.message))?;
        }
    }
    Ok(sessions)
}

/// Append a session one week after the last one, copying its times.
pub fn append_session(sessions: &mut Vec<TrainingSession>) -> Result<(), ValidationError> {
    let last = sessions
        .iter()
        .max_by_key(|s| s.date)
        .copied()
        .ok_or_else(|| ValidationError::new("sessions", "nothing to continue from"))?;
    let date = next_weekly_date(last.date)
        .map_err(|e| ValidationError::new("sessions", e.message))?;
    sessions.push(TrainingSession::new(date, last.start_time, last.end_time));
    Ok(())
}

/// Input of the stateless session generator endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateSessionsRequest {
    pub first_date: NaiveDate,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_recurrence")]
    pub recurrence: Recurrence,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

fn default_count() -> u32 {
    1
}

fn default_recurrence() -> Recurrence {
    Recurrence::Weekly
}

impl GenerateSessionsRequest {
    pub fn generate(&self) -> Result<Vec<TrainingSession>, ValidationError> {
        generate_sessions(
            self.first_date,
            self.count,
            self.recurrence,
            self.start_time,
            self.end_time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_business_day() {
        // 2026-03-06 is a Friday
        assert_eq!(next_business_day(date(2026, 3, 6)).unwrap(), date(2026, 3, 6));
        assert_eq!(next_business_day(date(2026, 3, 7)).unwrap(), date(2026, 3, 9));
        assert_eq!(next_business_day(date(2026, 3, 8)).unwrap(), date(2026, 3, 9));
    }

    #[test]
    fn test_next_weekly_date() {
        assert_eq!(next_weekly_date(date(2026, 3, 2)).unwrap(), date(2026, 3, 9));
        // a Saturday input lands on the Monday after next week's Saturday
        assert_eq!(next_weekly_date(date(2026, 3, 7)).unwrap(), date(2026, 3, 16));
    }

    #[test]
    fn test_generate_daily_skips_weekend() {
        let sessions =
            generate_sessions(date(2026, 3, 5), 4, Recurrence::Daily, time(9, 0), time(17, 0))
                .unwrap();
        let dates: Vec<_> = sessions.iter().map(|s| s.date).collect();
        assert_eq!(
            dates,
            vec![date(2026, 3, 5), date(2026, 3, 6), date(2026, 3, 9), date(2026, 3, 10)]
        );
        assert!(validate_sessions(&sessions).is_ok());
    }

    #[test]
    fn test_generate_weekly_moves_first_date_off_weekend() {
        let sessions =
            generate_sessions(date(2026, 3, 1), 3, Recurrence::Weekly, time(8, 30), time(12, 0))
                .unwrap();
        let dates: Vec<_> = sessions.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![date(2026, 3, 2), date(2026, 3, 9), date(2026, 3, 16)]);
    }

    #[test]
    fn test_generate_rejects_bad_input() {
        let zero = generate_sessions(date(2026, 3, 2), 0, Recurrence::Daily, time(9, 0), time(17, 0));
        assert_eq!(zero.unwrap_err().field, "count");
        let inverted =
            generate_sessions(date(2026, 3, 2), 2, Recurrence::Daily, time(17, 0), time(9, 0));
        assert_eq!(inverted.unwrap_err().field, "end_time");
    }

    #[test]
    fn test_copy_time_to_all_sessions() {
        let mut sessions = vec![
            TrainingSession::new(date(2026, 3, 2), time(9, 0), time(17, 0)),
            TrainingSession::new(date(2026, 3, 9), time(13, 0), time(15, 0)),
        ];
        copy_time_to_all_sessions(&mut sessions, 1).unwrap();
        assert!(sessions
            .iter()
            .all(|s| s.start_time == time(13, 0) && s.end_time == time(15, 0)));
        assert_eq!(sessions[0].date, date(2026, 3, 2));

        assert!(copy_time_to_all_sessions(&mut sessions, 5).is_err());
    }

    #[test]
    fn test_append_session() {
        let mut sessions = vec![TrainingSession::new(date(2026, 3, 6), time(9, 0), time(12, 0))];
        append_session(&mut sessions).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].date, date(2026, 3, 13));
        assert_eq!(sessions[1].start_time, time(9, 0));

        let mut empty = Vec::new();
        assert!(append_session(&mut empty).is_err());
    }

    #[test]
    fn test_dates_at_the_end_of_the_calendar_are_rejected() {
        assert!(next_weekly_date(NaiveDate::MAX).is_err());

        let err = generate_sessions(NaiveDate::MAX, 2, Recurrence::Weekly, time(9, 0), time(10, 0))
            .unwrap_err();
        assert_eq!(err.field, "first_date");
        let err = generate_sessions(NaiveDate::MAX, 3, Recurrence::Daily, time(9, 0), time(10, 0))
            .unwrap_err();
        assert_eq!(err.field, "first_date");

        let mut sessions = vec![TrainingSession::new(NaiveDate::MAX, time(9, 0), time(10, 0))];
        assert_eq!(append_session(&mut sessions).unwrap_err().field, "sessions");
        assert_eq!(sessions.len(), 1);
    }
}
