//! Data Transfer Objects for the HTTP API.
//!
//! Domain models, service outcomes and query filters already derive
//! Serialize/Deserialize and are used as-is; this module only holds the
//! request and response shapes that exist purely for the HTTP surface.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{ProfileId, Training, TrainingParticipant, TrainingSession};
use crate::models::{validate_sessions, ValidationError};
use crate::services::changes::ChangeTable;
use crate::services::filtering::comma_separated;
use crate::services::scheduling::{append_session, copy_time_to_all_sessions, GenerateSessionsRequest};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Envelope for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

/// Request body for issuing a bearer token to a profile.
///
/// The profile is identified by id or by email.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueSessionRequest {
    #[serde(default)]
    pub profile_id: Option<ProfileId>,
    #[serde(default)]
    pub email: Option<String>,
    /// Overrides the configured session lifetime.
    #[serde(default)]
    pub ttl_hours: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignOutResponse {
    pub revoked: bool,
}

/// A training with its participants and seat usage.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingDetail {
    #[serde(flatten)]
    pub training: Training,
    /// Display title: the override, else the course title.
    pub display_title: String,
    pub participants: Vec<TrainingParticipant>,
    pub seats_taken: usize,
    /// Training limit, else the course limit.
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteTrainingRequest {
    /// Defaults to the last session date, or today for a training without
    /// sessions.
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
}

/// Query parameters for the compliance overview.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComplianceQuery {
    /// Only employees with an expired/expiring license or Code 95 at risk.
    pub attention_only: bool,
    /// Evaluate as of this date instead of today.
    pub date: Option<NaiveDate>,
}

/// Query parameters for the change stream, e.g. `?tables=trainings,employees`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChangesQuery {
    #[serde(deserialize_with = "comma_separated")]
    pub tables: Vec<ChangeTable>,
}

/// Stateless session editing helpers behind `POST /v1/scheduling/sessions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SessionsRequest {
    /// Generate a daily or weekly series.
    Generate(GenerateSessionsRequest),
    /// Append a session one week after the last one.
    Append { sessions: Vec<TrainingSession> },
    /// Copy the times of session `source_index` onto all sessions.
    CopyTime {
        sessions: Vec<TrainingSession>,
        source_index: usize,
    },
    /// Check the list as a training would.
    Validate { sessions: Vec<TrainingSession> },
}

impl SessionsRequest {
    pub fn run(self) -> Result<Vec<TrainingSession>, ValidationError> {
        match self {
            SessionsRequest::Generate(request) => request.generate(),
            SessionsRequest::Append { mut sessions } => {
                append_session(&mut sessions)?;
                Ok(sessions)
            }
            SessionsRequest::CopyTime {
                mut sessions,
                source_index,
            } => {
                copy_time_to_all_sessions(&mut sessions, source_index)?;
                Ok(sessions)
            }
            SessionsRequest::Validate { mut sessions } => {
                validate_sessions(&sessions)?;
                sessions.sort_by_key(|s| (s.date, s.start_time));
                Ok(sessions)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<TrainingSession>,
    pub total_hours: f64,
}

impl From<Vec<TrainingSession>> for SessionsResponse {
    fn from(sessions: Vec<TrainingSession>) -> Self {
        Self {
            total_hours: sessions.iter().map(TrainingSession::duration_hours).sum(),
            sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_sessions_request_is_tagged_by_op() {
        let request: SessionsRequest = serde_json::from_value(serde_json::json!({
            "op": "generate",
            "first_date": "2026-03-02",
            "count": 3,
            "recurrence": "daily",
            "start_time": "09:00:00",
            "end_time": "12:30:00",
        }))
        .unwrap();
        let response = SessionsResponse::from(request.run().unwrap());
        assert_eq!(response.sessions.len(), 3);
        assert!((response.total_hours - 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_copy_time_out_of_range() {
        let session = TrainingSession::new(
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        );
        let request = SessionsRequest::CopyTime {
            sessions: vec![session],
            source_index: 4,
        };
        let err = request.run().unwrap_err();
        assert_eq!(err.field, "source_index");
    }

    #[test]
    fn test_changes_query_tables() {
        let query: ChangesQuery =
            serde_json::from_value(serde_json::json!({"tables": "trainings,profiles"})).unwrap();
        assert_eq!(query.tables, vec![ChangeTable::Trainings, ChangeTable::Profiles]);
        let all: ChangesQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(all.tables.is_empty());
    }
}
