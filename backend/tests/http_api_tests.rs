//! HTTP API tests: the axum router driven with `oneshot` against the
//! in-memory repository.

#![cfg(feature = "http-server")]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use training_hub::db::repositories::LocalRepository;
use training_hub::db::repository::FullRepository;
use training_hub::http::{create_router, AppState};
use training_hub::services::changes::{ChangeAction, ChangeTable};

const ADMIN_TOKEN: &str = "admin-token";

async fn setup() -> (Router, AppState) {
    let repo = Arc::new(LocalRepository::new()) as Arc<dyn FullRepository>;
    let state = AppState::new(repo);
    state
        .auth
        .ensure_bootstrap_admin("admin@example.com", ADMIN_TOKEN)
        .await
        .unwrap();
    (create_router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn admin(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(app, method, uri, Some(ADMIN_TOKEN), body).await
}

async fn create(app: &Router, uri: &str, body: Value) -> i64 {
    let (status, value) = admin(app, Method::POST, uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {} failed: {}", uri, value);
    value["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = setup().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_v1_requires_a_valid_token() {
    let (app, _) = setup().await;
    let (status, body) = send(&app, Method::GET, "/v1/employees", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/v1/employees", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_employee_crud_publishes_changes() {
    let (app, state) = setup().await;
    let mut feed = state.changes.subscribe(&[ChangeTable::Employees]);

    let id = create(
        &app,
        "/v1/employees",
        json!({"employee_number": "E-1", "first_name": "Anna", "last_name": "Bakker"}),
    )
    .await;

    let event = feed.next().await.unwrap();
    assert_eq!(event.action, ChangeAction::Insert);
    assert_eq!(event.id, id);

    let (status, list) = admin(&app, Method::GET, "/v1/employees?search=bak", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);

    let (status, body) = admin(
        &app,
        Method::POST,
        "/v1/employees",
        Some(json!({"employee_number": " ", "first_name": "X", "last_name": "Y"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = admin(&app, Method::DELETE, &format!("/v1/employees/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = admin(&app, Method::GET, &format!("/v1/employees/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_employee_delete_announces_dependent_rows() {
    let (app, state) = setup().await;
    let id = create(
        &app,
        "/v1/employees",
        json!({"employee_number": "E-1", "first_name": "Anna", "last_name": "Bakker"}),
    )
    .await;
    let leave = create(
        &app,
        &format!("/v1/employees/{}/availability", id),
        json!({"kind": "leave", "start_date": "2026-04-01", "end_date": "2026-04-03"}),
    )
    .await;

    let mut feed = state.changes.subscribe(&[]);
    let (status, _) = admin(&app, Method::DELETE, &format!("/v1/employees/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let first = feed.next().await.unwrap();
    assert_eq!(first.table, ChangeTable::EmployeeAvailability);
    assert_eq!(first.action, ChangeAction::Delete);
    assert_eq!(first.id, leave);
    let last = feed.next().await.unwrap();
    assert_eq!(last.table, ChangeTable::Employees);
    assert_eq!(last.id, id);
}

#[tokio::test]
async fn test_change_stream_over_sse_with_query_token() {
    let (app, _) = setup().await;
    let request = Request::builder()
        .uri(format!("/v1/changes?tables=employees&access_token={}", ADMIN_TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let id = create(
        &app,
        "/v1/employees",
        json!({"employee_number": "E-9", "first_name": "Sven", "last_name": "Smit"}),
    )
    .await;

    let mut body = response.into_body().into_data_stream();
    let mut text = String::new();
    while !text.contains("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
            .await
            .expect("no change event within two seconds")
            .expect("stream ended")
            .unwrap();
        text.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(text.contains("event: change"), "{}", text);
    let data = text
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap();
    let event: Value = serde_json::from_str(data).unwrap();
    assert_eq!(event["table"], "employees");
    assert_eq!(event["action"], "insert");
    assert_eq!(event["id"], id);
}

#[tokio::test]
async fn test_employee_role_sees_only_own_records() {
    let (app, _) = setup().await;
    let own = create(
        &app,
        "/v1/employees",
        json!({"employee_number": "E-1", "first_name": "Anna", "last_name": "Bakker"}),
    )
    .await;
    let other = create(
        &app,
        "/v1/employees",
        json!({"employee_number": "E-2", "first_name": "Bram", "last_name": "Jansen"}),
    )
    .await;
    let profile = create(
        &app,
        "/v1/profiles",
        json!({"email": "anna@example.com", "display_name": "Anna", "role": "employee", "employee_id": own}),
    )
    .await;

    let (status, issued) = admin(
        &app,
        Method::POST,
        "/v1/auth/sessions",
        Some(json!({"email": "ANNA@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issued["profile_id"], profile);
    let token = issued["token"].as_str().unwrap().to_string();

    let (status, me) = send(&app, Method::GET, "/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "employee");
    assert_eq!(me["source"], "role");
    assert!(me["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("view_own_records")));

    let (status, _) = send(&app, Method::GET, "/v1/employees", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) =
        send(&app, Method::GET, &format!("/v1/employees/{}", own), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) =
        send(&app, Method::GET, &format!("/v1/employees/{}", other), Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    let (status, _) =
        send(&app, Method::GET, &format!("/v1/employees/{}/code95", own), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, out) =
        send(&app, Method::DELETE, "/v1/auth/sessions/current", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["revoked"], true);
    let (status, _) = send(&app, Method::GET, "/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_training_capacity_and_completion() {
    let (app, _) = setup().await;
    let cert = create(&app, "/v1/certificates", json!({"name": "Heftruck", "validity_months": 60})).await;
    let course = create(
        &app,
        "/v1/courses",
        json!({
            "title": "Heftruck basis",
            "duration_hours": 7.0,
            "code95_points": 7,
            "certificate_id": cert,
            "max_participants": 1
        }),
    )
    .await;
    let training = create(
        &app,
        "/v1/trainings",
        json!({
            "course_id": course,
            "sessions": [
                {"date": "2026-03-03", "start_time": "09:00:00", "end_time": "16:00:00"},
                {"date": "2026-03-02", "start_time": "09:00:00", "end_time": "16:00:00"}
            ]
        }),
    )
    .await;
    let anna = create(
        &app,
        "/v1/employees",
        json!({"employee_number": "E-1", "first_name": "Anna", "last_name": "Bakker", "is_driver": true}),
    )
    .await;
    let bram = create(
        &app,
        "/v1/employees",
        json!({"employee_number": "E-2", "first_name": "Bram", "last_name": "Jansen"}),
    )
    .await;

    let participants = format!("/v1/trainings/{}/participants", training);
    create(&app, &participants, json!({"employee_id": anna})).await;
    let (status, body) = admin(&app, Method::POST, &participants, Some(json!({"employee_id": bram}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert!(body["message"].as_str().unwrap().contains("is full"));

    let (status, detail) = admin(&app, Method::GET, &format!("/v1/trainings/{}", training), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["display_title"], "Heftruck basis");
    assert_eq!(detail["seats_taken"], 1);
    assert_eq!(detail["capacity"], 1);
    assert_eq!(detail["sessions"][0]["date"], "2026-03-02");

    let (status, summary) =
        admin(&app, Method::POST, &format!("/v1/trainings/{}/complete", training), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["completion_date"], "2026-03-03");
    assert_eq!(summary["code95_points_awarded"], 7);
    assert_eq!(summary["licenses_issued"][0]["expires_on"], "2031-03-03");

    let (status, licenses) =
        admin(&app, Method::GET, &format!("/v1/employees/{}/licenses", anna), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(licenses["total"], 1);

    let (status, _) = admin(
        &app,
        Method::POST,
        &format!("/v1/trainings/{}/cancel", training),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_calendar_labels_follow_language() {
    let (app, _) = setup().await;
    let course = create(&app, "/v1/courses", json!({"title": "EHBO", "duration_hours": 4.0})).await;
    create(
        &app,
        "/v1/trainings",
        json!({
            "course_id": course,
            "status": "confirmed",
            "sessions": [{"date": "2026-04-07", "start_time": "13:00:00", "end_time": "17:00:00"}]
        }),
    )
    .await;

    let (status, events) = admin(
        &app,
        Method::GET,
        "/v1/calendar?from=2026-04-01&to=2026-04-30&lang=nl",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events["total"], 1);
    assert_eq!(events["items"][0]["title"], "EHBO");
    assert_eq!(events["items"][0]["color"], "#22c55e");
    assert_eq!(events["items"][0]["status_label"], "Bevestigd");

    let (_, outside) = admin(&app, Method::GET, "/v1/calendar?from=2026-05-01", None).await;
    assert_eq!(outside["total"], 0);
}

#[tokio::test]
async fn test_scheduling_helper_generates_sessions() {
    let (app, _) = setup().await;
    let (status, body) = admin(
        &app,
        Method::POST,
        "/v1/scheduling/sessions",
        Some(json!({
            "op": "generate",
            "first_date": "2026-03-07",
            "count": 2,
            "recurrence": "weekly",
            "start_time": "09:00:00",
            "end_time": "11:00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // A Saturday start moves to Monday.
    assert_eq!(body["sessions"][0]["date"], "2026-03-09");
    assert_eq!(body["sessions"][1]["date"], "2026-03-16");
    assert_eq!(body["total_hours"], 4.0);

    let (status, body) = admin(
        &app,
        Method::POST,
        "/v1/scheduling/sessions",
        Some(json!({"op": "validate", "sessions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("sessions:"));
}
