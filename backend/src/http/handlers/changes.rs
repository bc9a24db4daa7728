//! Realtime change notifications over Server-Sent Events.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;

use crate::http::dto::ChangesQuery;
use crate::http::extract::CurrentUser;
use crate::http::state::AppState;

/// GET /v1/changes?tables=trainings,training_participants
///
/// Stream change events as SSE (`event: change`). Any signed-in user may
/// subscribe; the events only carry table, action and id, so clients refetch
/// through the permission-checked endpoints.
pub async fn stream_changes(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ChangesQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.changes.subscribe(&query.tables);
    tracing::debug!(profile = %user.context.profile_id, "change stream opened");

    let stream = async_stream::stream! {
        while let Some(change) = subscription.next().await {
            let event_data = serde_json::to_string(&change).unwrap_or_default();
            yield Ok(Event::default().event("change").data(event_data));
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
