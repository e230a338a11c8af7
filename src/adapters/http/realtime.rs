//! Server-sent events endpoint for the invalidation relay.
//!
//! `GET /api/realtime/stream`. The SSE `id` is the event-log cursor of the
//! last fully sent row, so a browser `EventSource` resumes from it through
//! `Last-Event-ID` without skipping a table of a partly sent row.

use std::convert::Infallible;

use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    response::sse::{Event, Sse},
};
use futures::{Stream, StreamExt};

use super::error::ApiError;
use super::middleware::session_token;
use super::state::AppState;
use crate::application::RelayFrame;
use crate::domain::foundation::AuthError;

pub const LAST_EVENT_ID_HEADER: &str = "last-event-id";

pub async fn realtime_stream(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if let Some(validator) = &state.sessions {
        let token = session_token(&headers, &uri, &state.session_cookie)
            .ok_or(AuthError::MissingToken)?;
        let user = validator.validate(&token).await?;
        tracing::debug!(tenant_id = %user.tenant_id, "Relay stream authorized");
    }

    let last_event_id = headers
        .get(LAST_EVENT_ID_HEADER)
        .and_then(|v| v.to_str().ok());

    let connection = state.relay.open(last_event_id).await.map_err(|e| {
        tracing::warn!(error = %e, "Relay connection could not start");
        ApiError::Unavailable("Event log")
    })?;
    tracing::info!(connection_id = %connection.id, cursor = connection.cursor, "Relay stream opened");

    let events = connection
        .into_frames()
        .filter_map(|frame| async move { to_sse_event(&frame) })
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(events))
}

/// Renders one relay frame as an SSE event.
pub fn to_sse_event(frame: &RelayFrame) -> Option<Event> {
    let message = &frame.message;
    let data = match message.data() {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping unserializable relay message");
            return None;
        }
    };

    let event = Event::default().event(message.event_name()).data(data);
    Some(match frame.resume_id {
        Some(cursor) => event.id(cursor.to_string()),
        None => event,
    })
}
