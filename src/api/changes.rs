//! Server-sent change events

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};
use utoipa::IntoParams;

use crate::{services::changes::ChangeTable, AppState};

#[derive(Deserialize, IntoParams)]
pub struct ChangesQuery {
    /// Only events for this table
    pub table: Option<ChangeTable>,
}

/// Stream row changes as they are committed
#[utoipa::path(
    get,
    path = "/changes",
    tag = "changes",
    params(ChangesQuery),
    responses(
        (status = 200, description = "text/event-stream of change events", body = crate::services::changes::ChangeEvent, content_type = "text/event-stream")
    )
)]
pub async fn stream_changes(
    State(state): State<AppState>,
    Query(query): Query<ChangesQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state.services.changes.stream(query.table).map(|change| {
        let event = Event::default().event("change");
        Ok(match event.json_data(&change) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("Failed to encode change event: {}", e);
                Event::default().comment("encoding error")
            }
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
