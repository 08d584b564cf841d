use std::convert::Infallible;
use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::server::SharedOrchestrator;

const DEFAULT_TAIL: u32 = 100;

#[derive(Deserialize)]
pub(crate) struct LogsQuery {
    tail: Option<u32>,
}

pub(crate) async fn logs(
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
    State(orchestrator): State<SharedOrchestrator>,
) -> Result<String, ApiError> {
    let logs = orchestrator.manager.get_logs(&id, Some(query.tail.unwrap_or(DEFAULT_TAIL))).await?;

    Ok(logs)
}

/// Follows the container output as server-sent events, one line per event.
/// The daemon connection is released when the client goes away.
pub(crate) async fn stream_logs(
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
    State(orchestrator): State<SharedOrchestrator>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let lines = orchestrator.manager.stream_logs(&id, query.tail).await?;

    let events = lines.map(|line| {
        Ok(match line {
            Ok(line) => Event::default().data(line),
            Err(e) => Event::default().event("error").data(e.to_string()),
        })
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
