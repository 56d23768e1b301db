use crate::playback::{PlayerEvent, PlayerMessage};
use crate::server::{AppContext, AppError};
use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

pub fn player_routes() -> Router<AppContext> {
    Router::new()
        .route("/player/message", post(post_message))
        .route("/player/events", get(events_handler))
        .route("/player/recent", get(recent_events))
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    #[serde(default = "default_recent_limit")]
    limit: usize,
}

fn default_recent_limit() -> usize {
    10
}

/// Latest player events, newest first, for clients that join late.
async fn recent_events(
    State(ctx): State<AppContext>,
    WithRejection(Query(params), _): WithRejection<Query<RecentParams>, AppError>,
) -> Json<Value> {
    let events = ctx.events.recent_events(params.limit.min(50));
    Json(json!({ "ok": true, "events": events }))
}

async fn post_message(
    State(ctx): State<AppContext>,
    WithRejection(Json(message), _): WithRejection<Json<PlayerMessage>, AppError>,
) -> Result<Json<Value>, AppError> {
    message.validate()?;
    let event = ctx.events.publish(message);
    tracing::debug!(seq = event.seq, kind = ?event.message.kind, "Player message published");
    Ok(Json(json!({ "ok": true, "seq": event.seq })))
}

pub async fn events_handler(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = ctx.events.subscribe();

    // Lagged receivers skip what they missed.
    let stream = BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event: PlayerEvent| {
            let data = serde_json::to_string(&event).unwrap_or_else(|e| {
                format!(r#"{{"error": "serialization failed: {}"}}"#, e)
            });

            Ok(Event::default().id(event.seq.to_string()).data(data))
        });

    let heartbeat =
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
            .map(|_| Ok(Event::default().event("heartbeat").data(r#"{"type":"heartbeat"}"#)));

    let combined = stream.merge(heartbeat);

    Sse::new(combined).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
