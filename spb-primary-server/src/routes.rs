use std::{convert::Infallible, path::Path, sync::Arc};

use axum::{
    extract::State,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::{stream, Stream, StreamExt};
use log::{debug, error};
use serde::Serialize;
use spb_primary::{Broadcaster, GroupView, LogEntry, Store};
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub broadcaster: Broadcaster,
}

/// The first frame of every stream, carrying the full state
#[derive(Serialize)]
struct InitialEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: DateTime<Utc>,
    data: InitialData,
}

#[derive(Serialize)]
struct InitialData {
    groups: Vec<GroupView>,
}

pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/groups", get(groups))
        .route("/groups/stream", get(groups_stream))
        .route("/messages", get(messages))
        .with_state(state);
    let router = Router::new().nest("/api", api);
    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

async fn groups(State(state): State<AppState>) -> Json<Vec<GroupView>> {
    Json(state.store.fetch_all())
}

async fn messages(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.store.messages())
}

fn sse_event<T: Serialize>(value: &T) -> Option<SseEvent> {
    match SseEvent::default().json_data(value) {
        Ok(event) => Some(event),
        Err(e) => {
            error!("Failed to serialize event: {e}");
            None
        }
    }
}

async fn groups_stream(State(state): State<AppState>) -> impl IntoResponse {
    // subscribe before the snapshot so no change between the two is missed
    let subscription = state.broadcaster.subscribe();
    let initial = InitialEvent {
        kind: "INITIAL",
        timestamp: Utc::now(),
        data: InitialData {
            groups: state.store.fetch_all(),
        },
    };
    debug!("Stream opened, {} subscribers", state.broadcaster.subscriber_count());

    let initial = stream::iter(sse_event(&initial));
    let events = subscription.filter_map(|event| async move { sse_event(event.as_ref()) });
    let stream: std::pin::Pin<Box<dyn Stream<Item = Result<SseEvent, Infallible>> + Send>> =
        Box::pin(initial.chain(events).map(Ok));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
