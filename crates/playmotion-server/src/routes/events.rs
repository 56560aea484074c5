use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use playmotion_core::orchestrator::GoalEvent;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::{AppState, SseMessage};

fn to_event(msg: SseMessage) -> Event {
    let (name, data) = match &msg {
        SseMessage::Goal(ev @ GoalEvent::GoalAccepted { .. }) => {
            ("goal_accepted", serde_json::to_string(ev))
        }
        SseMessage::Goal(ev @ GoalEvent::GoalFinished { .. }) => {
            ("goal_finished", serde_json::to_string(ev))
        }
        SseMessage::Lifecycle { state } => (
            "lifecycle",
            serde_json::to_string(&serde_json::json!({ "state": state })),
        ),
    };
    Event::default().event(name).data(data.unwrap_or_default())
}

/// GET /api/events: SSE stream of goal and lifecycle events.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.event_tx.subscribe();
    let stream = BroadcastStream::new(rx)
        .filter_map(|msg| msg.ok().map(|m| Ok::<Event, Infallible>(to_event(m))));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
