use playmotion_core::lifecycle::LifecycleState;
use playmotion_core::orchestrator::GoalEvent;
use playmotion_core::service::MotionService;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Messages pushed to `/api/events` subscribers.
#[derive(Debug, Clone)]
pub enum SseMessage {
    Goal(GoalEvent),
    Lifecycle { state: LifecycleState },
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MotionService>,
    pub event_tx: broadcast::Sender<SseMessage>,
}

impl AppState {
    pub fn new(service: Arc<MotionService>) -> Self {
        let (tx, _) = broadcast::channel(64);

        // Goal events fire on worker threads; a send with no subscribers is fine.
        let goal_tx = tx.clone();
        service.observe(move |event| {
            let _ = goal_tx.send(SseMessage::Goal(event.clone()));
        });

        Self {
            service,
            event_tx: tx,
        }
    }
}
