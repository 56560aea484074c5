use playmotion_core::lifecycle::{LifecycleState, Transition, TransitionOutcome};
use playmotion_core::types::{GoalResult, GoalStatus, MotionInfo, RejectReason};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_URL: &str = "http://localhost:3142";

/// How long `run_motion` waits for a terminal result unless told otherwise.
pub const DEFAULT_MOTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Bound on every plain request/response exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest single result poll; the server caps its own wait at 30 s.
const RESULT_POLL: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// ClientError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach motion server: {0}")]
    Transport(String),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response from motion server: {0}")]
    Decode(String),

    #[error("goal rejected: {}", join_reasons(.0))]
    Rejected(Vec<RejectReason>),

    #[error("motion did not finish within {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

fn join_reasons(reasons: &[RejectReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl From<ureq::Error> for ClientError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_string()
                    .ok()
                    .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
                    .map(|body| body.error)
                    .unwrap_or_else(|| format!("HTTP {status}"));
                ClientError::Status { status, message }
            }
            ureq::Error::Transport(transport) => ClientError::Transport(transport.to_string()),
        }
    }
}

fn decode<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ClientError> {
    let body = response
        .into_string()
        .map_err(|e| ClientError::Decode(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleView {
    pub state: LifecycleState,
    #[serde(default)]
    pub available_transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionReply {
    pub state: LifecycleState,
    pub outcome: TransitionOutcome,
}

#[derive(Deserialize)]
struct MotionKeys {
    motion_keys: Vec<String>,
}

#[derive(Deserialize)]
struct MotionBody {
    motion: MotionInfo,
}

#[derive(Deserialize)]
struct ReadyBody {
    is_ready: bool,
}

#[derive(Deserialize)]
struct Accepted {
    goal_id: Uuid,
}

#[derive(Deserialize)]
struct Rejected {
    #[serde(default)]
    reasons: Vec<RejectReason>,
}

// ---------------------------------------------------------------------------
// MotionClient
// ---------------------------------------------------------------------------

/// Blocking client for a running motion server.
///
/// The `*_motion*` / `list_motions` style methods never fail: transport and
/// server errors are logged and reported as `false`, an empty list or `None`.
/// The `fetch_*` / `submit` family returns the underlying `ClientError` for
/// callers that want to report it.
#[derive(Clone)]
pub struct MotionClient {
    base_url: String,
    agent: ureq::Agent,
    running: Arc<AtomicBool>,
    succeeded: Arc<AtomicBool>,
    /// Goal the running/succeeded flags describe.
    tracked: Arc<Mutex<Option<Uuid>>>,
}

impl MotionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            base_url,
            agent,
            running: Arc::new(AtomicBool::new(false)),
            succeeded: Arc::new(AtomicBool::new(false)),
            tracked: Arc::new(Mutex::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `/api/motions/<key>` with the key escaped as a single path segment.
    fn motion_path(key: &str) -> String {
        format!("/api/motions/{}", urlencoding::encode(key))
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.agent.get(&self.url(path)).call()?;
        decode(response)
    }

    fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ClientError> {
        let response = self
            .agent
            .post(&self.url(path))
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())?;
        decode(response)
    }

    fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.agent.delete(&self.url(path)).call()?;
        decode(response)
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    pub fn fetch_motions(&self) -> Result<Vec<String>, ClientError> {
        let body: MotionKeys = self.get("/api/motions")?;
        Ok(body.motion_keys)
    }

    pub fn fetch_motion_info(&self, key: &str) -> Result<MotionInfo, ClientError> {
        let body: MotionBody = self.get(&Self::motion_path(key))?;
        Ok(body.motion)
    }

    pub fn fetch_motion_ready(&self, key: &str) -> Result<bool, ClientError> {
        let body: ReadyBody = self.get(&format!("{}/ready", Self::motion_path(key)))?;
        Ok(body.is_ready)
    }

    pub fn put_motion(&self, motion: &MotionInfo, overwrite: bool) -> Result<(), ClientError> {
        let body = serde_json::json!({ "motion": motion, "overwrite": overwrite });
        let _: serde_json::Value = self.post("/api/motions", &body)?;
        Ok(())
    }

    pub fn delete_motion(&self, key: &str) -> Result<(), ClientError> {
        let _: serde_json::Value = self.delete(&Self::motion_path(key))?;
        Ok(())
    }

    pub fn list_motions(&self) -> Vec<String> {
        self.fetch_motions().unwrap_or_else(|e| {
            error!("Failed to list motions: {e}");
            Vec::new()
        })
    }

    pub fn get_motion_info(&self, key: &str) -> Option<MotionInfo> {
        match self.fetch_motion_info(key) {
            Ok(motion) => Some(motion),
            Err(e) => {
                error!(motion = %key, "Failed to get motion info: {e}");
                None
            }
        }
    }

    pub fn is_motion_ready(&self, key: &str) -> bool {
        self.fetch_motion_ready(key).unwrap_or_else(|e| {
            error!(motion = %key, "Failed to check if motion is ready: {e}");
            false
        })
    }

    pub fn add_motion(&self, motion: &MotionInfo, overwrite: bool) -> bool {
        match self.put_motion(motion, overwrite) {
            Ok(()) => true,
            Err(e) => {
                error!(motion = %motion.key, "Failed to add motion: {e}");
                false
            }
        }
    }

    pub fn remove_motion(&self, key: &str) -> bool {
        match self.delete_motion(key) {
            Ok(()) => true,
            Err(e) => {
                error!(motion = %key, "Failed to remove motion: {e}");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Goals
    // -----------------------------------------------------------------------

    /// Submit a goal. A rejection comes back as `ClientError::Rejected`.
    pub fn submit(&self, motion_name: &str, skip_planning: bool) -> Result<Uuid, ClientError> {
        let body = serde_json::json!({
            "motion_name": motion_name,
            "skip_planning": skip_planning,
        });
        let response = self
            .agent
            .post(&self.url("/api/goals"))
            .set("Content-Type", "application/json")
            .send_string(&body.to_string());

        match response {
            Ok(response) => {
                let accepted: Accepted = decode(response)?;
                debug!(goal = %accepted.goal_id, motion = %motion_name, "goal accepted");
                Ok(accepted.goal_id)
            }
            Err(ureq::Error::Status(409, response)) => {
                let rejected: Rejected = decode(response)?;
                Err(ClientError::Rejected(rejected.reasons))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// One bounded wait for the terminal result; `None` while still executing.
    pub fn poll_result(
        &self,
        goal_id: Uuid,
        wait: Duration,
    ) -> Result<Option<GoalResult>, ClientError> {
        let wait = wait.min(RESULT_POLL);
        let response = self
            .agent
            .get(&self.url(&format!("/api/goals/{goal_id}/result")))
            .query("timeout_ms", &wait.as_millis().to_string())
            .timeout(wait + REQUEST_TIMEOUT)
            .call()?;

        if response.status() == 202 {
            return Ok(None);
        }
        decode(response).map(Some)
    }

    pub fn cancel(&self, goal_id: Uuid) -> Result<(), ClientError> {
        let _: serde_json::Value =
            self.post(&format!("/api/goals/{goal_id}/cancel"), &serde_json::json!({}))?;
        Ok(())
    }

    /// Poll until the goal is terminal. With a deadline, an expired wait
    /// cancels the goal and reports `ClientError::Timeout`.
    fn await_result(
        &self,
        goal_id: Uuid,
        timeout: Option<Duration>,
    ) -> Result<GoalResult, ClientError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let wait = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        if let Err(e) = self.cancel(goal_id) {
                            warn!(goal = %goal_id, "cancel after timeout failed: {e}");
                        }
                        return Err(ClientError::Timeout(timeout.unwrap_or_default()));
                    }
                    remaining
                }
                None => RESULT_POLL,
            };
            if let Some(result) = self.poll_result(goal_id, wait)? {
                return Ok(result);
            }
        }
    }

    /// Submit a goal and block until it is terminal or `timeout` expires.
    pub fn execute(
        &self,
        motion_name: &str,
        skip_planning: bool,
        timeout: Duration,
    ) -> Result<GoalResult, ClientError> {
        let goal_id = self.submit(motion_name, skip_planning)?;
        self.track(goal_id);

        let result = self.await_result(goal_id, Some(timeout));
        self.finish(goal_id, result.as_ref().ok());
        result
    }

    /// Point the running/succeeded flags at a newly accepted goal.
    fn track(&self, goal_id: Uuid) {
        let mut tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
        *tracked = Some(goal_id);
        self.succeeded.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    /// Record the outcome of `goal_id`, unless a later goal has replaced it.
    fn finish(&self, goal_id: Uuid, result: Option<&GoalResult>) {
        let mut tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
        if *tracked != Some(goal_id) {
            debug!(goal = %goal_id, "outcome of a superseded goal, flags left alone");
            return;
        }
        *tracked = None;
        match result {
            Some(result) => {
                match result.status {
                    GoalStatus::Succeeded => info!("Motion execution completed"),
                    GoalStatus::Canceled => info!("Motion execution canceled"),
                    _ => error!("Motion execution failed: {}", result.error),
                }
                self.succeeded.store(result.success, Ordering::SeqCst);
            }
            None => self.succeeded.store(false, Ordering::SeqCst),
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Run a motion to completion. `false` on rejection, failure, cancel,
    /// timeout or any channel error.
    pub fn run_motion(&self, motion_name: &str, skip_planning: bool, timeout: Duration) -> bool {
        match self.execute(motion_name, skip_planning, timeout) {
            Ok(result) => result.success,
            Err(e) => {
                error!(motion = %motion_name, "Failed to execute motion: {e}");
                false
            }
        }
    }

    /// Submit a motion and return once it is accepted. Progress is tracked
    /// through `is_running_motion` and `last_succeeded`.
    pub fn run_motion_async(&self, motion_name: &str, skip_planning: bool) -> bool {
        let goal_id = match self.submit(motion_name, skip_planning) {
            Ok(goal_id) => goal_id,
            Err(e) => {
                error!(motion = %motion_name, "Failed to send goal: {e}");
                return false;
            }
        };
        self.track(goal_id);

        let client = self.clone();
        let spawned = thread::Builder::new()
            .name("playmotion-client-watch".into())
            .spawn(move || {
                let result = client.await_result(goal_id, None);
                if let Err(e) = &result {
                    error!(goal = %goal_id, "Lost track of motion goal: {e}");
                }
                client.finish(goal_id, result.as_ref().ok());
            });
        if let Err(e) = spawned {
            error!(goal = %goal_id, "cannot watch motion goal: {e}");
            self.finish(goal_id, None);
        }
        true
    }

    pub fn is_running_motion(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn last_succeeded(&self) -> bool {
        if self.is_running_motion() {
            warn!("Motion is still running.");
        }
        self.succeeded.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn lifecycle(&self) -> Result<LifecycleView, ClientError> {
        self.get("/api/lifecycle")
    }

    pub fn transition(&self, transition: Transition) -> Result<TransitionReply, ClientError> {
        self.post(
            &format!("/api/lifecycle/{}", transition.as_str()),
            &serde_json::json!({}),
        )
    }
}
