use crate::engine::{CancelToken, ExecutionEngine};
use crate::error::{MotionError, Result};
use crate::registry::MotionRegistry;
use crate::sync::{lock, read, write};
use crate::types::{ExecutionOutcome, GoalResult, GoalStatus, MotionInfo, RejectReason};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

pub type GoalId = Uuid;

/// Number of goals kept for status and result lookup.
const MAX_GOALS: usize = 50;

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Accepted(GoalId),
    Rejected(Vec<RejectReason>),
}

impl Admission {
    pub fn goal_id(&self) -> Option<GoalId> {
        match self {
            Admission::Accepted(id) => Some(*id),
            Admission::Rejected(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Goal events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalEvent {
    GoalAccepted {
        goal_id: GoalId,
        motion_name: String,
    },
    GoalFinished {
        goal_id: GoalId,
        motion_name: String,
        result: GoalResult,
    },
}

pub type GoalObserver = Arc<dyn Fn(&GoalEvent) + Send + Sync>;

/// Shared list of callbacks notified about goal acceptance and completion.
#[derive(Clone, Default)]
pub struct GoalObservers(Arc<RwLock<Vec<GoalObserver>>>);

impl GoalObservers {
    pub fn add(&self, observer: impl Fn(&GoalEvent) + Send + Sync + 'static) {
        write(&self.0).push(Arc::new(observer));
    }

    fn notify(&self, event: &GoalEvent) {
        for observer in read(&self.0).iter() {
            observer(event);
        }
    }
}

// ---------------------------------------------------------------------------
// GoalHandle
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GoalState {
    result: Option<GoalResult>,
    finished_at: Option<DateTime<Utc>>,
}

/// One accepted goal. Its terminal result is published exactly once.
#[derive(Debug)]
pub struct GoalHandle {
    id: GoalId,
    motion_name: String,
    skip_planning: bool,
    accepted_at: DateTime<Utc>,
    cancel: CancelToken,
    state: Mutex<GoalState>,
    done: Condvar,
}

/// Point-in-time view of a goal.
#[derive(Debug, Clone, Serialize)]
pub struct GoalSnapshot {
    pub goal_id: GoalId,
    pub motion_name: String,
    pub skip_planning: bool,
    pub status: GoalStatus,
    pub accepted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GoalResult>,
}

impl GoalHandle {
    fn new(motion_name: &str, skip_planning: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            motion_name: motion_name.to_string(),
            skip_planning,
            accepted_at: Utc::now(),
            cancel: CancelToken::new(),
            state: Mutex::new(GoalState::default()),
            done: Condvar::new(),
        }
    }

    pub fn id(&self) -> GoalId {
        self.id
    }

    pub fn motion_name(&self) -> &str {
        &self.motion_name
    }

    pub fn status(&self) -> GoalStatus {
        lock(&self.state)
            .result
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(GoalStatus::Executing)
    }

    pub fn result(&self) -> Option<GoalResult> {
        lock(&self.state).result.clone()
    }

    pub fn snapshot(&self) -> GoalSnapshot {
        let state = lock(&self.state);
        GoalSnapshot {
            goal_id: self.id,
            motion_name: self.motion_name.clone(),
            skip_planning: self.skip_planning,
            status: state
                .result
                .as_ref()
                .map(|r| r.status)
                .unwrap_or(GoalStatus::Executing),
            accepted_at: self.accepted_at,
            finished_at: state.finished_at,
            result: state.result.clone(),
        }
    }

    /// Block until the goal is terminal, or until `timeout` elapses.
    /// Returns `None` on timeout.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<GoalResult> {
        let state = lock(&self.state);
        let state = match timeout {
            None => self
                .done
                .wait_while(state, |s| s.result.is_none())
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.done
                    .wait_timeout_while(state, timeout, |s| s.result.is_none())
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        state.result.clone()
    }

    /// Publish the terminal result and release the admission gate. The
    /// gate is cleared under the goal lock, so any waiter that observes the
    /// result also observes a free gate.
    fn complete(&self, result: GoalResult, busy: &AtomicBool) -> bool {
        let mut state = lock(&self.state);
        if state.result.is_some() {
            return false;
        }
        state.result = Some(result);
        state.finished_at = Some(Utc::now());
        busy.store(false, Ordering::SeqCst);
        drop(state);
        self.done.notify_all();
        true
    }
}

// ---------------------------------------------------------------------------
// GoalTable
// ---------------------------------------------------------------------------

#[derive(Default)]
struct GoalTable {
    order: VecDeque<GoalId>,
    goals: HashMap<GoalId, Arc<GoalHandle>>,
}

impl GoalTable {
    fn insert(&mut self, handle: Arc<GoalHandle>) {
        self.order.push_back(handle.id);
        self.goals.insert(handle.id, handle);
        while self.order.len() > MAX_GOALS {
            if let Some(old) = self.order.pop_front() {
                self.goals.remove(&old);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Slot {
    worker: Option<JoinHandle<()>>,
    current: Option<Arc<GoalHandle>>,
}

/// Runs at most one motion at a time.
///
/// Admission holds the slot lock across the busy check, the join of the
/// previous worker and the gate flip, so two submissions can never both
/// observe a free gate. The busy flag itself is readable without the lock.
///
/// `shutdown` closes the orchestrator for good: later submissions through
/// any remaining handle are rejected as `Inactive`.
pub struct Orchestrator {
    registry: Arc<RwLock<MotionRegistry>>,
    engine: Arc<dyn ExecutionEngine>,
    busy: Arc<AtomicBool>,
    closed: AtomicBool,
    slot: Mutex<Slot>,
    goals: Mutex<GoalTable>,
    observers: GoalObservers,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<RwLock<MotionRegistry>>,
        engine: Arc<dyn ExecutionEngine>,
        observers: GoalObservers,
    ) -> Self {
        Self {
            registry,
            engine,
            busy: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
            slot: Mutex::new(Slot::default()),
            goals: Mutex::new(GoalTable::default()),
            observers,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Not busy, known, and executable without planning.
    pub fn is_motion_ready(&self, key: &str) -> bool {
        if self.is_busy() || self.is_closed() {
            return false;
        }
        let registry = read(&self.registry);
        match registry.get(key) {
            Ok(motion) => self.engine.is_executable(motion, true),
            Err(_) => false,
        }
    }

    /// Admit a goal and start executing it, or reject it without any state
    /// change.
    pub fn submit(&self, motion_name: &str, skip_planning: bool) -> Admission {
        let mut slot = lock(&self.slot);

        // Set under the slot lock by `shutdown`, so no admission slips past it.
        if self.is_closed() {
            error!(motion = %motion_name, "Motion service is not active");
            return Admission::Rejected(vec![RejectReason::Inactive]);
        }

        let mut reasons = Vec::new();
        if self.is_busy() {
            error!("Busy");
            reasons.push(RejectReason::Busy);
        }
        // Snapshot the definition so registry edits never reach a running goal.
        let motion = read(&self.registry).get(motion_name).cloned();
        match &motion {
            Err(_) => {
                error!(motion = %motion_name, "Motion '{motion_name}' does not exist");
                reasons.push(RejectReason::UnknownMotion);
            }
            Ok(info) if !self.engine.is_executable(info, skip_planning) => {
                error!(motion = %motion_name, "Motion '{motion_name}' cannot be performed");
                reasons.push(RejectReason::NotExecutable);
            }
            Ok(_) => {}
        }
        let motion = match motion {
            Ok(motion) if reasons.is_empty() => motion,
            _ => return Admission::Rejected(reasons),
        };

        if let Some(previous) = slot.worker.take() {
            join_worker(previous);
        }
        self.busy.store(true, Ordering::SeqCst);

        let handle = Arc::new(GoalHandle::new(motion_name, skip_planning));
        lock(&self.goals).insert(handle.clone());
        info!(goal = %handle.id, motion = %motion_name, skip_planning, "Goal accepted");
        self.observers.notify(&GoalEvent::GoalAccepted {
            goal_id: handle.id,
            motion_name: motion_name.to_string(),
        });

        let worker = Worker {
            engine: self.engine.clone(),
            busy: self.busy.clone(),
            observers: self.observers.clone(),
            handle: handle.clone(),
        };
        let spawned = std::thread::Builder::new()
            .name(format!("motion-{motion_name}"))
            .spawn(move || worker.run(motion, skip_planning));
        match spawned {
            Ok(join) => slot.worker = Some(join),
            Err(e) => {
                error!(goal = %handle.id, "failed to start motion worker: {e}");
                finish(
                    &handle,
                    GoalResult::from_outcome(&ExecutionOutcome::failed(format!(
                        "failed to start motion worker: {e}"
                    ))),
                    &self.busy,
                    &self.observers,
                );
            }
        }
        slot.current = Some(handle.clone());
        Admission::Accepted(handle.id)
    }

    /// Request cooperative cancellation. Always accepted for a known goal; a
    /// goal that already finished keeps its result.
    pub fn cancel(&self, goal_id: GoalId) -> Result<()> {
        let handle = self.goal(goal_id)?;
        if handle.status().is_terminal() {
            info!(goal = %goal_id, "cancel requested for finished goal, ignoring");
        } else {
            info!(goal = %goal_id, motion = %handle.motion_name, "Canceling motion");
            handle.cancel.cancel();
        }
        Ok(())
    }

    pub fn goal(&self, goal_id: GoalId) -> Result<Arc<GoalHandle>> {
        lock(&self.goals)
            .goals
            .get(&goal_id)
            .cloned()
            .ok_or_else(|| MotionError::GoalNotFound(goal_id.to_string()))
    }

    /// Retained goals, oldest first.
    pub fn goals(&self) -> Vec<GoalSnapshot> {
        let table = lock(&self.goals);
        table
            .order
            .iter()
            .filter_map(|id| table.goals.get(id))
            .map(|g| g.snapshot())
            .collect()
    }

    /// Block until `goal_id` is terminal or `timeout` elapses.
    pub fn wait(&self, goal_id: GoalId, timeout: Option<Duration>) -> Result<Option<GoalResult>> {
        Ok(self.goal(goal_id)?.wait(timeout))
    }

    /// Close admission, cancel the in-flight goal, wait for its terminal
    /// result, join the worker, and reset the gate.
    pub fn shutdown(&self) {
        let mut slot = lock(&self.slot);
        self.closed.store(true, Ordering::SeqCst);
        if let Some(current) = &slot.current {
            if !current.status().is_terminal() {
                warn!(goal = %current.id, motion = %current.motion_name, "canceling in-flight goal");
                current.cancel.cancel();
            }
        }
        if let Some(worker) = slot.worker.take() {
            join_worker(worker);
        }
        slot.current = None;
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    engine: Arc<dyn ExecutionEngine>,
    busy: Arc<AtomicBool>,
    observers: GoalObservers,
    handle: Arc<GoalHandle>,
}

impl Worker {
    fn run(self, motion: MotionInfo, skip_planning: bool) {
        let cancel = self.handle.cancel.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.execute(&motion, skip_planning, &cancel)
        }));

        match outcome {
            Ok(outcome) => {
                match &outcome {
                    ExecutionOutcome::Succeeded => {
                        info!(goal = %self.handle.id, motion = %motion.key, "Motion completed")
                    }
                    ExecutionOutcome::Failed(msg) => {
                        error!(goal = %self.handle.id, motion = %motion.key, "Motion failed: {msg}")
                    }
                    ExecutionOutcome::Canceled => {
                        info!(goal = %self.handle.id, motion = %motion.key, "Motion canceled")
                    }
                }
                finish(
                    &self.handle,
                    GoalResult::from_outcome(&outcome),
                    &self.busy,
                    &self.observers,
                );
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!(goal = %self.handle.id, motion = %motion.key, "execution engine panicked: {msg}");
                finish(
                    &self.handle,
                    GoalResult::from_outcome(&ExecutionOutcome::failed(format!(
                        "internal fault: {msg}"
                    ))),
                    &self.busy,
                    &self.observers,
                );
                panic::resume_unwind(payload);
            }
        }
    }
}

fn finish(handle: &GoalHandle, result: GoalResult, busy: &AtomicBool, observers: &GoalObservers) {
    if handle.complete(result.clone(), busy) {
        observers.notify(&GoalEvent::GoalFinished {
            goal_id: handle.id,
            motion_name: handle.motion_name.clone(),
            result,
        });
    }
}

fn join_worker(worker: JoinHandle<()>) {
    if let Err(payload) = worker.join() {
        error!(
            "previous motion worker terminated abnormally: {}",
            panic_message(payload.as_ref())
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, Receiver, Sender};

    const WAIT: Option<Duration> = Some(Duration::from_secs(5));

    enum Step {
        Finish(ExecutionOutcome),
        WaitForCancel,
        Panic,
    }

    /// Engine whose executions report what they received and then block
    /// until the test releases them with a [`Step`].
    struct ScriptedEngine {
        executable: AtomicBool,
        started: Mutex<Sender<MotionInfo>>,
        steps: Mutex<Receiver<Step>>,
    }

    impl ExecutionEngine for ScriptedEngine {
        fn is_executable(&self, _motion: &MotionInfo, _skip_planning: bool) -> bool {
            self.executable.load(Ordering::SeqCst)
        }

        fn execute(
            &self,
            motion: &MotionInfo,
            _skip_planning: bool,
            cancel: &CancelToken,
        ) -> ExecutionOutcome {
            self.started.lock().unwrap().send(motion.clone()).unwrap();
            let step = self.steps.lock().unwrap().recv().unwrap();
            match step {
                Step::Finish(outcome) => outcome,
                Step::WaitForCancel => {
                    while !cancel.is_canceled() {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    ExecutionOutcome::Canceled
                }
                Step::Panic => panic!("engine exploded"),
            }
        }
    }

    // `steps` drops before `orch`, so a worker still waiting for a step
    // unblocks before the orchestrator joins it.
    struct Harness {
        steps: Sender<Step>,
        started: Receiver<MotionInfo>,
        orch: Orchestrator,
        registry: Arc<RwLock<MotionRegistry>>,
        engine: Arc<ScriptedEngine>,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Harness {
        fn started(&self) -> MotionInfo {
            self.started.recv_timeout(Duration::from_secs(5)).unwrap()
        }

        fn run(&self, motion: &str, outcome: ExecutionOutcome) -> GoalResult {
            let id = self.orch.submit(motion, true).goal_id().unwrap();
            self.started();
            self.steps.send(Step::Finish(outcome)).unwrap();
            self.orch.wait(id, WAIT).unwrap().unwrap()
        }
    }

    fn motion(key: &str) -> MotionInfo {
        MotionInfo {
            key: key.into(),
            joints: vec!["joint1".into()],
            positions: vec![vec![1.0]],
            times: vec![1.0],
            ..Default::default()
        }
    }

    fn harness() -> Harness {
        let mut registry = MotionRegistry::new();
        for key in ["home", "pose1", "controller_2_pose"] {
            registry.add(motion(key), false).unwrap();
        }
        let registry = Arc::new(RwLock::new(registry));

        let (started_tx, started) = channel();
        let (steps, steps_rx) = channel();
        let engine = Arc::new(ScriptedEngine {
            executable: AtomicBool::new(true),
            started: Mutex::new(started_tx),
            steps: Mutex::new(steps_rx),
        });

        let observers = GoalObservers::default();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        observers.add(move |ev| {
            let name = match ev {
                GoalEvent::GoalAccepted { .. } => "accepted".to_string(),
                GoalEvent::GoalFinished { result, .. } => result.status.to_string(),
            };
            sink.lock().unwrap().push(name);
        });

        Harness {
            steps,
            started,
            orch: Orchestrator::new(registry.clone(), engine.clone(), observers),
            registry,
            engine,
            events,
        }
    }

    #[test]
    fn unknown_motion_is_rejected_without_state_change() {
        let h = harness();
        let admission = h.orch.submit("unreal_motion", true);
        assert_eq!(
            admission,
            Admission::Rejected(vec![RejectReason::UnknownMotion])
        );
        assert!(!h.orch.is_busy());
        assert!(h.orch.goals().is_empty());
        assert!(h.events.lock().unwrap().is_empty());
    }

    #[test]
    fn infeasible_motion_is_rejected() {
        let h = harness();
        h.engine.executable.store(false, Ordering::SeqCst);
        assert_eq!(
            h.orch.submit("home", false),
            Admission::Rejected(vec![RejectReason::NotExecutable])
        );
        assert!(!h.orch.is_busy());
    }

    #[test]
    fn second_goal_is_rejected_while_busy() {
        let h = harness();
        let first = h.orch.submit("pose1", true).goal_id().unwrap();
        h.started();
        assert!(h.orch.is_busy());

        assert_eq!(
            h.orch.submit("home", true),
            Admission::Rejected(vec![RejectReason::Busy])
        );
        assert_eq!(
            h.orch.submit("unreal_motion", true),
            Admission::Rejected(vec![RejectReason::Busy, RejectReason::UnknownMotion])
        );

        h.steps.send(Step::Finish(ExecutionOutcome::Succeeded)).unwrap();
        assert!(h.orch.wait(first, WAIT).unwrap().unwrap().success);
    }

    #[test]
    fn success_frees_the_gate_for_the_next_goal() {
        let h = harness();
        let result = h.run("pose1", ExecutionOutcome::Succeeded);
        assert_eq!(result.status, GoalStatus::Succeeded);
        assert!(result.success);
        assert!(result.error.is_empty());
        assert!(!h.orch.is_busy());

        let next = h.run("home", ExecutionOutcome::Succeeded);
        assert!(next.success);
        h.orch.shutdown();
        assert_eq!(
            *h.events.lock().unwrap(),
            vec!["accepted", "succeeded", "accepted", "succeeded"]
        );
    }

    #[test]
    fn engine_error_aborts_goal() {
        let h = harness();
        let result = h.run("pose1", ExecutionOutcome::failed("controller timeout"));
        assert_eq!(result.status, GoalStatus::Aborted);
        assert!(!result.success);
        assert_eq!(result.error, "controller timeout");
        assert!(!h.orch.is_busy());
    }

    #[test]
    fn cancel_before_checkpoint_reports_canceled() {
        let h = harness();
        let id = h.orch.submit("pose1", true).goal_id().unwrap();
        h.started();
        h.steps.send(Step::WaitForCancel).unwrap();
        h.orch.cancel(id).unwrap();

        let result = h.orch.wait(id, WAIT).unwrap().unwrap();
        assert_eq!(result.status, GoalStatus::Canceled);
        assert!(!result.success);
        assert!(!h.orch.is_busy());
    }

    #[test]
    fn cancel_after_result_is_a_no_op() {
        let h = harness();
        let result = h.run("pose1", ExecutionOutcome::Succeeded);
        let id = h.orch.goals()[0].goal_id;
        h.orch.cancel(id).unwrap();
        assert_eq!(h.orch.goal(id).unwrap().result(), Some(result));
    }

    #[test]
    fn cancel_unknown_goal_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.orch.cancel(Uuid::new_v4()),
            Err(MotionError::GoalNotFound(_))
        ));
    }

    #[test]
    fn running_goal_uses_definition_from_admission() {
        let h = harness();
        let id = h.orch.submit("pose1", true).goal_id().unwrap();
        {
            let mut registry = h.registry.write().unwrap();
            registry.remove("pose1").unwrap();
        }
        let seen = h.started();
        assert_eq!(seen.key, "pose1");
        assert_eq!(seen.positions, vec![vec![1.0]]);
        h.steps.send(Step::Finish(ExecutionOutcome::Succeeded)).unwrap();
        assert!(h.orch.wait(id, WAIT).unwrap().unwrap().success);
    }

    #[test]
    fn engine_panic_aborts_goal_and_frees_gate() {
        let h = harness();
        let id = h.orch.submit("pose1", true).goal_id().unwrap();
        h.started();
        h.steps.send(Step::Panic).unwrap();

        let result = h.orch.wait(id, WAIT).unwrap().unwrap();
        assert_eq!(result.status, GoalStatus::Aborted);
        assert!(result.error.starts_with("internal fault: engine exploded"));
        assert!(!h.orch.is_busy());

        // joins the panicked worker, then runs normally
        let next = h.run("home", ExecutionOutcome::Succeeded);
        assert!(next.success);
    }

    #[test]
    fn shutdown_cancels_and_joins_in_flight_goal() {
        let h = harness();
        let id = h.orch.submit("pose1", true).goal_id().unwrap();
        h.started();
        h.steps.send(Step::WaitForCancel).unwrap();

        h.orch.shutdown();
        assert!(!h.orch.is_busy());
        assert_eq!(h.orch.goal(id).unwrap().status(), GoalStatus::Canceled);
    }

    #[test]
    fn shutdown_rejects_later_submissions() {
        let h = harness();
        h.run("home", ExecutionOutcome::Succeeded);
        h.orch.shutdown();

        assert!(h.orch.is_closed());
        assert!(!h.orch.is_motion_ready("home"));
        assert_eq!(
            h.orch.submit("home", true),
            Admission::Rejected(vec![RejectReason::Inactive])
        );
        assert!(!h.orch.is_busy());
        assert_eq!(h.orch.goals().len(), 1);
    }

    #[test]
    fn readiness_requires_free_gate_known_key_and_feasibility() {
        let h = harness();
        assert!(h.orch.is_motion_ready("home"));
        assert!(!h.orch.is_motion_ready("unreal_motion"));

        let id = h.orch.submit("pose1", true).goal_id().unwrap();
        h.started();
        assert!(!h.orch.is_motion_ready("home"));
        h.steps.send(Step::Finish(ExecutionOutcome::Succeeded)).unwrap();
        h.orch.wait(id, WAIT).unwrap();

        h.engine.executable.store(false, Ordering::SeqCst);
        assert!(!h.orch.is_motion_ready("home"));
    }

    #[test]
    fn wait_times_out_while_executing() {
        let h = harness();
        let id = h.orch.submit("pose1", true).goal_id().unwrap();
        h.started();
        let pending = h.orch.wait(id, Some(Duration::from_millis(20))).unwrap();
        assert!(pending.is_none());
        assert_eq!(h.orch.goal(id).unwrap().status(), GoalStatus::Executing);
        h.steps.send(Step::Finish(ExecutionOutcome::Succeeded)).unwrap();
        assert!(h.orch.wait(id, WAIT).unwrap().is_some());
    }

    #[test]
    fn keeps_only_recent_goals() {
        let h = harness();
        for _ in 0..(MAX_GOALS + 5) {
            h.run("home", ExecutionOutcome::Succeeded);
        }
        let goals = h.orch.goals();
        assert_eq!(goals.len(), MAX_GOALS);
        assert!(goals.iter().all(|g| g.status == GoalStatus::Succeeded));
    }
}
