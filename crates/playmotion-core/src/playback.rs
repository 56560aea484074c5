use crate::config::{Config, ControllerConfig, PlannerConfig, PlaybackConfig};
use crate::engine::{CancelToken, ExecutionEngine};
use crate::error::{MotionError, Result};
use crate::sync::{lock, read, write};
use crate::trajectory::{controller_trajectories, reach_time, with_approach_time};
use crate::types::{ExecutionOutcome, JointNames, MotionInfo};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Longest uninterrupted sleep during playback. Cancellation and controller
/// deactivation are observed at this granularity.
const SLICE: Duration = Duration::from_millis(10);

/// In-process execution engine that simulates joint trajectory controllers.
///
/// Controllers claim joints and can be switched on and off at runtime. A
/// motion is played back against a simulated joint state, honoring the same
/// approach and planning rules a real controller stack would.
pub struct PlaybackEngine {
    planner: PlannerConfig,
    time_scale: f64,
    controllers: RwLock<Vec<ControllerConfig>>,
    joint_states: Mutex<HashMap<String, f64>>,
}

impl PlaybackEngine {
    pub fn new(
        planner: PlannerConfig,
        controllers: Vec<ControllerConfig>,
        playback: &PlaybackConfig,
    ) -> Result<Self> {
        let planner = planner.sanitized();
        if !planner.disable_motion_planning && planner.planning_groups.is_empty() {
            return Err(MotionError::Engine(
                "unspecified planning groups for computing approach trajectories; set \
                 'motion_planner.planning_groups' or 'motion_planner.disable_motion_planning'"
                    .into(),
            ));
        }

        let time_scale = if playback.time_scale < 0.0 {
            warn!(
                value = playback.time_scale,
                "'time_scale' negative, using the default value: 1.0"
            );
            1.0
        } else {
            playback.time_scale
        };

        let mut joint_states: HashMap<String, f64> = controllers
            .iter()
            .flat_map(|c| c.joints.iter().map(|j| (j.clone(), 0.0)))
            .collect();
        joint_states.extend(playback.initial_positions.clone());

        Ok(Self {
            planner,
            time_scale,
            controllers: RwLock::new(controllers),
            joint_states: Mutex::new(joint_states),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.motion_planner.clone(),
            config.controllers.clone(),
            &config.playback,
        )
    }

    pub fn controllers(&self) -> Vec<ControllerConfig> {
        read(&self.controllers).clone()
    }

    pub fn set_controller_active(&self, name: &str, active: bool) -> Result<()> {
        let mut controllers = write(&self.controllers);
        let ctrl = controllers
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| MotionError::Config(format!("unknown controller '{name}'")))?;
        ctrl.active = active;
        info!(controller = %name, active, "controller state changed");
        Ok(())
    }

    /// Snapshot of the simulated joint positions.
    pub fn joint_positions(&self) -> HashMap<String, f64> {
        lock(&self.joint_states).clone()
    }

    /// Current positions of `joints`, or `None` when one has no state.
    fn current_positions(&self, joints: &[String]) -> Option<Vec<f64>> {
        let states = lock(&self.joint_states);
        joints.iter().map(|j| states.get(j).copied()).collect()
    }

    fn planned_joints(&self, joints: &[String]) -> JointNames {
        joints
            .iter()
            .filter(|j| !self.planner.exclude_from_planning_joints.contains(*j))
            .cloned()
            .collect()
    }

    fn has_valid_group(&self, planned: &[String]) -> bool {
        self.planner
            .planning_groups
            .iter()
            .any(|g| planned.iter().all(|j| g.joints.contains(j)))
    }

    fn approach_time(&self, motion: &MotionInfo) -> Option<f64> {
        let current = self.current_positions(&motion.joints)?;
        Some(reach_time(
            &current,
            motion.first_waypoint(),
            self.planner.approach_velocity,
            self.planner.approach_min_duration,
        ))
    }

    fn needs_approach(&self, motion: &MotionInfo) -> bool {
        match self.current_positions(&motion.joints) {
            Some(current) => current
                .iter()
                .zip(motion.first_waypoint())
                .any(|(c, g)| (c - g).abs() > self.planner.joint_tolerance),
            None => true,
        }
    }

    fn first_inactive<'a>(&self, names: &[&'a String]) -> Option<&'a String> {
        let controllers = read(&self.controllers);
        names
            .iter()
            .find(|name| !controllers.iter().any(|c| &c.name == **name && c.active))
            .copied()
    }

    /// Play `motion` back on the simulated controllers until it finishes,
    /// is canceled, or one of its controllers is deactivated.
    fn perform(&self, motion: &MotionInfo, cancel: &CancelToken) -> ExecutionOutcome {
        let trajectories = controller_trajectories(motion, &read(&self.controllers));
        let mut starts = BTreeMap::new();
        for (name, traj) in &trajectories {
            match self.current_positions(&traj.joint_names) {
                Some(pos) => {
                    starts.insert(name.clone(), pos);
                }
                None => {
                    return ExecutionOutcome::failed(
                        "some joint has not been found in joint states",
                    )
                }
            }
        }

        let total = trajectories
            .values()
            .map(|t| t.duration())
            .fold(0.0_f64, f64::max);
        let names: Vec<&String> = trajectories.keys().collect();
        debug!(motion = %motion.key, controllers = names.len(), duration = total, "playing motion");

        let started = Instant::now();
        loop {
            if cancel.is_canceled() {
                info!(motion = %motion.key, "Motion canceled");
                return ExecutionOutcome::Canceled;
            }
            if let Some(name) = self.first_inactive(&names) {
                return ExecutionOutcome::failed(format!(
                    "Controller '{name}' has been deactivated while executing the motion"
                ));
            }

            let t = if self.time_scale == 0.0 {
                total
            } else {
                (started.elapsed().as_secs_f64() / self.time_scale).min(total)
            };
            {
                let mut states = lock(&self.joint_states);
                for (name, traj) in &trajectories {
                    let positions = traj.sample(t, &starts[name]);
                    for (joint, pos) in traj.joint_names.iter().zip(positions) {
                        states.insert(joint.clone(), pos);
                    }
                }
            }
            if t >= total {
                return ExecutionOutcome::Succeeded;
            }

            let Ok(remaining) = Duration::try_from_secs_f64((total - t) * self.time_scale) else {
                return ExecutionOutcome::failed(format!(
                    "motion duration {total}s cannot be played back"
                ));
            };
            std::thread::sleep(remaining.min(SLICE));
        }
    }
}

impl ExecutionEngine for PlaybackEngine {
    fn is_executable(&self, motion: &MotionInfo, skip_planning: bool) -> bool {
        if self.planner.disable_motion_planning && !skip_planning {
            error!(
                "Motion planning capability is disabled, goals must not request planning. \
                 Please, set 'skip_planning: true'"
            );
            return false;
        }

        let controllers = read(&self.controllers);
        let claimed: HashSet<&str> = controllers
            .iter()
            .filter(|c| c.active)
            .flat_map(|c| c.joints.iter().map(String::as_str))
            .collect();
        if claimed.is_empty() {
            error!("There are no active joint trajectory controllers available");
            return false;
        }

        let mut ok = true;
        for joint in &motion.joints {
            if !claimed.contains(joint.as_str()) {
                error!(joint = %joint, "Joint '{joint}' is not claimed by any active controller");
                ok = false;
            }
        }
        ok
    }

    fn execute(
        &self,
        motion: &MotionInfo,
        skip_planning: bool,
        cancel: &CancelToken,
    ) -> ExecutionOutcome {
        let planned = self.planned_joints(&motion.joints);

        if planned.is_empty() || self.planner.disable_motion_planning || skip_planning {
            let Some(approach) = self.approach_time(motion) else {
                return ExecutionOutcome::failed(
                    "Error calculating approach time, some joint has not been found in \
                     joint states",
                );
            };
            return self.perform(&with_approach_time(motion, approach), cancel);
        }

        if !self.has_valid_group(&planned) {
            return ExecutionOutcome::failed("No valid move groups found for the given joints");
        }

        if !self.needs_approach(motion) {
            if motion.positions.len() == 1 {
                debug!(motion = %motion.key, "already at goal");
                return ExecutionOutcome::Succeeded;
            }
            return self.perform(motion, cancel);
        }

        // The simulated planner approaches the first waypoint in a straight
        // line, at the configured velocity.
        let Some(approach) = self.approach_time(motion) else {
            return ExecutionOutcome::failed("Failed to plan approach trajectory");
        };
        self.perform(&with_approach_time(motion, approach), cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanningGroup;
    use std::sync::Arc;

    fn ctrl(name: &str, joints: &[&str]) -> ControllerConfig {
        ControllerConfig {
            name: name.into(),
            joints: joints.iter().map(|j| j.to_string()).collect(),
            active: true,
        }
    }

    fn motion(key: &str, joints: &[&str], rows: Vec<Vec<f64>>, times: Vec<f64>) -> MotionInfo {
        MotionInfo {
            key: key.into(),
            joints: joints.iter().map(|j| j.to_string()).collect(),
            positions: rows,
            times,
            ..Default::default()
        }
    }

    fn unplanned() -> PlannerConfig {
        PlannerConfig {
            disable_motion_planning: true,
            ..Default::default()
        }
    }

    fn instant() -> PlaybackConfig {
        PlaybackConfig {
            time_scale: 0.0,
            ..Default::default()
        }
    }

    fn engine() -> PlaybackEngine {
        PlaybackEngine::new(
            unplanned(),
            vec![
                ctrl("controller_1", &["joint1", "joint2"]),
                ctrl("controller_2", &["joint3"]),
            ],
            &instant(),
        )
        .unwrap()
    }

    #[test]
    fn planning_enabled_without_groups_fails_construction() {
        let err = PlaybackEngine::new(PlannerConfig::default(), vec![], &instant())
            .err()
            .unwrap();
        assert!(matches!(err, MotionError::Engine(_)));
    }

    #[test]
    fn planning_requested_while_disabled_is_not_executable() {
        let e = engine();
        let m = motion("home", &["joint1"], vec![vec![0.0]], vec![1.0]);
        assert!(!e.is_executable(&m, false));
        assert!(e.is_executable(&m, true));
    }

    #[test]
    fn unclaimed_joint_is_not_executable() {
        let e = engine();
        let m = motion("reach", &["joint1", "joint9"], vec![vec![0.0, 0.0]], vec![1.0]);
        assert!(!e.is_executable(&m, true));
    }

    #[test]
    fn deactivated_controller_makes_motion_infeasible() {
        let e = engine();
        let m = motion("pose", &["joint3"], vec![vec![1.0]], vec![1.0]);
        assert!(e.is_executable(&m, true));
        e.set_controller_active("controller_2", false).unwrap();
        assert!(!e.is_executable(&m, true));
        assert!(e.set_controller_active("nope", true).is_err());
    }

    #[test]
    fn execute_reaches_last_waypoint() {
        let e = engine();
        let m = motion(
            "pose1",
            &["joint1", "joint3"],
            vec![vec![0.5, 1.0], vec![1.0, 2.0]],
            vec![1.0, 2.0],
        );
        let outcome = e.execute(&m, true, &CancelToken::new());
        assert_eq!(outcome, ExecutionOutcome::Succeeded);
        let pos = e.joint_positions();
        assert_eq!(pos["joint1"], 1.0);
        assert_eq!(pos["joint3"], 2.0);
        assert_eq!(pos["joint2"], 0.0);
    }

    #[test]
    fn canceled_before_start_reports_canceled() {
        let e = engine();
        let m = motion("pose1", &["joint1"], vec![vec![1.0]], vec![1.0]);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(e.execute(&m, true, &token), ExecutionOutcome::Canceled);
    }

    #[test]
    fn cancel_during_playback_stops_motion() {
        let e = Arc::new(
            PlaybackEngine::new(
                unplanned(),
                vec![ctrl("controller_1", &["joint1"])],
                &PlaybackConfig::default(),
            )
            .unwrap(),
        );
        let m = motion("slow", &["joint1"], vec![vec![1.0]], vec![30.0]);
        let token = CancelToken::new();
        let worker = {
            let e = e.clone();
            let token = token.clone();
            std::thread::spawn(move || e.execute(&m, true, &token))
        };
        std::thread::sleep(Duration::from_millis(50));
        token.cancel();
        assert_eq!(worker.join().unwrap(), ExecutionOutcome::Canceled);
        assert!(e.joint_positions()["joint1"] < 1.0);
    }

    #[test]
    fn controller_deactivated_during_playback_fails() {
        let e = Arc::new(
            PlaybackEngine::new(
                unplanned(),
                vec![ctrl("controller_1", &["joint1"])],
                &PlaybackConfig::default(),
            )
            .unwrap(),
        );
        let m = motion("slow", &["joint1"], vec![vec![1.0]], vec![30.0]);
        let worker = {
            let e = e.clone();
            std::thread::spawn(move || e.execute(&m, true, &CancelToken::new()))
        };
        std::thread::sleep(Duration::from_millis(50));
        e.set_controller_active("controller_1", false).unwrap();
        assert_eq!(
            worker.join().unwrap(),
            ExecutionOutcome::failed(
                "Controller 'controller_1' has been deactivated while executing the motion"
            )
        );
    }

    #[test]
    fn missing_joint_state_is_an_error() {
        let e = engine();
        let m = motion("ghost", &["joint9"], vec![vec![1.0]], vec![1.0]);
        let outcome = e.execute(&m, true, &CancelToken::new());
        assert!(outcome.error().contains("some joint has not been found"));
    }

    fn planning_engine(groups: Vec<PlanningGroup>) -> PlaybackEngine {
        let planner = PlannerConfig {
            planning_groups: groups,
            exclude_from_planning_joints: vec!["joint3".into()],
            ..Default::default()
        };
        PlaybackEngine::new(
            planner,
            vec![ctrl("arm", &["joint1", "joint2", "joint3"])],
            &instant(),
        )
        .unwrap()
    }

    #[test]
    fn planning_without_matching_group_fails() {
        let e = planning_engine(vec![PlanningGroup {
            name: "arm".into(),
            joints: vec!["joint1".into()],
        }]);
        let m = motion("reach", &["joint1", "joint2"], vec![vec![1.0, 1.0]], vec![1.0]);
        let outcome = e.execute(&m, false, &CancelToken::new());
        assert_eq!(
            outcome,
            ExecutionOutcome::failed("No valid move groups found for the given joints")
        );
    }

    #[test]
    fn planning_excluded_joints_skip_planning() {
        let e = planning_engine(vec![PlanningGroup {
            name: "arm".into(),
            joints: vec!["joint1".into()],
        }]);
        let m = motion("wrist", &["joint3"], vec![vec![1.0]], vec![1.0]);
        assert_eq!(
            e.execute(&m, false, &CancelToken::new()),
            ExecutionOutcome::Succeeded
        );
    }

    #[test]
    fn planned_single_waypoint_at_goal_succeeds_immediately() {
        let e = planning_engine(vec![PlanningGroup {
            name: "arm".into(),
            joints: vec!["joint1".into(), "joint2".into()],
        }]);
        let m = motion("home", &["joint1", "joint2"], vec![vec![0.0, 0.0005]], vec![1.0]);
        let token = CancelToken::new();
        token.cancel();
        // no playback happens, so the canceled token is never observed
        assert_eq!(e.execute(&m, false, &token), ExecutionOutcome::Succeeded);
    }

    #[test]
    fn unplayable_duration_fails_instead_of_panicking() {
        let e = PlaybackEngine::new(
            unplanned(),
            vec![ctrl("controller_1", &["joint1"])],
            &PlaybackConfig::default(),
        )
        .unwrap();
        let m = motion("forever", &["joint1"], vec![vec![1.0]], vec![1e20]);
        assert!(m.validate().is_ok());

        match e.execute(&m, true, &CancelToken::new()) {
            ExecutionOutcome::Failed(msg) => assert!(msg.contains("cannot be played back")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
