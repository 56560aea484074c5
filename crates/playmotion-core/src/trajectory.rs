use crate::config::ControllerConfig;
use crate::types::{JointNames, MotionInfo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub positions: Vec<f64>,
    pub time_from_start: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointTrajectory {
    pub joint_names: JointNames,
    pub points: Vec<TrajectoryPoint>,
}

impl JointTrajectory {
    pub fn duration(&self) -> f64 {
        self.points.last().map(|p| p.time_from_start).unwrap_or(0.0)
    }

    /// Positions at time `t`, linearly interpolated between waypoints.
    /// `start` holds the positions at time zero.
    pub fn sample(&self, t: f64, start: &[f64]) -> Vec<f64> {
        let Some(idx) = self.points.iter().position(|p| p.time_from_start >= t) else {
            return self
                .points
                .last()
                .map(|p| p.positions.clone())
                .unwrap_or_else(|| start.to_vec());
        };
        let target = &self.points[idx];
        let (t0, from) = match idx {
            0 => (0.0, start),
            _ => {
                let prev = &self.points[idx - 1];
                (prev.time_from_start, prev.positions.as_slice())
            }
        };
        let span = target.time_from_start - t0;
        let frac = if span <= 0.0 {
            1.0
        } else {
            ((t - t0) / span).clamp(0.0, 1.0)
        };
        from.iter()
            .zip(&target.positions)
            .map(|(a, b)| a + (b - a) * frac)
            .collect()
    }
}

/// Split a motion into one trajectory per active controller, keyed by
/// controller name. Each trajectory carries only the motion joints the
/// controller claims, in name order; controllers sharing no joint with the
/// motion are left out.
pub fn controller_trajectories(
    motion: &MotionInfo,
    controllers: &[ControllerConfig],
) -> BTreeMap<String, JointTrajectory> {
    let mut out = BTreeMap::new();
    for ctrl in controllers.iter().filter(|c| c.active) {
        let claimed: BTreeSet<&str> = ctrl.joints.iter().map(String::as_str).collect();
        let columns: Vec<(String, usize)> = claimed
            .iter()
            .filter_map(|joint| {
                motion
                    .joints
                    .iter()
                    .position(|j| j == joint)
                    .map(|idx| (joint.to_string(), idx))
            })
            .collect();
        if columns.is_empty() {
            continue;
        }

        let points = motion
            .positions
            .iter()
            .zip(&motion.times)
            .map(|(row, &t)| TrajectoryPoint {
                positions: columns.iter().map(|(_, idx)| row[*idx]).collect(),
                time_from_start: t,
            })
            .collect();

        out.insert(
            ctrl.name.clone(),
            JointTrajectory {
                joint_names: columns.into_iter().map(|(name, _)| name).collect(),
                points,
            },
        );
    }
    out
}

/// Time needed to move from `current` to `goal` at `velocity` on the joint
/// with the largest displacement, never less than `min_duration`.
pub fn reach_time(current: &[f64], goal: &[f64], velocity: f64, min_duration: f64) -> f64 {
    let dmax = current
        .iter()
        .zip(goal)
        .map(|(c, g)| (g - c).abs())
        .fold(0.0_f64, f64::max);
    (dmax / velocity).max(min_duration)
}

/// Delay every waypoint so the first one is reached at `approach_time`,
/// when the motion's own first time is shorter.
pub fn with_approach_time(motion: &MotionInfo, approach_time: f64) -> MotionInfo {
    let mut out = motion.clone();
    let first = motion.times.first().copied().unwrap_or(0.0);
    if approach_time > first {
        for t in &mut out.times {
            *t = *t - first + approach_time;
        }
    }
    out
}
