use crate::error::{MotionError, Result};
use crate::types::{JointNames, MotionInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, warn};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// MotionEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotionMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub description: String,
}

/// One motion as written in a motion file. `positions` is row-major: one
/// row of `joints.len()` values per entry in `times_from_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionEntry {
    #[serde(default)]
    pub meta: MotionMeta,
    pub joints: JointNames,
    pub positions: Vec<f64>,
    pub times_from_start: Vec<f64>,
}

impl MotionEntry {
    pub fn into_motion(self, key: &str) -> Result<MotionInfo> {
        let mut motion =
            MotionInfo::from_flat(key, self.joints, &self.positions, self.times_from_start)?;
        motion.name = self.meta.name;
        motion.usage = self.meta.usage;
        motion.description = self.meta.description;
        Ok(motion)
    }
}

// ---------------------------------------------------------------------------
// PlannerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_approach_velocity")]
    pub approach_velocity: f64,
    #[serde(default = "default_approach_min_duration")]
    pub approach_min_duration: f64,
    #[serde(default = "default_joint_tolerance")]
    pub joint_tolerance: f64,
    #[serde(default)]
    pub disable_motion_planning: bool,
    #[serde(default)]
    pub exclude_from_planning_joints: JointNames,
    #[serde(default)]
    pub planning_groups: Vec<PlanningGroup>,
}

/// A set of joints a planner can compute approach trajectories for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningGroup {
    pub name: String,
    pub joints: JointNames,
}

fn default_approach_velocity() -> f64 {
    0.5
}

fn default_approach_min_duration() -> f64 {
    0.0
}

fn default_joint_tolerance() -> f64 {
    1e-3
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            approach_velocity: default_approach_velocity(),
            approach_min_duration: default_approach_min_duration(),
            joint_tolerance: default_joint_tolerance(),
            disable_motion_planning: false,
            exclude_from_planning_joints: Vec::new(),
            planning_groups: Vec::new(),
        }
    }
}

impl PlannerConfig {
    /// Replace out-of-range values with their defaults, logging each one.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        if out.approach_velocity <= 0.0 {
            warn!(
                value = out.approach_velocity,
                "'approach_velocity' negative or 0, using the default value: {}",
                default_approach_velocity()
            );
            out.approach_velocity = default_approach_velocity();
        }
        if out.approach_min_duration < 0.0 {
            warn!(
                value = out.approach_min_duration,
                "'approach_min_duration' negative, using the default value: {}",
                default_approach_min_duration()
            );
            out.approach_min_duration = default_approach_min_duration();
        }
        if out.joint_tolerance < 0.0 {
            warn!(
                value = out.joint_tolerance,
                "'joint_tolerance' negative, using the default value: {}",
                default_joint_tolerance()
            );
            out.joint_tolerance = default_joint_tolerance();
        }
        out
    }
}

// ---------------------------------------------------------------------------
// ControllerConfig / PlaybackConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub name: String,
    pub joints: JointNames,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Multiplier applied to every wall-clock wait; `0.0` plays back instantly.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    #[serde(default)]
    pub initial_positions: HashMap<String, f64>,
}

fn default_time_scale() -> f64 {
    1.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            initial_positions: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Raw motion entries, kept untyped so one malformed motion does not
    /// prevent the others from loading.
    #[serde(default)]
    pub motions: serde_yaml::Mapping,
    #[serde(default)]
    pub motion_planner: PlannerConfig,
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(data)?;
        Ok(config)
    }

    /// Motion keys in file order.
    pub fn motion_keys(&self) -> Vec<String> {
        self.motions
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect()
    }

    /// Parse a single motion entry.
    pub fn parse_motion(&self, key: &str) -> Result<MotionInfo> {
        let value = self
            .motions
            .get(key)
            .ok_or_else(|| MotionError::MotionNotFound(key.to_string()))?;
        let entry: MotionEntry =
            serde_yaml::from_value(value.clone()).map_err(|e| MotionError::InvalidMotion {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        entry.into_motion(key)
    }

    /// Parse every motion entry, logging and skipping the invalid ones.
    pub fn parse_motions(&self) -> Vec<MotionInfo> {
        self.motion_keys()
            .iter()
            .filter_map(|key| match self.parse_motion(key) {
                Ok(motion) => Some(motion),
                Err(e) => {
                    error!(motion = %key, "{e}");
                    None
                }
            })
            .collect()
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.motions.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "no motions defined".into(),
            });
        }
        for key in self.motion_keys() {
            if let Err(e) = self.parse_motion(&key) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: e.to_string(),
                });
            }
        }

        let planner = &self.motion_planner;
        if planner.approach_velocity <= 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "motion_planner.approach_velocity must be > 0; default used".into(),
            });
        }
        if planner.approach_min_duration < 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "motion_planner.approach_min_duration must be >= 0; default used".into(),
            });
        }
        if planner.joint_tolerance < 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "motion_planner.joint_tolerance must be >= 0; default used".into(),
            });
        }
        if !planner.disable_motion_planning && planner.planning_groups.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "motion planning is enabled but 'motion_planner.planning_groups' \
                          is empty"
                    .into(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for ctrl in &self.controllers {
            if !seen.insert(ctrl.name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate controller '{}'", ctrl.name),
                });
            }
        }

        if self.playback.time_scale < 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "playback.time_scale must not be negative".into(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
motions:
  sample:
    meta:
      name: Sample
      usage: sample
      description: Sample
    joints: [joint1, joint2]
    positions: [0.0, 0.0, 1.0, 2.0, 2.0, 1.0]
    times_from_start: [0.5, 3.1, 5.8]
  no_joints:
    positions: [0.0]
    times_from_start: [1.0]
  wrong_sizes:
    joints: [joint1, joint2]
    positions: [0.0, 1.0, 2.0]
    times_from_start: [1.0, 2.0]
motion_planner:
  disable_motion_planning: true
controllers:
  - name: controller_1
    joints: [joint1, joint2]
"#;

    #[test]
    fn parses_motion_keys_in_file_order() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(
            config.motion_keys(),
            vec!["sample", "no_joints", "wrong_sizes"]
        );
    }

    #[test]
    fn parses_sample_motion_info() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let info = config.parse_motion("sample").unwrap();
        assert_eq!(info.name, "Sample");
        assert_eq!(info.usage, "sample");
        assert_eq!(info.description, "Sample");
        assert_eq!(info.joints, vec!["joint1", "joint2"]);
        assert_eq!(info.positions.len(), 3);
        assert_eq!(info.positions[0], vec![0.0, 0.0]);
        assert_eq!(info.times, vec![0.5, 3.1, 5.8]);
    }

    #[test]
    fn missing_parameter_is_invalid() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let err = config.parse_motion("no_joints").unwrap_err();
        assert!(matches!(err, MotionError::InvalidMotion { .. }));
    }

    #[test]
    fn wrong_typed_parameter_is_invalid() {
        let yaml = r#"
motions:
  sample:
    joints: 123
    positions: [0.0]
    times_from_start: [1.0]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.parse_motion("sample").is_err());
    }

    #[test]
    fn parse_motions_skips_invalid_entries() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let motions = config.parse_motions();
        assert_eq!(motions.len(), 1);
        assert_eq!(motions[0].key, "sample");
    }

    #[test]
    fn planner_defaults_apply() {
        let config = Config::from_yaml("motions: {}").unwrap();
        let planner = &config.motion_planner;
        assert!((planner.approach_velocity - 0.5).abs() < f64::EPSILON);
        assert_eq!(planner.approach_min_duration, 0.0);
        assert!((planner.joint_tolerance - 1e-3).abs() < f64::EPSILON);
        assert!(!planner.disable_motion_planning);
        assert!((config.playback.time_scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sanitized_replaces_out_of_range_values() {
        let planner = PlannerConfig {
            approach_velocity: -1.0,
            approach_min_duration: -2.0,
            joint_tolerance: -0.1,
            ..Default::default()
        };
        let clean = planner.sanitized();
        assert!((clean.approach_velocity - 0.5).abs() < f64::EPSILON);
        assert_eq!(clean.approach_min_duration, 0.0);
        assert!((clean.joint_tolerance - 1e-3).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_reports_invalid_motions_and_missing_groups() {
        let mut config = Config::from_yaml(SAMPLE).unwrap();
        config.motion_planner.disable_motion_planning = false;
        let warnings = config.validate();
        let errors: Vec<_> = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .collect();
        // two broken motions + missing planning groups
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("motions.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.controllers.len(), 1);
        assert!(config.controllers[0].active);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, MotionError::Io(_)));
    }

    #[test]
    fn bundled_motion_file_is_clean() {
        let config = Config::from_yaml(include_str!("../../../config/motions.yaml")).unwrap();
        assert_eq!(config.motion_keys(), vec!["home", "pose1", "wave"]);
        assert_eq!(config.parse_motions().len(), 3);
        assert!(config.validate().is_empty());
    }
}
