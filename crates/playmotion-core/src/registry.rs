use crate::config::Config;
use crate::error::{MotionError, Result};
use crate::types::MotionInfo;
use std::collections::HashMap;
use tracing::{error, info};

/// Motion definitions keyed by motion key. Keys keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct MotionRegistry {
    keys: Vec<String>,
    motions: HashMap<String, MotionInfo>,
}

impl MotionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every valid motion from a config. Invalid entries are logged and
    /// skipped; a config without a single valid motion is an error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for motion in config.parse_motions() {
            registry.insert(motion);
        }
        if registry.is_empty() {
            error!("No valid motions defined in configuration file.");
            return Err(MotionError::NoMotions);
        }
        info!(count = registry.len(), "motions loaded");
        Ok(registry)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.motions.contains_key(key)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: &str) -> Result<&MotionInfo> {
        self.motions
            .get(key)
            .ok_or_else(|| MotionError::MotionNotFound(key.to_string()))
    }

    /// Add a motion, replacing an existing one only when `overwrite` is set.
    pub fn add(&mut self, motion: MotionInfo, overwrite: bool) -> Result<()> {
        motion.validate()?;
        if self.exists(&motion.key) && !overwrite {
            return Err(MotionError::MotionExists(motion.key));
        }
        self.insert(motion);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<MotionInfo> {
        let motion = self
            .motions
            .remove(key)
            .ok_or_else(|| MotionError::MotionNotFound(key.to_string()))?;
        self.keys.retain(|k| k != key);
        Ok(motion)
    }

    fn insert(&mut self, motion: MotionInfo) {
        if !self.motions.contains_key(&motion.key) {
            self.keys.push(motion.key.clone());
        }
        self.motions.insert(motion.key.clone(), motion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion(key: &str, pos: f64) -> MotionInfo {
        MotionInfo {
            key: key.into(),
            name: key.to_uppercase(),
            joints: vec!["joint1".into()],
            positions: vec![vec![pos]],
            times: vec![1.0],
            ..Default::default()
        }
    }

    fn registry() -> MotionRegistry {
        let mut r = MotionRegistry::new();
        for key in ["home", "pose1", "controller_2_pose"] {
            r.add(motion(key, 0.0), false).unwrap();
        }
        r
    }

    #[test]
    fn lists_every_key() {
        let r = registry();
        let mut keys = r.keys().to_vec();
        keys.sort();
        assert_eq!(keys, vec!["controller_2_pose", "home", "pose1"]);
    }

    #[test]
    fn add_without_overwrite_fails_on_existing_key() {
        let mut r = registry();
        let err = r.add(motion("home", 1.0), false).unwrap_err();
        assert!(matches!(err, MotionError::MotionExists(_)));
        assert_eq!(r.get("home").unwrap().positions[0], vec![0.0]);
    }

    #[test]
    fn add_with_overwrite_replaces_definition() {
        let mut r = registry();
        r.add(motion("home", 1.5), true).unwrap();
        assert_eq!(r.get("home").unwrap().positions[0], vec![1.5]);
        assert_eq!(r.len(), 3);
        assert_eq!(r.keys()[0], "home");
    }

    #[test]
    fn add_rejects_invalid_motion() {
        let mut r = registry();
        let mut bad = motion("bad", 0.0);
        bad.times.push(2.0);
        assert!(r.add(bad, false).is_err());
        assert!(!r.exists("bad"));

        assert!(matches!(
            r.add(motion("", 0.0), true),
            Err(MotionError::EmptyMotionKey)
        ));
    }

    #[test]
    fn remove_existing_and_missing() {
        let mut r = registry();
        let removed = r.remove("pose1").unwrap();
        assert_eq!(removed.key, "pose1");
        assert!(!r.exists("pose1"));
        assert!(!r.keys().contains(&"pose1".to_string()));
        assert!(matches!(
            r.remove("pose1"),
            Err(MotionError::MotionNotFound(_))
        ));
    }

    #[test]
    fn get_missing_is_not_found() {
        let r = registry();
        assert!(matches!(
            r.get("unreal_motion"),
            Err(MotionError::MotionNotFound(_))
        ));
    }

    #[test]
    fn from_config_without_valid_motions_fails() {
        let config = Config::from_yaml(
            "motions:\n  broken:\n    joints: [a]\n    positions: [1.0, 2.0]\n    times_from_start: [1.0]\n",
        )
        .unwrap();
        assert!(matches!(
            MotionRegistry::from_config(&config),
            Err(MotionError::NoMotions)
        ));
    }
}
