use crate::types::Config;
use anyhow::{ensure, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        ensure!(a.max_slots >= 1, "analysis.max_slots must be at least 1");
        ensure!(a.history_window >= 1, "analysis.history_window must be at least 1");
        ensure!(
            a.state_change_threshold >= 1 && a.state_change_threshold <= a.history_window,
            "analysis.state_change_threshold must be in 1..={} (got {})",
            a.history_window,
            a.state_change_threshold
        );
        ensure!(
            a.movement_threshold >= 0.0,
            "analysis.movement_threshold must not be negative"
        );

        let d = &self.detection;
        ensure!(
            (0.0..=1.0).contains(&d.confidence_threshold),
            "detection.confidence_threshold must be in [0, 1] (got {})",
            d.confidence_threshold
        );

        let v = &self.video;
        ensure!(
            v.resize_factor > 0.0 && v.resize_factor.is_finite(),
            "video.resize_factor must be positive (got {})",
            v.resize_factor
        );
        ensure!(v.fallback_fps > 0.0, "video.fallback_fps must be positive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "analysis:\n  movement_threshold: 20.0\nvideo:\n  resize_factor: 0.25\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.analysis.movement_threshold, 20.0);
        assert_eq!(config.analysis.history_window, 5);
        assert_eq!(config.analysis.state_change_threshold, 3);
        assert_eq!(config.analysis.max_slots, 2);
        assert_eq!(config.video.resize_factor, 0.25);
        assert_eq!(config.detection.target_class, 15);
        assert_eq!(config.classifier.walking_min_aspect, 1.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_threshold_above_window() {
        let mut config = Config::default();
        config.analysis.state_change_threshold = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_resize_and_confidence() {
        let mut config = Config::default();
        config.video.resize_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detection.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shipped_config_loads() {
        let config = Config::load("config.yaml").unwrap();
        assert_eq!(config.logging.level, "cattax=info");
        assert_eq!(config.analysis.interaction_distance, 100.0);
        assert!(config.detection.detections_path.is_none());
    }
}
