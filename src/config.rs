//! Configuration for the reactive navigator
//!
//! [`NavigationParams`] is the navigation-parameters file (YAML). [`NodeConfig`]
//! holds the runtime options the node is launched with.

use crate::control::KinematicLimits;
use crate::error::{NavError, Result};
use crate::geometry::Footprint;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete navigation parameter set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationParams {
    pub kinematics: KinematicLimits,
    pub candidates: CandidateParams,
    pub safety: SafetyParams,
    pub scoring: ScoringParams,
    pub goal: GoalParams,
    pub thresholds: ThresholdParams,
    pub robot: RobotParams,
    pub skipped_tick: SkippedTickPolicy,
    pub log_sink: LogSinkParams,
}

/// Which candidate generator to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    #[default]
    DynamicWindow,
    Holonomic,
}

/// Candidate sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateParams {
    pub generator: GeneratorKind,
    /// Samples across the forward velocity window
    pub linear_samples: usize,
    /// Samples across the lateral velocity window (holonomic only)
    pub lateral_samples: usize,
    /// Samples across the angular velocity window
    pub angular_samples: usize,
}

impl Default for CandidateParams {
    fn default() -> Self {
        CandidateParams {
            generator: GeneratorKind::DynamicWindow,
            linear_samples: 7,
            lateral_samples: 5,
            angular_samples: 9,
        }
    }
}

/// Collision checking along simulated trajectories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyParams {
    /// Minimum acceptable clearance (m)
    pub safety_margin: f64,
    /// Clearance beyond the margin at which the clearance score saturates (m)
    pub clearance_saturation: f64,
    /// Poses checked per trajectory
    pub trajectory_samples: usize,
    /// Simulation horizon in control periods
    pub horizon_ticks: u32,
}

impl Default for SafetyParams {
    fn default() -> Self {
        SafetyParams {
            safety_margin: 0.10,
            clearance_saturation: 0.30,
            trajectory_samples: 5,
            horizon_ticks: 1,
        }
    }
}

/// How clearance and goal progress are combined
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Quantized clearance first, goal progress breaks ties
    Lexicographic { clearance_resolution: f64 },
    /// `clearance_weight * clearance + progress`
    Weighted { clearance_weight: f64 },
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::Lexicographic {
            clearance_resolution: 0.05,
        }
    }
}

/// Goal progress weights and the selection policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    pub distance_weight: f64,
    pub heading_weight: f64,
    pub policy: SelectionPolicy,
}

impl Default for ScoringParams {
    fn default() -> Self {
        ScoringParams {
            distance_weight: 1.0,
            heading_weight: 0.5,
            policy: SelectionPolicy::default(),
        }
    }
}

/// Defaults applied to goals that do not carry their own tolerances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalParams {
    /// Distance at which a goal counts as reached (m, inclusive)
    pub acceptance_radius: f64,
    /// Heading error at which a goal counts as reached (rad, inclusive); π ignores heading
    pub heading_tolerance: f64,
}

impl Default for GoalParams {
    fn default() -> Self {
        GoalParams {
            acceptance_radius: 0.40,
            heading_tolerance: PI,
        }
    }
}

/// Failure counters and input freshness limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    /// Consecutive skipped ticks tolerated before BLOCKED
    pub input_failure_threshold: u32,
    /// Consecutive ticks without a feasible non-stop candidate tolerated before BLOCKED
    pub blocked_threshold: u32,
    /// Consecutive period overruns before the loop reports degraded
    pub overrun_degraded_threshold: u32,
    /// Oldest obstacle observation accepted (s)
    pub max_obstacle_age: f64,
    /// Transform lookup tolerance around the requested time (s)
    pub transform_lookup_window: f64,
    /// Obstacle points beyond this range from the sensor are ignored (m)
    pub max_sensor_range: Option<f64>,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        ThresholdParams {
            input_failure_threshold: 3,
            blocked_threshold: 5,
            overrun_degraded_threshold: 5,
            max_obstacle_age: 1.0,
            transform_lookup_window: 0.5,
            max_sensor_range: None,
        }
    }
}

/// Robot shape; a polygon wins over a radius
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotParams {
    pub footprint: Option<Vec<[f64; 2]>>,
    pub radius: Option<f64>,
}

impl RobotParams {
    /// The configured footprint, if any
    pub fn footprint(&self) -> Result<Option<Footprint>> {
        if let Some(points) = &self.footprint {
            let pairs: Vec<(f64, f64)> = points.iter().map(|p| (p[0], p[1])).collect();
            return Footprint::polygon(&pairs).map(Some);
        }
        match self.radius {
            Some(radius) => Footprint::circle(radius).map(Some),
            None => Ok(None),
        }
    }
}

/// What a skipped tick sends downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkippedTickPolicy {
    /// Emit a stop command
    #[default]
    Stop,
    /// Emit nothing
    Silent,
}

/// What to do when the navigation log cannot be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogFailurePolicy {
    /// Turn the sink off after the first failure
    Disable,
    /// Keep trying until this many writes in a row have failed
    Retry { max_consecutive_failures: u32 },
}

impl Default for LogFailurePolicy {
    fn default() -> Self {
        LogFailurePolicy::Retry {
            max_consecutive_failures: 10,
        }
    }
}

/// Navigation log sink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSinkParams {
    pub path: PathBuf,
    pub failure_policy: LogFailurePolicy,
}

impl Default for LogSinkParams {
    fn default() -> Self {
        LogSinkParams {
            path: PathBuf::from("nav_log.jsonl"),
            failure_policy: LogFailurePolicy::default(),
        }
    }
}

fn infeasible(msg: String) -> NavError {
    NavError::InfeasibleConfiguration(msg)
}

impl NavigationParams {
    /// Load parameters from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NavError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse parameters from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let params: NavigationParams = serde_yaml::from_str(content)?;
        Ok(params)
    }

    /// Check that every value can drive the control loop
    pub fn validate(&self) -> Result<()> {
        self.kinematics.validate()?;

        let c = &self.candidates;
        if c.linear_samples == 0 || c.angular_samples == 0 || c.lateral_samples == 0 {
            return Err(infeasible("candidate sample counts must be at least 1".to_string()));
        }
        if c.generator == GeneratorKind::Holonomic && !self.kinematics.is_holonomic() {
            return Err(infeasible("holonomic generator needs max_linear_y > 0".to_string()));
        }

        let s = &self.safety;
        if !s.safety_margin.is_finite() || s.safety_margin < 0.0 {
            return Err(infeasible(format!("safety_margin must be non-negative, got {}", s.safety_margin)));
        }
        if !s.clearance_saturation.is_finite() || s.clearance_saturation <= 0.0 {
            return Err(infeasible(format!(
                "clearance_saturation must be positive, got {}",
                s.clearance_saturation
            )));
        }
        if s.trajectory_samples == 0 || s.horizon_ticks == 0 {
            return Err(infeasible("trajectory_samples and horizon_ticks must be at least 1".to_string()));
        }

        let sc = &self.scoring;
        for (name, w) in [("distance_weight", sc.distance_weight), ("heading_weight", sc.heading_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(infeasible(format!("{} must be non-negative, got {}", name, w)));
            }
        }
        match sc.policy {
            SelectionPolicy::Lexicographic { clearance_resolution } if !(clearance_resolution > 0.0) => {
                return Err(infeasible(format!(
                    "clearance_resolution must be positive, got {}",
                    clearance_resolution
                )));
            }
            SelectionPolicy::Weighted { clearance_weight } if !(clearance_weight >= 0.0) => {
                return Err(infeasible(format!(
                    "clearance_weight must be non-negative, got {}",
                    clearance_weight
                )));
            }
            _ => {}
        }

        let g = &self.goal;
        if !(g.acceptance_radius > 0.0) || !(g.heading_tolerance > 0.0 && g.heading_tolerance <= PI) {
            return Err(infeasible(format!(
                "goal tolerances out of range: radius {}, heading {}",
                g.acceptance_radius, g.heading_tolerance
            )));
        }

        let t = &self.thresholds;
        if !(t.max_obstacle_age > 0.0) || !(t.transform_lookup_window >= 0.0) {
            return Err(infeasible(format!(
                "input freshness limits out of range: obstacle age {}, lookup window {}",
                t.max_obstacle_age, t.transform_lookup_window
            )));
        }

        self.robot.footprint()?;
        Ok(())
    }
}

/// Runtime options of the navigation node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub reference_frame: String,
    pub robot_frame: String,
    /// Tick interval (s)
    pub control_period: f64,
    pub obstacle_source: String,
    /// Empty when the footprint comes from the parameters file
    pub footprint_source: String,
    pub goal_source: String,
    pub command_sink: String,
    pub params_file: Option<PathBuf>,
    pub save_nav_log: bool,
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            reference_frame: "map".to_string(),
            robot_frame: "base_link".to_string(),
            control_period: 0.2,
            obstacle_source: "/local_map_pointcloud".to_string(),
            footprint_source: String::new(),
            goal_source: "/goal_pose".to_string(),
            command_sink: "/cmd_vel".to_string(),
            params_file: None,
            save_nav_log: false,
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.control_period)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.control_period.is_finite() || self.control_period <= 0.0 {
            return Err(infeasible(format!(
                "control_period must be positive, got {}",
                self.control_period
            )));
        }
        if self.reference_frame.is_empty() || self.robot_frame.is_empty() {
            return Err(infeasible("reference and robot frames must be named".to_string()));
        }
        Ok(())
    }

    /// Navigation parameters from `params_file`, or defaults when none is set
    pub fn load_params(&self) -> Result<NavigationParams> {
        match &self.params_file {
            Some(path) => NavigationParams::load(path),
            None => Ok(NavigationParams::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        assert!(NavigationParams::default().validate().is_ok());
        assert!(NodeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_holonomic_generator_needs_lateral_speed() {
        let mut params = NavigationParams::default();
        params.candidates.generator = GeneratorKind::Holonomic;
        assert!(matches!(params.validate(), Err(NavError::InfeasibleConfiguration(_))));
        params.kinematics.max_linear_y = 0.3;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
kinematics:
  max_linear_x: 0.8
safety:
  safety_margin: 0.2
scoring:
  policy:
    type: weighted
    clearance_weight: 50.0
robot:
  footprint: [[-0.3, -0.2], [0.3, -0.2], [0.3, 0.2], [-0.3, 0.2]]
skipped_tick: silent
"#;
        let params = NavigationParams::from_yaml_str(yaml).unwrap();
        assert_eq!(params.kinematics.max_linear_x, 0.8);
        assert_eq!(params.kinematics.max_angular, 1.0);
        assert_eq!(params.safety.safety_margin, 0.2);
        assert_eq!(params.safety.trajectory_samples, 5);
        assert_eq!(params.scoring.policy, SelectionPolicy::Weighted { clearance_weight: 50.0 });
        assert_eq!(params.skipped_tick, SkippedTickPolicy::Silent);
        assert!(params.robot.footprint().unwrap().is_some());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_malformed_footprint_is_infeasible() {
        let yaml = "robot:\n  footprint: [[0.0, 0.0], [1.0, 0.0]]\n";
        let params = NavigationParams::from_yaml_str(yaml).unwrap();
        assert!(matches!(params.validate(), Err(NavError::InfeasibleConfiguration(_))));
    }

    #[test]
    fn test_radius_footprint() {
        let yaml = "robot:\n  radius: 0.25\n";
        let params = NavigationParams::from_yaml_str(yaml).unwrap();
        let footprint = params.robot.footprint().unwrap().unwrap();
        assert!((footprint.bounding_radius() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_bad_yaml_is_config_error() {
        let err = NavigationParams::from_yaml_str("kinematics: [1, 2").unwrap_err();
        assert!(matches!(err, NavError::Config(_)));
    }

    #[test]
    fn test_non_positive_period_rejected() {
        let config = NodeConfig {
            control_period: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
