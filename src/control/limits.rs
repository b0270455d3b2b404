//! Kinematic limits of the robot base

use crate::common::VelocityCommand;
use crate::error::{NavError, Result};
use serde::{Deserialize, Serialize};

/// Velocity and acceleration bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicLimits {
    /// Maximum forward velocity (m/s)
    pub max_linear_x: f64,
    /// Minimum forward velocity (m/s); negative values allow reversing
    pub min_linear_x: f64,
    /// Maximum lateral speed (m/s); zero for differential drive
    pub max_linear_y: f64,
    /// Maximum angular speed (rad/s)
    pub max_angular: f64,
    /// Linear acceleration bound (m/s²)
    pub linear_acceleration: f64,
    /// Angular acceleration bound (rad/s²)
    pub angular_acceleration: f64,
}

impl Default for KinematicLimits {
    fn default() -> Self {
        KinematicLimits {
            max_linear_x: 0.5,
            min_linear_x: 0.0,
            max_linear_y: 0.0,
            max_angular: 1.0,
            linear_acceleration: 1.0,
            angular_acceleration: 2.0,
        }
    }
}

impl KinematicLimits {
    /// Reject non-positive or non-finite limits
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_linear_x", self.max_linear_x),
            ("max_angular", self.max_angular),
            ("linear_acceleration", self.linear_acceleration),
            ("angular_acceleration", self.angular_acceleration),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(NavError::InfeasibleConfiguration(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.min_linear_x.is_finite() || self.min_linear_x > 0.0 {
            return Err(NavError::InfeasibleConfiguration(format!(
                "min_linear_x must be zero or negative, got {}",
                self.min_linear_x
            )));
        }
        if !self.max_linear_y.is_finite() || self.max_linear_y < 0.0 {
            return Err(NavError::InfeasibleConfiguration(format!(
                "max_linear_y must be non-negative, got {}",
                self.max_linear_y
            )));
        }
        Ok(())
    }

    pub fn is_holonomic(&self) -> bool {
        self.max_linear_y > 0.0
    }

    /// Clamp a command into the velocity bounds
    pub fn clamp(&self, cmd: &VelocityCommand) -> VelocityCommand {
        VelocityCommand {
            linear_x: cmd.linear_x.clamp(self.min_linear_x, self.max_linear_x),
            linear_y: cmd.linear_y.clamp(-self.max_linear_y, self.max_linear_y),
            angular: cmd.angular.clamp(-self.max_angular, self.max_angular),
        }
    }

    /// Largest distance the robot can cover in `duration`
    pub fn max_travel(&self, duration: f64) -> f64 {
        let linear = self.max_linear_x.max(-self.min_linear_x);
        linear.hypot(self.max_linear_y) * duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_are_valid() {
        assert!(KinematicLimits::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_limits() {
        let limits = KinematicLimits {
            max_angular: 0.0,
            ..Default::default()
        };
        assert!(matches!(limits.validate(), Err(NavError::InfeasibleConfiguration(_))));

        let limits = KinematicLimits {
            linear_acceleration: -1.0,
            ..Default::default()
        };
        assert!(limits.validate().is_err());

        let limits = KinematicLimits {
            min_linear_x: 0.2,
            ..Default::default()
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_clamp() {
        let limits = KinematicLimits::default();
        let cmd = limits.clamp(&VelocityCommand::new(2.0, 1.0, -5.0));
        assert_eq!(cmd, VelocityCommand::new(0.5, 0.0, -1.0));
    }
}
