//! Pose and velocity types shared across the navigator

use nalgebra::{Isometry2, Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Seconds on the navigator's clock
pub type Stamp = f64;

/// Wrap an angle into (-π, π]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

/// A 2D pose (x, y, heading)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    /// Heading in radians, normalized to (-π, π]
    pub heading: f64,
}

impl Pose2D {
    /// Create a new pose with a normalized heading
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Pose2D {
            x,
            y,
            heading: normalize_angle(heading),
        }
    }

    pub fn from_isometry(iso: &Isometry2<f64>) -> Self {
        Pose2D::new(
            iso.translation.vector.x,
            iso.translation.vector.y,
            iso.rotation.angle(),
        )
    }

    pub fn to_isometry(&self) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(self.x, self.y), self.heading)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.heading.is_finite()
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Euclidean distance between the positions of two poses
    pub fn distance_to(&self, other: &Pose2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Bearing from this pose's position to another pose's position
    pub fn bearing_to(&self, other: &Pose2D) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Absolute heading difference, in [0, π]
    pub fn heading_error(&self, other: &Pose2D) -> f64 {
        normalize_angle(other.heading - self.heading).abs()
    }
}

/// Velocity command for the robot (body frame)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub linear_x: f64,
    pub linear_y: f64,
    pub angular: f64,
}

impl VelocityCommand {
    pub fn new(linear_x: f64, linear_y: f64, angular: f64) -> Self {
        VelocityCommand {
            linear_x,
            linear_y,
            angular,
        }
    }

    /// The zero-velocity command
    pub fn stop() -> Self {
        VelocityCommand::default()
    }

    pub fn is_stop(&self) -> bool {
        self.linear_x == 0.0 && self.linear_y == 0.0 && self.angular == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.linear_x.is_finite() && self.linear_y.is_finite() && self.angular.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle_range() {
        assert!((normalize_angle(3.0 * PI).abs() - PI).abs() < 1e-9);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(-0.5) + 0.5).abs() < 1e-12);
        assert!((normalize_angle(2.0 * PI + 0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_pose_isometry_round_trip() {
        let pose = Pose2D::new(1.5, -2.0, 0.75);
        let back = Pose2D::from_isometry(&pose.to_isometry());
        assert!((back.x - 1.5).abs() < 1e-12);
        assert!((back.y + 2.0).abs() < 1e-12);
        assert!((back.heading - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_bearing_and_heading_error() {
        let a = Pose2D::new(0.0, 0.0, 0.0);
        let b = Pose2D::new(0.0, 2.0, -PI / 2.0);
        assert!((a.bearing_to(&b) - PI / 2.0).abs() < 1e-12);
        assert!((a.distance_to(&b) - 2.0).abs() < 1e-12);
        assert!((a.heading_error(&b) - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_stop_command() {
        assert!(VelocityCommand::stop().is_stop());
        assert!(!VelocityCommand::new(0.0, 0.0, 0.1).is_stop());
    }

    #[test]
    fn test_finite_command() {
        assert!(VelocityCommand::new(0.2, 0.0, -0.4).is_finite());
        assert!(!VelocityCommand::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!VelocityCommand::new(0.0, 0.0, f64::INFINITY).is_finite());
    }
}
