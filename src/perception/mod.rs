//! Frame resolution for the navigator
//!
//! At each tick the [`FrameResolver`] produces the robot pose in the
//! reference frame and moves every obstacle point into that same frame.
pub mod filters;
pub mod obstacles;
pub mod transforms;

pub use self::obstacles::ObstacleSet;
pub use self::transforms::TransformBuffer;

use self::filters::{FiniteFilter, Filter, RangeFilter};
use crate::common::{Pose2D, Stamp};
use crate::error::{NavError, Result};
use nalgebra::Point2;

/// Robot pose and obstacles resolved into the reference frame for one tick
#[derive(Debug, Clone)]
pub struct ResolvedFrame {
    pub stamp: Stamp,
    pub robot_pose: Pose2D,
    pub obstacles: Vec<Point2<f64>>,
}

/// Resolves poses and obstacle points into a single reference frame
#[derive(Debug, Clone)]
pub struct FrameResolver {
    reference_frame: String,
    robot_frame: String,
    lookup_window: f64,
    max_obstacle_age: f64,
    max_sensor_range: Option<f64>,
}

impl FrameResolver {
    /// Create a new frame resolver
    pub fn new(reference_frame: &str, robot_frame: &str, lookup_window: f64, max_obstacle_age: f64) -> Self {
        FrameResolver {
            reference_frame: reference_frame.to_string(),
            robot_frame: robot_frame.to_string(),
            lookup_window,
            max_obstacle_age,
            max_sensor_range: None,
        }
    }

    /// Ignore obstacle points beyond `range` from the sensor origin
    pub fn with_max_sensor_range(mut self, range: Option<f64>) -> Self {
        self.max_sensor_range = range;
        self
    }

    pub fn reference_frame(&self) -> &str {
        &self.reference_frame
    }

    pub fn robot_frame(&self) -> &str {
        &self.robot_frame
    }

    /// Robot pose in the reference frame at `now`
    pub fn robot_pose(&self, buffer: &TransformBuffer, now: Stamp) -> Result<Pose2D> {
        let iso = buffer.lookup(&self.reference_frame, &self.robot_frame, now, self.lookup_window)?;
        let pose = Pose2D::from_isometry(&iso);
        if !pose.is_finite() {
            return Err(NavError::InputUnavailable(format!(
                "robot pose '{}' -> '{}' is not finite",
                self.reference_frame, self.robot_frame
            )));
        }
        Ok(pose)
    }

    /// Resolve the robot pose and the latest obstacle set
    pub fn resolve(
        &self,
        buffer: &TransformBuffer,
        obstacles: Option<&ObstacleSet>,
        now: Stamp,
    ) -> Result<ResolvedFrame> {
        let robot_pose = self.robot_pose(buffer, now)?;

        let obstacles = obstacles
            .ok_or_else(|| NavError::InputUnavailable("no obstacle data received".to_string()))?;
        let age = obstacles.age(now);
        if age > self.max_obstacle_age {
            return Err(NavError::InputUnavailable(format!(
                "obstacle data is {:.3}s old (limit {:.3}s)",
                age, self.max_obstacle_age
            )));
        }

        let sensor_to_reference = buffer.lookup(
            &self.reference_frame,
            &obstacles.frame_id,
            obstacles.stamp,
            self.lookup_window,
        )?;

        let mut points = FiniteFilter.filter(obstacles.points.clone());
        if let Some(range) = self.max_sensor_range {
            points = RangeFilter::new(range).filter(points);
        }
        let points = points.iter().map(|p| sensor_to_reference * p).collect();

        Ok(ResolvedFrame {
            stamp: now,
            robot_pose,
            obstacles: points,
        })
    }

    /// Express a pose given in `frame_id` in the reference frame
    pub fn to_reference(&self, buffer: &TransformBuffer, frame_id: &str, pose: &Pose2D, now: Stamp) -> Result<Pose2D> {
        let iso = buffer.lookup(&self.reference_frame, frame_id, now, self.lookup_window)?;
        Ok(Pose2D::from_isometry(&(iso * pose.to_isometry())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry2, Vector2};
    use std::f64::consts::FRAC_PI_2;

    fn buffer() -> TransformBuffer {
        let mut buffer = TransformBuffer::new();
        buffer.set_transform("map", "base_link", Isometry2::new(Vector2::new(2.0, 1.0), FRAC_PI_2), 10.0);
        buffer.set_static_transform("base_link", "laser", Isometry2::new(Vector2::new(0.1, 0.0), 0.0));
        buffer
    }

    fn resolver() -> FrameResolver {
        FrameResolver::new("map", "base_link", 0.5, 1.0)
    }

    #[test]
    fn test_resolves_pose_and_obstacles() {
        let obstacles = ObstacleSet::from_xy("laser", 10.0, &[(1.0, 0.0)]);
        let frame = resolver().resolve(&buffer(), Some(&obstacles), 10.0).unwrap();
        assert!((frame.robot_pose.x - 2.0).abs() < 1e-9);
        assert!((frame.robot_pose.heading - FRAC_PI_2).abs() < 1e-9);
        // 1.1 m ahead of a robot facing +y
        assert!((frame.obstacles[0].x - 2.0).abs() < 1e-9);
        assert!((frame.obstacles[0].y - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_missing_obstacles_is_input_unavailable() {
        let err = resolver().resolve(&buffer(), None, 10.0).unwrap_err();
        assert!(matches!(err, NavError::InputUnavailable(_)));
    }

    #[test]
    fn test_stale_obstacles_is_input_unavailable() {
        let obstacles = ObstacleSet::empty("laser", 8.0);
        let err = resolver().resolve(&buffer(), Some(&obstacles), 10.0).unwrap_err();
        assert!(matches!(err, NavError::InputUnavailable(_)));
    }

    #[test]
    fn test_missing_robot_transform() {
        let obstacles = ObstacleSet::empty("laser", 20.0);
        let err = resolver().resolve(&buffer(), Some(&obstacles), 20.0).unwrap_err();
        assert!(matches!(err, NavError::TransformUnavailable { .. }));
    }

    #[test]
    fn test_non_finite_robot_pose_is_input_unavailable() {
        let mut buffer = buffer();
        buffer.set_transform("map", "base_link", Isometry2::new(Vector2::new(f64::NAN, 0.0), 0.0), 11.0);
        let obstacles = ObstacleSet::empty("laser", 11.0);
        let err = resolver().resolve(&buffer, Some(&obstacles), 11.0).unwrap_err();
        assert!(matches!(err, NavError::InputUnavailable(_)));
    }

    #[test]
    fn test_sensor_range_filter() {
        let obstacles = ObstacleSet::from_xy("laser", 10.0, &[(1.0, 0.0), (9.0, 0.0)]);
        let frame = resolver()
            .with_max_sensor_range(Some(5.0))
            .resolve(&buffer(), Some(&obstacles), 10.0)
            .unwrap();
        assert_eq!(frame.obstacles.len(), 1);
    }

    #[test]
    fn test_goal_to_reference() {
        let goal = Pose2D::new(1.0, 0.0, 0.0);
        let in_map = resolver().to_reference(&buffer(), "base_link", &goal, 10.0).unwrap();
        assert!((in_map.x - 2.0).abs() < 1e-9);
        assert!((in_map.y - 2.0).abs() < 1e-9);
        assert!((in_map.heading - FRAC_PI_2).abs() < 1e-9);
    }
}
