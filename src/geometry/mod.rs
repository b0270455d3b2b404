//! Geometry model: robot footprint and the per-tick local obstacle set
//!
//! Obstacle points are kept in the reference frame. The footprint is posed
//! per query, so nothing here is cached across ticks.
pub mod footprint;
pub mod polygon;

pub use self::footprint::{Footprint, FootprintShape, FootprintUpdate};

use crate::common::Pose2D;
use nalgebra::{Isometry2, Point2};

/// Obstacle points around the robot that can influence this tick's candidates
#[derive(Debug, Clone, Default)]
pub struct LocalObstacles {
    points: Vec<Point2<f64>>,
    excluded: usize,
}

impl LocalObstacles {
    /// Keep the points within `radius` of the robot position
    pub fn build(robot: &Pose2D, points: &[Point2<f64>], radius: f64) -> Self {
        let center = robot.position();
        let radius_sq = radius * radius;
        let kept: Vec<Point2<f64>> = points
            .iter()
            .filter(|p| (*p - center).norm_squared() <= radius_sq)
            .copied()
            .collect();
        let excluded = points.len() - kept.len();
        LocalObstacles {
            points: kept,
            excluded,
        }
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points dropped for being out of reach
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Clearance of `footprint` posed at `pose` against these obstacles
    pub fn clearance(&self, footprint: &Footprint, pose: &Isometry2<f64>) -> f64 {
        footprint.clearance(pose, &self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_obstacles_filters_by_radius() {
        let robot = Pose2D::new(1.0, 1.0, 0.0);
        let points = vec![
            Point2::new(1.5, 1.0),
            Point2::new(4.0, 1.0),
            Point2::new(1.0, 2.0),
        ];
        let local = LocalObstacles::build(&robot, &points, 1.0);
        assert_eq!(local.len(), 2);
        assert_eq!(local.excluded(), 1);
    }

    #[test]
    fn test_local_obstacles_clearance() {
        let footprint = Footprint::circle(0.2).unwrap();
        let robot = Pose2D::new(0.0, 0.0, 0.0);
        let local = LocalObstacles::build(&robot, &[Point2::new(1.0, 0.0)], 5.0);
        let c = local.clearance(&footprint, &robot.to_isometry());
        assert!((c - 0.8).abs() < 1e-12);
    }
}
