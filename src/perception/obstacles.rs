//! Obstacle observations

use crate::common::Stamp;
use nalgebra::Point2;

/// A wholesale snapshot of obstacle points in a sensor frame
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleSet {
    pub frame_id: String,
    pub stamp: Stamp,
    pub points: Vec<Point2<f64>>,
}

impl ObstacleSet {
    pub fn new(frame_id: &str, stamp: Stamp, points: Vec<Point2<f64>>) -> Self {
        ObstacleSet {
            frame_id: frame_id.to_string(),
            stamp,
            points,
        }
    }

    /// Convenience constructor from (x, y) pairs
    pub fn from_xy(frame_id: &str, stamp: Stamp, points: &[(f64, f64)]) -> Self {
        Self::new(
            frame_id,
            stamp,
            points.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
        )
    }

    /// An observation with no obstacles
    pub fn empty(frame_id: &str, stamp: Stamp) -> Self {
        Self::new(frame_id, stamp, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Age of the observation at time `now`
    pub fn age(&self, now: Stamp) -> f64 {
        now - self.stamp
    }
}
