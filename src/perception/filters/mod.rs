//! Filtering for raw obstacle points

use nalgebra::Point2;

/// A generic filter interface
pub trait Filter<T> {
    /// Filter the input data
    fn filter(&self, input: T) -> T;
}

/// Drops points with NaN or infinite coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct FiniteFilter;

impl Filter<Vec<Point2<f64>>> for FiniteFilter {
    fn filter(&self, input: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
        input
            .into_iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .collect()
    }
}

/// Drops points farther than `max_range` from the sensor origin
#[derive(Debug, Clone, Copy)]
pub struct RangeFilter {
    max_range: f64,
}

impl RangeFilter {
    /// Create a new range filter
    pub fn new(max_range: f64) -> Self {
        RangeFilter { max_range }
    }
}

impl Filter<Vec<Point2<f64>>> for RangeFilter {
    fn filter(&self, input: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
        let max_sq = self.max_range * self.max_range;
        input
            .into_iter()
            .filter(|p| p.coords.norm_squared() <= max_sq)
            .collect()
    }
}
