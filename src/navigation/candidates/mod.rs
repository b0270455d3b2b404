//! Motion candidate generation with multiple sampling strategies
//!
//! Every generator returns the stop command first, followed by the samples
//! reachable from the current velocity within one control period.

use crate::common::VelocityCommand;
use crate::config::CandidateParams;
use crate::control::KinematicLimits;
use std::fmt::Debug;

/// Trait for candidate generators
pub trait CandidateGenerator: Debug + Send + Sync {
    /// Create a new instance from the sampling parameters
    fn from_params(params: &CandidateParams) -> Self
    where
        Self: Sized;

    /// Candidate commands for this tick; the stop command is always index 0
    fn generate(&self, current: &VelocityCommand, limits: &KinematicLimits, period: f64) -> Vec<VelocityCommand>;

    /// Get the name of this generator
    fn name(&self) -> &str;

    /// Update the sample counts
    fn configure(&mut self, params: &CandidateParams);
}

pub mod dynamic_window;
pub mod holonomic;

pub use dynamic_window::DynamicWindowGenerator as DefaultCandidateGenerator;
pub use dynamic_window::DynamicWindowGenerator;
pub use holonomic::HolonomicGenerator;

/// Velocities reachable from `current` within `dt`, intersected with `[lo, hi]`
pub(crate) fn velocity_window(current: f64, acceleration: f64, dt: f64, lo: f64, hi: f64) -> (f64, f64) {
    let min = (current - acceleration * dt).max(lo);
    let max = (current + acceleration * dt).min(hi);
    if min > max {
        // Current velocity lies outside the limits; fall back to the nearest bound
        let v = current.clamp(lo, hi);
        return (v, v);
    }
    (min, max)
}

/// `n` evenly spaced values over `[min, max]`, both ends included
pub(crate) fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.5 * (min + max)],
        _ => (0..n)
            .map(|i| min + (max - min) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Push `cmd` unless an identical command is already present
pub(crate) fn push_unique(candidates: &mut Vec<VelocityCommand>, cmd: VelocityCommand) {
    if !candidates.contains(&cmd) {
        candidates.push(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_includes_ends() {
        let v = linspace(-1.0, 1.0, 5);
        assert_eq!(v, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.5]);
    }

    #[test]
    fn test_velocity_window_clipped_by_limits() {
        let (lo, hi) = velocity_window(0.45, 1.0, 0.2, 0.0, 0.5);
        assert!((lo - 0.25).abs() < 1e-12);
        assert_eq!(hi, 0.5);
    }

    #[test]
    fn test_velocity_window_outside_limits() {
        assert_eq!(velocity_window(2.0, 0.1, 0.1, 0.0, 0.5), (0.5, 0.5));
    }
}
