//! Dynamic window candidate generator
//!
//! Samples (v, ω) pairs inside the window of velocities reachable from the
//! current velocity within one control period under the acceleration limits.

use super::{linspace, push_unique, velocity_window, CandidateGenerator};
use crate::common::VelocityCommand;
use crate::config::CandidateParams;
use crate::control::KinematicLimits;

/// Dynamic window generator for differential-drive robots
#[derive(Debug, Clone)]
pub struct DynamicWindowGenerator {
    linear_samples: usize,
    angular_samples: usize,
}

impl CandidateGenerator for DynamicWindowGenerator {
    fn from_params(params: &CandidateParams) -> Self {
        DynamicWindowGenerator {
            linear_samples: params.linear_samples.max(1),
            angular_samples: params.angular_samples.max(1),
        }
    }

    fn generate(&self, current: &VelocityCommand, limits: &KinematicLimits, period: f64) -> Vec<VelocityCommand> {
        let ((v_min, v_max), (w_min, w_max)) = self.compute_dynamic_window(current, limits, period);

        let mut candidates = Vec::with_capacity(1 + self.linear_samples * self.angular_samples);
        candidates.push(VelocityCommand::stop());
        for v in linspace(v_min, v_max, self.linear_samples) {
            for w in linspace(w_min, w_max, self.angular_samples) {
                push_unique(&mut candidates, VelocityCommand::new(v, 0.0, w));
            }
        }
        candidates
    }

    fn name(&self) -> &str {
        "DynamicWindow"
    }

    fn configure(&mut self, params: &CandidateParams) {
        self.linear_samples = params.linear_samples.max(1);
        self.angular_samples = params.angular_samples.max(1);
    }
}

impl DynamicWindowGenerator {
    /// Reachable (linear, angular) velocity ranges
    fn compute_dynamic_window(
        &self,
        current: &VelocityCommand,
        limits: &KinematicLimits,
        period: f64,
    ) -> ((f64, f64), (f64, f64)) {
        let v = velocity_window(
            current.linear_x,
            limits.linear_acceleration,
            period,
            limits.min_linear_x,
            limits.max_linear_x,
        );
        let w = velocity_window(
            current.angular,
            limits.angular_acceleration,
            period,
            -limits.max_angular,
            limits.max_angular,
        );
        (v, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(linear: usize, angular: usize) -> DynamicWindowGenerator {
        DynamicWindowGenerator::from_params(&CandidateParams {
            linear_samples: linear,
            angular_samples: angular,
            ..Default::default()
        })
    }

    #[test]
    fn test_stop_is_first() {
        let candidates = generator(3, 3).generate(&VelocityCommand::new(0.3, 0.0, 0.0), &KinematicLimits::default(), 0.2);
        assert!(candidates[0].is_stop());
    }

    #[test]
    fn test_window_respects_acceleration() {
        let limits = KinematicLimits::default();
        let current = VelocityCommand::new(0.2, 0.0, 0.0);
        let candidates = generator(5, 5).generate(&current, &limits, 0.1);
        for c in &candidates[1..] {
            assert!((c.linear_x - current.linear_x).abs() <= limits.linear_acceleration * 0.1 + 1e-9);
            assert!(c.angular.abs() <= limits.angular_acceleration * 0.1 + 1e-9);
            assert_eq!(c.linear_y, 0.0);
        }
    }

    #[test]
    fn test_samples_within_limits() {
        let limits = KinematicLimits::default();
        let candidates = generator(7, 9).generate(&VelocityCommand::new(0.5, 0.0, 1.0), &limits, 1.0);
        for c in &candidates {
            assert!(c.linear_x >= limits.min_linear_x && c.linear_x <= limits.max_linear_x);
            assert!(c.angular.abs() <= limits.max_angular);
        }
    }

    #[test]
    fn test_duplicates_removed() {
        // From rest the window starts at zero, so (0, 0) is sampled and collapses into stop
        let candidates = generator(3, 3).generate(&VelocityCommand::stop(), &KinematicLimits::default(), 0.2);
        let stops = candidates.iter().filter(|c| c.is_stop()).count();
        assert_eq!(stops, 1);
        assert_eq!(candidates.len(), 9);
    }

    #[test]
    fn test_odd_angular_samples_include_straight() {
        let candidates = generator(3, 5).generate(&VelocityCommand::new(0.3, 0.0, 0.0), &KinematicLimits::default(), 0.2);
        assert!(candidates.iter().any(|c| c.linear_x > 0.0 && c.angular == 0.0));
    }
}
