//! Holonomic candidate generator
//!
//! Samples forward, lateral and angular velocity independently, each inside
//! its own reachable window.

use super::{linspace, push_unique, velocity_window, CandidateGenerator};
use crate::common::VelocityCommand;
use crate::config::CandidateParams;
use crate::control::KinematicLimits;

/// Velocity-grid generator for robots that can move sideways
#[derive(Debug, Clone)]
pub struct HolonomicGenerator {
    linear_samples: usize,
    lateral_samples: usize,
    angular_samples: usize,
}

impl CandidateGenerator for HolonomicGenerator {
    fn from_params(params: &CandidateParams) -> Self {
        HolonomicGenerator {
            linear_samples: params.linear_samples.max(1),
            lateral_samples: params.lateral_samples.max(1),
            angular_samples: params.angular_samples.max(1),
        }
    }

    fn generate(&self, current: &VelocityCommand, limits: &KinematicLimits, period: f64) -> Vec<VelocityCommand> {
        let (vx_min, vx_max) = velocity_window(
            current.linear_x,
            limits.linear_acceleration,
            period,
            limits.min_linear_x,
            limits.max_linear_x,
        );
        let (vy_min, vy_max) = velocity_window(
            current.linear_y,
            limits.linear_acceleration,
            period,
            -limits.max_linear_y,
            limits.max_linear_y,
        );
        let (w_min, w_max) = velocity_window(
            current.angular,
            limits.angular_acceleration,
            period,
            -limits.max_angular,
            limits.max_angular,
        );

        let vxs = linspace(vx_min, vx_max, self.linear_samples);
        let vys = linspace(vy_min, vy_max, self.lateral_samples);
        let ws = linspace(w_min, w_max, self.angular_samples);

        let mut candidates = Vec::with_capacity(1 + vxs.len() * vys.len() * ws.len());
        candidates.push(VelocityCommand::stop());
        for &vx in &vxs {
            for &vy in &vys {
                for &w in &ws {
                    push_unique(&mut candidates, VelocityCommand::new(vx, vy, w));
                }
            }
        }
        candidates
    }

    fn name(&self) -> &str {
        "Holonomic"
    }

    fn configure(&mut self, params: &CandidateParams) {
        self.linear_samples = params.linear_samples.max(1);
        self.lateral_samples = params.lateral_samples.max(1);
        self.angular_samples = params.angular_samples.max(1);
    }
}
