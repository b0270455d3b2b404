//! Clearance check along a simulated trajectory

use super::{SafetyEvaluator, SafetyScore};
use crate::config::SafetyParams;
use crate::control::Trajectory;
use crate::geometry::{Footprint, LocalObstacles};

/// Marks a trajectory infeasible if any sampled pose comes closer than the margin
#[derive(Debug, Clone)]
pub struct TrajectoryClearanceEvaluator {
    safety_margin: f64,
    saturation: f64,
}

impl TrajectoryClearanceEvaluator {
    /// Create a new clearance evaluator
    pub fn new(safety_margin: f64, saturation: f64) -> Self {
        TrajectoryClearanceEvaluator {
            safety_margin,
            saturation,
        }
    }

    pub fn from_params(params: &SafetyParams) -> Self {
        Self::new(params.safety_margin, params.clearance_saturation)
    }

    /// Map a raw clearance onto [0, 1], saturating `saturation` metres past the margin
    pub fn normalize(&self, clearance: f64) -> f64 {
        if self.saturation <= 0.0 {
            return if clearance >= self.safety_margin { 1.0 } else { 0.0 };
        }
        ((clearance - self.safety_margin).clamp(0.0, self.saturation)) / self.saturation
    }
}

impl SafetyEvaluator for TrajectoryClearanceEvaluator {
    fn evaluate(&self, trajectory: &Trajectory, footprint: &Footprint, obstacles: &LocalObstacles) -> SafetyScore {
        let mut min_clearance = f64::INFINITY;
        for pose in &trajectory.poses {
            let clearance = obstacles.clearance(footprint, &pose.to_isometry());
            min_clearance = min_clearance.min(clearance);
            if min_clearance < self.safety_margin {
                break;
            }
        }

        SafetyScore {
            feasible: min_clearance >= self.safety_margin,
            min_clearance,
            score: self.normalize(min_clearance),
        }
    }

    fn safety_margin(&self) -> f64 {
        self.safety_margin
    }

    fn name(&self) -> &str {
        "TrajectoryClearance"
    }
}
