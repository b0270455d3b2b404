//! Candidate evaluation: clearance safety and goal progress

use crate::control::Trajectory;
use crate::geometry::{Footprint, LocalObstacles};
use crate::navigation::goal::Goal;
use std::fmt::Debug;

pub mod clearance;
pub mod progress;

pub use clearance::TrajectoryClearanceEvaluator;
pub use progress::HeadingProgressEvaluator;

/// Safety verdict for one candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyScore {
    pub feasible: bool,
    /// Smallest clearance along the trajectory; infinite without obstacles
    pub min_clearance: f64,
    /// Normalized clearance in [0, 1]
    pub score: f64,
}

/// Trait for trajectory safety checks
pub trait SafetyEvaluator: Debug + Send + Sync {
    /// Clearance of `footprint` along `trajectory` against `obstacles`
    fn evaluate(&self, trajectory: &Trajectory, footprint: &Footprint, obstacles: &LocalObstacles) -> SafetyScore;

    /// Minimum acceptable clearance (m)
    fn safety_margin(&self) -> f64;

    /// Get the name of this evaluator
    fn name(&self) -> &str;
}

/// Trait for goal progress scoring
pub trait GoalEvaluator: Debug + Send + Sync {
    /// Progress of `trajectory` toward `goal`; higher is better
    ///
    /// `max_travel` is the longest distance any candidate can cover over the horizon.
    fn evaluate(&self, trajectory: &Trajectory, goal: &Goal, max_travel: f64) -> f64;

    /// Get the name of this evaluator
    fn name(&self) -> &str;
}
