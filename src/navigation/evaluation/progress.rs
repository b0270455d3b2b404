//! Goal progress scoring
//!
//! Progress combines how much closer the trajectory end gets to the goal
//! (normalized by the longest possible travel) with how well the end heading
//! points at the goal. Inside the acceptance radius the heading term uses the
//! goal heading instead, unless the goal ignores heading.

use super::GoalEvaluator;
use crate::common::normalize_angle;
use crate::config::ScoringParams;
use crate::control::Trajectory;
use crate::navigation::goal::Goal;
use std::f64::consts::PI;

const MIN_TRAVEL: f64 = 1e-6;

/// Distance reduction plus heading alignment
#[derive(Debug, Clone)]
pub struct HeadingProgressEvaluator {
    distance_weight: f64,
    heading_weight: f64,
}

impl HeadingProgressEvaluator {
    /// Create a new progress evaluator
    pub fn new(distance_weight: f64, heading_weight: f64) -> Self {
        HeadingProgressEvaluator {
            distance_weight,
            heading_weight,
        }
    }

    pub fn from_params(params: &ScoringParams) -> Self {
        Self::new(params.distance_weight, params.heading_weight)
    }

    /// 1 when aligned with `desired`, 0 when facing away
    fn heading_term(desired: f64, actual: f64) -> f64 {
        1.0 - normalize_angle(desired - actual).abs() / PI
    }
}

impl GoalEvaluator for HeadingProgressEvaluator {
    fn evaluate(&self, trajectory: &Trajectory, goal: &Goal, max_travel: f64) -> f64 {
        let end = trajectory.end();
        let d_start = trajectory.start.distance_to(&goal.pose);
        let d_end = end.distance_to(&goal.pose);
        let distance_term = (d_start - d_end) / max_travel.max(MIN_TRAVEL);

        let desired = if d_end <= goal.acceptance_radius && !goal.ignores_heading() {
            goal.pose.heading
        } else if d_end > f64::EPSILON {
            end.bearing_to(&goal.pose)
        } else {
            end.heading
        };
        let heading_term = Self::heading_term(desired, end.heading);

        self.distance_weight * distance_term + self.heading_weight * heading_term
    }

    fn name(&self) -> &str {
        "HeadingProgress"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Pose2D, VelocityCommand};
    use crate::control::TrajectoryGenerator;

    fn evaluate(cmd: VelocityCommand, goal: &Goal) -> f64 {
        let traj = TrajectoryGenerator::new(1.0, 5).generate(&Pose2D::default(), &cmd);
        HeadingProgressEvaluator::new(1.0, 0.5).evaluate(&traj, goal, 0.5)
    }

    #[test]
    fn test_forward_beats_turning_away() {
        let goal = Goal::new("map", Pose2D::new(3.0, 0.0, 0.0), 0.2, PI);
        let straight = evaluate(VelocityCommand::new(0.5, 0.0, 0.0), &goal);
        let turning = evaluate(VelocityCommand::new(0.5, 0.0, 1.0), &goal);
        let stop = evaluate(VelocityCommand::stop(), &goal);
        assert!(straight > turning);
        assert!(straight > stop);
        // Full travel straight at the goal: distance term 1, heading term 1
        assert!((straight - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_moving_away_is_negative_progress() {
        let goal = Goal::new("map", Pose2D::new(-3.0, 0.0, 0.0), 0.2, PI);
        let forward = evaluate(VelocityCommand::new(0.5, 0.0, 0.0), &goal);
        assert!(forward < 0.0);
    }

    #[test]
    fn test_goal_heading_used_inside_radius() {
        // Robot already on the goal position: only rotating toward the goal heading helps
        let goal = Goal::new("map", Pose2D::new(0.0, 0.0, 1.0), 0.3, 0.1);
        let rotate = evaluate(VelocityCommand::new(0.0, 0.0, 1.0), &goal);
        let hold = evaluate(VelocityCommand::stop(), &goal);
        assert!(rotate > hold);
    }
}
