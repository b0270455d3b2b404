//! Navigation goals and waypoint sequences

use crate::common::Pose2D;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::PI;

/// A target pose with its acceptance tolerances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub frame_id: String,
    pub pose: Pose2D,
    /// Position tolerance (m, inclusive)
    pub acceptance_radius: f64,
    /// Heading tolerance (rad, inclusive); π or more ignores heading
    pub heading_tolerance: f64,
}

impl Goal {
    /// Create a new goal
    pub fn new(frame_id: &str, pose: Pose2D, acceptance_radius: f64, heading_tolerance: f64) -> Self {
        Goal {
            frame_id: frame_id.to_string(),
            pose,
            acceptance_radius,
            heading_tolerance,
        }
    }

    pub fn ignores_heading(&self) -> bool {
        self.heading_tolerance >= PI
    }

    /// Whether `pose` satisfies both tolerances
    pub fn is_reached_by(&self, pose: &Pose2D) -> bool {
        if !(pose.distance_to(&self.pose) <= self.acceptance_radius) {
            return false;
        }
        self.ignores_heading() || pose.heading_error(&self.pose) <= self.heading_tolerance
    }
}

/// One entry of a waypoint sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    /// Distance at which the waypoint counts as reached (m)
    pub allowed_distance: f64,
    /// Required heading at the waypoint, if any
    pub target_heading: Option<f64>,
    /// Whether the robot may move on once a later waypoint is already reached
    pub allow_skip: bool,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, allowed_distance: f64) -> Self {
        Waypoint {
            x,
            y,
            allowed_distance,
            target_heading: None,
            allow_skip: false,
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.target_heading = Some(heading);
        self
    }

    pub fn skippable(mut self) -> Self {
        self.allow_skip = true;
        self
    }

    /// The goal this waypoint stands for
    pub fn to_goal(&self, frame_id: &str, heading_tolerance: f64) -> Goal {
        match self.target_heading {
            Some(heading) => Goal::new(
                frame_id,
                Pose2D::new(self.x, self.y, heading),
                self.allowed_distance,
                heading_tolerance,
            ),
            None => Goal::new(frame_id, Pose2D::new(self.x, self.y, 0.0), self.allowed_distance, PI),
        }
    }
}

/// Ordered waypoints in a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointSequence {
    pub frame_id: String,
    pub waypoints: Vec<Waypoint>,
}

/// External request to the navigator, applied at the start of the next tick
#[derive(Debug, Clone, PartialEq)]
pub enum GoalRequest {
    Set(Goal),
    Waypoints(WaypointSequence),
    Cancel,
}

/// Result of checking the robot pose against the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueProgress {
    /// The active goal still lies ahead
    Pending,
    /// This many goals were reached or skipped; more remain
    Advanced(usize),
    /// The last goal was reached
    Finished,
}

#[derive(Debug, Clone)]
struct QueuedGoal {
    goal: Goal,
    allow_skip: bool,
}

/// Goals still to be reached, front first
#[derive(Debug, Clone, Default)]
pub struct GoalQueue {
    goals: VecDeque<QueuedGoal>,
}

impl GoalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with an ordered sequence of `(goal, allow_skip)`
    pub fn set_sequence(&mut self, goals: Vec<(Goal, bool)>) {
        self.goals = goals
            .into_iter()
            .map(|(goal, allow_skip)| QueuedGoal { goal, allow_skip })
            .collect();
    }

    pub fn clear(&mut self) {
        self.goals.clear();
    }

    pub fn active(&self) -> Option<&Goal> {
        self.goals.front().map(|q| &q.goal)
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Drop every goal `pose` has reached, plus skippable goals in front of a reached one
    pub fn advance(&mut self, pose: &Pose2D) -> QueueProgress {
        if self.goals.is_empty() {
            return QueueProgress::Pending;
        }

        let mut advanced = 0;
        loop {
            let Some(front) = self.goals.front() else { break };
            if front.goal.is_reached_by(pose) {
                self.goals.pop_front();
                advanced += 1;
                continue;
            }

            // A run of skippable goals may be jumped if the goal after it is reached
            let mut jump = None;
            for j in 1..self.goals.len() {
                if !self.goals[j - 1].allow_skip {
                    break;
                }
                if self.goals[j].goal.is_reached_by(pose) {
                    jump = Some(j);
                    break;
                }
            }
            match jump {
                Some(j) => {
                    self.goals.drain(..=j);
                    advanced += j + 1;
                }
                None => break,
            }
        }

        match (advanced, self.goals.is_empty()) {
            (0, _) => QueueProgress::Pending,
            (_, true) => QueueProgress::Finished,
            (n, false) => QueueProgress::Advanced(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(x: f64, y: f64) -> Goal {
        Goal::new("map", Pose2D::new(x, y, 0.0), 0.2, PI)
    }

    #[test]
    fn test_acceptance_is_inclusive() {
        let g = Goal::new("map", Pose2D::new(1.0, 0.0, 0.0), 0.5, 0.25);
        assert!(g.is_reached_by(&Pose2D::new(0.5, 0.0, 0.0)));
        assert!(g.is_reached_by(&Pose2D::new(1.0, 0.0, 0.25)));
        assert!(!g.is_reached_by(&Pose2D::new(1.0, 0.0, 0.3)));
        assert!(!g.is_reached_by(&Pose2D::new(0.49, 0.0, 0.0)));
    }

    #[test]
    fn test_non_finite_pose_never_reaches() {
        let g = Goal::new("map", Pose2D::new(5.0, 0.0, 0.0), 0.5, PI);
        assert!(!g.is_reached_by(&Pose2D::new(f64::NAN, 0.0, 0.0)));
        assert!(!g.is_reached_by(&Pose2D::new(f64::INFINITY, 0.0, 0.0)));
    }

    #[test]
    fn test_heading_ignored_at_pi() {
        let g = Goal::new("map", Pose2D::new(0.0, 0.0, 0.0), 0.1, PI);
        assert!(g.is_reached_by(&Pose2D::new(0.0, 0.0, PI)));
    }

    #[test]
    fn test_waypoint_to_goal() {
        let wp = Waypoint::new(1.0, 2.0, 0.3).with_heading(0.5);
        let g = wp.to_goal("odom", 0.1);
        assert_eq!(g.frame_id, "odom");
        assert_eq!(g.heading_tolerance, 0.1);
        assert!(Waypoint::new(1.0, 2.0, 0.3).to_goal("odom", 0.1).ignores_heading());
    }

    #[test]
    fn test_queue_advances_in_order() {
        let mut queue = GoalQueue::new();
        queue.set_sequence(vec![(goal(1.0, 0.0), false), (goal(2.0, 0.0), false)]);

        // Second goal reached first does not count: the first is not skippable
        assert_eq!(queue.advance(&Pose2D::new(2.0, 0.0, 0.0)), QueueProgress::Pending);
        assert_eq!(queue.advance(&Pose2D::new(1.0, 0.0, 0.0)), QueueProgress::Advanced(1));
        assert_eq!(queue.active().unwrap().pose.x, 2.0);
        assert_eq!(queue.advance(&Pose2D::new(2.1, 0.0, 0.0)), QueueProgress::Finished);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_skips_skippable_goals() {
        let mut queue = GoalQueue::new();
        queue.set_sequence(vec![
            (goal(1.0, 1.0), true),
            (goal(2.0, 0.0), false),
            (goal(3.0, 0.0), false),
        ]);
        assert_eq!(queue.advance(&Pose2D::new(2.0, 0.0, 0.0)), QueueProgress::Advanced(2));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_empty_queue_is_pending() {
        let mut queue = GoalQueue::new();
        assert_eq!(queue.advance(&Pose2D::default()), QueueProgress::Pending);
    }
}
