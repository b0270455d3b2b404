//! Short-horizon trajectory simulation
//!
//! A candidate command is held constant over the horizon, so the robot
//! follows a circular arc (or a straight line when the angular rate is zero).

use crate::common::{Pose2D, VelocityCommand};

const STRAIGHT_EPSILON: f64 = 1e-9;

/// Sampled poses of a constant-velocity motion
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub command: VelocityCommand,
    pub start: Pose2D,
    /// Poses at evenly spaced times in (0, horizon]
    pub poses: Vec<Pose2D>,
}

impl Trajectory {
    /// Final pose, or the start pose for an empty trajectory
    pub fn end(&self) -> Pose2D {
        self.poses.last().copied().unwrap_or(self.start)
    }
}

/// A trajectory generator for the robot
#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    horizon: f64,
    samples: usize,
}

impl TrajectoryGenerator {
    /// Create a new trajectory generator
    pub fn new(horizon: f64, samples: usize) -> Self {
        TrajectoryGenerator {
            horizon,
            samples: samples.max(1),
        }
    }

    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Simulate `command` from `start` over the horizon
    pub fn generate(&self, start: &Pose2D, command: &VelocityCommand) -> Trajectory {
        let poses = (1..=self.samples)
            .map(|k| {
                let t = self.horizon * k as f64 / self.samples as f64;
                Self::pose_at(start, command, t)
            })
            .collect();
        Trajectory {
            command: *command,
            start: *start,
            poses,
        }
    }

    /// Exact pose after holding `command` for `t` seconds
    pub fn pose_at(start: &Pose2D, command: &VelocityCommand, t: f64) -> Pose2D {
        let (vx, vy, w) = (command.linear_x, command.linear_y, command.angular);

        // Displacement in the start frame
        let (dx, dy) = if w.abs() < STRAIGHT_EPSILON {
            (vx * t, vy * t)
        } else {
            let (s, c) = (w * t).sin_cos();
            ((vx * s + vy * (c - 1.0)) / w, (vx * (1.0 - c) + vy * s) / w)
        };

        let (sin0, cos0) = start.heading.sin_cos();
        Pose2D::new(
            start.x + dx * cos0 - dy * sin0,
            start.y + dx * sin0 + dy * cos0,
            start.heading + w * t,
        )
    }
}
