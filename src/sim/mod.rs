//! Kinematic simulation of the robot base
//!
//! Stands in for odometry, localization and the obstacle sensor when the
//! navigator runs without hardware.

use crate::common::{Pose2D, Stamp, VelocityCommand};
use crate::control::TrajectoryGenerator;
use crate::perception::{ObstacleSet, TransformBuffer};
use nalgebra::Point2;

/// A simulated robot that executes velocity commands exactly
#[derive(Debug, Clone)]
pub struct KinematicSimulator {
    pose: Pose2D,
    velocity: VelocityCommand,
    /// Obstacle points in the world (reference) frame
    world: Vec<Point2<f64>>,
    sensor_range: f64,
}

impl KinematicSimulator {
    /// Create a new simulator with the robot at `pose`
    pub fn new(pose: Pose2D) -> Self {
        KinematicSimulator {
            pose,
            velocity: VelocityCommand::stop(),
            world: Vec::new(),
            sensor_range: f64::INFINITY,
        }
    }

    pub fn with_obstacles(mut self, world: Vec<Point2<f64>>) -> Self {
        self.world = world;
        self
    }

    /// Replace the world obstacles
    pub fn set_obstacles(&mut self, world: Vec<Point2<f64>>) {
        self.world = world;
    }

    pub fn with_sensor_range(mut self, range: f64) -> Self {
        self.sensor_range = range;
        self
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    pub fn velocity(&self) -> VelocityCommand {
        self.velocity
    }

    /// Hold `command` for `dt` seconds
    pub fn step(&mut self, command: &VelocityCommand, dt: f64) {
        self.pose = TrajectoryGenerator::pose_at(&self.pose, command, dt);
        self.velocity = *command;
    }

    /// Publish the robot pose as `reference -> robot` at `stamp`
    pub fn publish_pose(&self, buffer: &mut TransformBuffer, reference: &str, robot: &str, stamp: Stamp) {
        buffer.set_transform(reference, robot, self.pose.to_isometry(), stamp);
    }

    /// Obstacles within sensor range, expressed in the robot frame
    pub fn scan(&self, robot_frame: &str, stamp: Stamp) -> ObstacleSet {
        let iso = self.pose.to_isometry();
        let points = self
            .world
            .iter()
            .map(|p| iso.inverse_transform_point(p))
            .filter(|p| p.coords.norm() <= self.sensor_range)
            .collect();
        ObstacleSet::new(robot_frame, stamp, points)
    }
}
