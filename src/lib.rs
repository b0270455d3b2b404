//! Reactive local navigation for mobile robots
//!
//! Each control period the navigator resolves the robot pose and nearby
//! obstacles into one reference frame, samples reachable velocity commands,
//! rejects the ones whose short-horizon trajectory would bring the footprint
//! too close to an obstacle, and sends the feasible command that makes the
//! most progress toward the goal.
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod geometry;
pub mod lifecycle;
pub mod navigation;
pub mod node;
pub mod perception;
pub mod sim;

pub use crate::common::{Pose2D, Stamp, VelocityCommand};
pub use crate::config::{NavigationParams, NodeConfig};
pub use crate::error::{NavError, Result};
pub use crate::navigation::{Goal, GoalRequest, NavState, ReactiveNavigator, TickInputs, TickKind, TickOutcome};
pub use crate::node::{NavClock, NavStatus, NavigationNode, NodeHandles};
