//! Common utilities and types for the Prometheus reactive navigator

pub mod types;

pub use types::{normalize_angle, Pose2D, Stamp, VelocityCommand};
