//! Control module: kinematic limits, trajectory simulation and loop timing
pub mod limits;
pub mod timing;
pub mod trajectory;

pub use self::limits::KinematicLimits;
pub use self::timing::{OverrunMonitor, TimingEvent};
pub use self::trajectory::{Trajectory, TrajectoryGenerator};
