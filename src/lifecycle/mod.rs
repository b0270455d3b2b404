//! Lifecycle management for navigation components
//!
//! A component is configured once, then toggled between inactive and active.
//! Only an active navigator ever sends a motion command.

use crate::error::{NavError, Result};
use std::fmt;

/// Trait for components that follow a lifecycle pattern
pub trait LifecycleNode: Send + Sync {
    /// Validate everything the node will run with
    fn on_configure(&mut self) -> Result<()>;

    /// Start acting on inputs
    fn on_activate(&mut self) -> Result<()>;

    /// Stop acting on inputs; drops any goal in progress
    fn on_deactivate(&mut self) -> Result<()>;

    /// Release what configuration acquired
    fn on_cleanup(&mut self) -> Result<()>;
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unconfigured,
    Inactive,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unconfigured => "unconfigured",
            LifecycleState::Inactive => "inactive",
            LifecycleState::Active => "active",
        };
        f.write_str(name)
    }
}

/// Lifecycle bookkeeping shared by navigation components
#[derive(Debug, Clone)]
pub struct LifecycleNodeBase {
    pub name: String,
    state: LifecycleState,
}

impl LifecycleNodeBase {
    /// Create a new, unconfigured lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: LifecycleState::Unconfigured,
        }
    }

    pub fn get_state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    /// Whether `to` may follow the current state
    pub fn can_transition(&self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self.state, to),
            (Unconfigured, Inactive) | (Inactive, Active) | (Active, Inactive) | (Inactive, Unconfigured)
        )
    }

    /// Move to `to`, refusing edges the lifecycle does not have
    pub fn transition(&mut self, to: LifecycleState) -> Result<()> {
        if !self.can_transition(to) {
            return Err(NavError::Config(format!(
                "{}: cannot go from {} to {}",
                self.name, self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_full_cycle() {
        let mut base = LifecycleNodeBase::new("nav");
        base.transition(LifecycleState::Inactive).unwrap();
        base.transition(LifecycleState::Active).unwrap();
        assert!(base.is_active());
        base.transition(LifecycleState::Inactive).unwrap();
        base.transition(LifecycleState::Unconfigured).unwrap();
        assert_eq!(base.get_state(), LifecycleState::Unconfigured);
    }

    #[rstest]
    #[case::activate_unconfigured(LifecycleState::Unconfigured, LifecycleState::Active)]
    #[case::cleanup_active(LifecycleState::Active, LifecycleState::Unconfigured)]
    #[case::reactivate(LifecycleState::Active, LifecycleState::Active)]
    fn test_refused_edges(#[case] from: LifecycleState, #[case] to: LifecycleState) {
        let mut base = LifecycleNodeBase::new("nav");
        base.state = from;
        let err = base.transition(to).unwrap_err();
        assert!(err.to_string().contains("cannot go from"));
        assert_eq!(base.get_state(), from);
    }
}
