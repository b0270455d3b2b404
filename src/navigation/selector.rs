//! Command selection
//!
//! Only feasible candidates other than stop are ranked. Stop is chosen when
//! none of them is feasible, and that tick counts as blocked.

use crate::common::{Pose2D, VelocityCommand};
use crate::config::SelectionPolicy;
use crate::control::TrajectoryGenerator;
use crate::geometry::{Footprint, LocalObstacles};
use crate::navigation::evaluation::SafetyScore;
use crate::navigation::goal::Goal;
use crate::navigation::strategy::ReactiveStrategy;
use std::cmp::Ordering;

/// Absorbs rounding when a clearance sits exactly on a level boundary
const LEVEL_EPSILON: f64 = 1e-9;

/// One evaluated candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub index: usize,
    pub command: VelocityCommand,
    pub safety: SafetyScore,
    /// Goal progress; not computed for infeasible candidates
    pub progress: Option<f64>,
}

/// Outcome of one selection round
#[derive(Debug, Clone)]
pub struct Selection {
    pub chosen: usize,
    pub command: VelocityCommand,
    pub scored: Vec<ScoredCandidate>,
    /// No candidate other than stop was feasible
    pub blocked: bool,
}

/// Picks the best feasible candidate under a [`SelectionPolicy`]
#[derive(Debug, Clone)]
pub struct CommandSelector {
    policy: SelectionPolicy,
    clearance_saturation: f64,
}

impl CommandSelector {
    /// Create a new command selector
    pub fn new(policy: SelectionPolicy, clearance_saturation: f64) -> Self {
        CommandSelector {
            policy,
            clearance_saturation,
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Evaluate every candidate and choose one
    ///
    /// Candidates must start with the stop command.
    #[allow(clippy::too_many_arguments)]
    pub fn select(
        &self,
        strategy: &ReactiveStrategy,
        trajectories: &TrajectoryGenerator,
        robot: &Pose2D,
        candidates: &[VelocityCommand],
        footprint: &Footprint,
        obstacles: &LocalObstacles,
        goal: &Goal,
        max_travel: f64,
    ) -> Selection {
        let scored: Vec<ScoredCandidate> = candidates
            .iter()
            .enumerate()
            .map(|(index, command)| {
                let trajectory = trajectories.generate(robot, command);
                let mut safety = strategy.safety.evaluate(&trajectory, footprint, obstacles);
                if command.is_stop() {
                    // Holding still never reduces clearance
                    safety.feasible = true;
                }
                let progress = safety
                    .feasible
                    .then(|| strategy.progress.evaluate(&trajectory, goal, max_travel));
                ScoredCandidate {
                    index,
                    command: *command,
                    safety,
                    progress,
                }
            })
            .collect();

        let best = scored
            .iter()
            .filter(|c| c.safety.feasible && !c.command.is_stop())
            .fold(None::<&ScoredCandidate>, |best, c| match best {
                Some(b) if self.compare(c, b) != Ordering::Greater => Some(b),
                _ => Some(c),
            });

        match best {
            Some(c) => Selection {
                chosen: c.index,
                command: c.command,
                blocked: false,
                scored,
            },
            None => {
                let stop = scored.iter().position(|c| c.command.is_stop()).unwrap_or(0);
                Selection {
                    chosen: stop,
                    command: VelocityCommand::stop(),
                    blocked: true,
                    scored,
                }
            }
        }
    }

    /// `Greater` when `a` ranks above `b`; ties go to the lower index
    pub fn compare(&self, a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
        let pa = a.progress.unwrap_or(f64::NEG_INFINITY);
        let pb = b.progress.unwrap_or(f64::NEG_INFINITY);
        let primary = match self.policy {
            SelectionPolicy::Lexicographic { clearance_resolution } => {
                let level = |s: &SafetyScore| {
                    (s.score * self.clearance_saturation / clearance_resolution + LEVEL_EPSILON).floor()
                };
                level(&a.safety)
                    .total_cmp(&level(&b.safety))
                    .then(pa.total_cmp(&pb))
            }
            SelectionPolicy::Weighted { clearance_weight } => {
                let va = clearance_weight * a.safety.score + pa;
                let vb = clearance_weight * b.safety.score + pb;
                va.total_cmp(&vb)
            }
        };
        primary.then(b.index.cmp(&a.index))
    }
}
