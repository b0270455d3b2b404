//! Reactive navigation
//!
//! [`ReactiveNavigator`] owns everything the control loop needs: the
//! configuration, the footprint, the strategy, the goal queue and the state
//! machine. Each call to [`ReactiveNavigator::tick`] runs one complete
//! sense-evaluate-act cycle on a consistent snapshot of the inputs. Goal
//! requests are queued and applied at the start of the next tick, so a tick
//! never sees a goal change halfway through.
pub mod candidates;
pub mod evaluation;
pub mod goal;
pub mod log_sink;
pub mod selector;
pub mod state;
pub mod strategy;

pub use self::goal::{Goal, GoalQueue, GoalRequest, QueueProgress, Waypoint, WaypointSequence};
pub use self::log_sink::{CandidateRecord, JsonLinesSink, MemorySink, NavLogger, TickLogSink, TickRecord};
pub use self::selector::{CommandSelector, ScoredCandidate, Selection};
pub use self::state::{NavState, StateMachine, Transition, TransitionCause};
pub use self::strategy::ReactiveStrategy;

use crate::common::{Pose2D, Stamp, VelocityCommand};
use crate::config::{NavigationParams, NodeConfig, SkippedTickPolicy};
use crate::control::TrajectoryGenerator;
use crate::error::{NavError, Result};
use crate::geometry::{Footprint, FootprintUpdate, LocalObstacles};
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, LifecycleState};
use crate::perception::{FrameResolver, ObstacleSet, ResolvedFrame, TransformBuffer};
use nalgebra::Point2;
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

/// Inputs sampled once at the start of a tick
#[derive(Debug, Clone, Copy)]
pub struct TickInputs<'a> {
    pub now: Stamp,
    pub transforms: &'a TransformBuffer,
    pub obstacles: Option<&'a ObstacleSet>,
    /// Measured base velocity, when a fresh one is available
    pub measured_velocity: Option<VelocityCommand>,
}

/// How a tick ended
#[derive(Debug, Clone, PartialEq)]
pub enum TickKind {
    /// Candidates were evaluated (or the goal was found reached)
    Executed,
    /// Inputs could not be resolved; nothing was evaluated
    Skipped { reason: NavError },
    /// No goal is being pursued; the robot is held still
    Halted,
}

impl TickKind {
    pub fn label(&self) -> &'static str {
        match self {
            TickKind::Executed => "executed",
            TickKind::Skipped { .. } => "skipped",
            TickKind::Halted => "halted",
        }
    }
}

/// Result of one control tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub tick: u64,
    pub kind: TickKind,
    /// Command to send; `None` is an explicit no-op
    pub command: Option<VelocityCommand>,
    /// State after the tick
    pub state: NavState,
    /// State changes during the tick, in order
    pub transitions: Vec<Transition>,
    pub robot_pose: Option<Pose2D>,
    pub selection: Option<Selection>,
}

struct TickReport<'a> {
    kind: TickKind,
    command: Option<VelocityCommand>,
    robot_pose: Option<Pose2D>,
    obstacles: &'a [Point2<f64>],
    selection: Option<Selection>,
}

impl TickReport<'_> {
    fn halted() -> Self {
        TickReport {
            kind: TickKind::Halted,
            command: Some(VelocityCommand::stop()),
            robot_pose: None,
            obstacles: &[],
            selection: None,
        }
    }
}

/// Reactive local navigator
pub struct ReactiveNavigator {
    base: LifecycleNodeBase,
    node: NodeConfig,
    params: NavigationParams,
    resolver: FrameResolver,
    strategy: ReactiveStrategy,
    /// Installed through `with_strategy`; survives reconfiguration
    custom_strategy: bool,
    selector: CommandSelector,
    trajectories: TrajectoryGenerator,
    footprint: Option<Footprint>,
    machine: StateMachine,
    goals: GoalQueue,
    pending: VecDeque<GoalRequest>,
    /// Transitions made outside a tick, reported with the next one
    deferred: Vec<Transition>,
    consecutive_blocked: u32,
    consecutive_input_failures: u32,
    last_command: VelocityCommand,
    ticks: u64,
    logger: Option<NavLogger>,
}

impl ReactiveNavigator {
    /// Create a new navigator; call `on_configure` before use
    pub fn new(node: NodeConfig, params: NavigationParams) -> Self {
        let (resolver, strategy, selector, trajectories) = Self::build_parts(&node, &params);
        ReactiveNavigator {
            base: LifecycleNodeBase::new("reactive_navigator"),
            node,
            params,
            resolver,
            strategy,
            custom_strategy: false,
            selector,
            trajectories,
            footprint: None,
            machine: StateMachine::new(),
            goals: GoalQueue::new(),
            pending: VecDeque::new(),
            deferred: Vec::new(),
            consecutive_blocked: 0,
            consecutive_input_failures: 0,
            last_command: VelocityCommand::stop(),
            ticks: 0,
            logger: None,
        }
    }

    /// Create, configure and activate a navigator
    pub fn activated(node: NodeConfig, params: NavigationParams) -> Result<Self> {
        let mut navigator = Self::new(node, params);
        navigator.on_configure()?;
        navigator.on_activate()?;
        Ok(navigator)
    }

    fn build_parts(
        node: &NodeConfig,
        params: &NavigationParams,
    ) -> (FrameResolver, ReactiveStrategy, CommandSelector, TrajectoryGenerator) {
        let t = &params.thresholds;
        let resolver = FrameResolver::new(
            &node.reference_frame,
            &node.robot_frame,
            t.transform_lookup_window,
            t.max_obstacle_age,
        )
        .with_max_sensor_range(t.max_sensor_range);
        let horizon = node.control_period * f64::from(params.safety.horizon_ticks);
        (
            resolver,
            ReactiveStrategy::from_params(params),
            CommandSelector::new(params.scoring.policy, params.safety.clearance_saturation),
            TrajectoryGenerator::new(horizon, params.safety.trajectory_samples),
        )
    }

    /// Swap in a different strategy
    pub fn with_strategy(mut self, strategy: ReactiveStrategy) -> Self {
        self.strategy = strategy;
        self.custom_strategy = true;
        self
    }

    /// Record every tick into `sink`
    pub fn enable_logging(&mut self, sink: Box<dyn TickLogSink>) {
        info!("Navigation log enabled ({})", sink.name());
        self.logger = Some(NavLogger::new(sink, self.params.log_sink.failure_policy));
    }

    pub fn state(&self) -> NavState {
        self.machine.state()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.base.get_state()
    }

    pub fn params(&self) -> &NavigationParams {
        &self.params
    }

    pub fn node_config(&self) -> &NodeConfig {
        &self.node
    }

    pub fn footprint(&self) -> Option<&Footprint> {
        self.footprint.as_ref()
    }

    pub fn active_goal(&self) -> Option<&Goal> {
        self.goals.active()
    }

    pub fn remaining_goals(&self) -> usize {
        self.goals.len()
    }

    pub fn consecutive_blocked(&self) -> u32 {
        self.consecutive_blocked
    }

    pub fn consecutive_input_failures(&self) -> u32 {
        self.consecutive_input_failures
    }

    pub fn last_command(&self) -> VelocityCommand {
        self.last_command
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn is_logging(&self) -> bool {
        self.logger.as_ref().is_some_and(|l| l.is_enabled())
    }

    /// A goal in the reference frame with the default tolerances
    pub fn make_goal(&self, x: f64, y: f64, heading: f64) -> Goal {
        Goal::new(
            self.resolver.reference_frame(),
            Pose2D::new(x, y, heading),
            self.params.goal.acceptance_radius,
            self.params.goal.heading_tolerance,
        )
    }

    /// Queue a request for the next tick
    pub fn request(&mut self, request: GoalRequest) {
        debug!("Queued goal request {:?}", request);
        self.pending.push_back(request);
    }

    pub fn set_goal(&mut self, goal: Goal) {
        self.request(GoalRequest::Set(goal));
    }

    pub fn set_waypoints(&mut self, sequence: WaypointSequence) {
        self.request(GoalRequest::Waypoints(sequence));
    }

    pub fn cancel(&mut self) {
        self.request(GoalRequest::Cancel);
    }

    /// Replace the footprint; a malformed one puts the navigator in ERROR
    pub fn update_footprint(&mut self, update: &FootprintUpdate) -> Result<()> {
        match update.build() {
            Ok(footprint) => {
                info!("Robot footprint updated (bounding radius {:.3} m)", footprint.bounding_radius());
                self.footprint = Some(footprint);
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Apply new parameters; the only way out of ERROR
    pub fn reconfigure(&mut self, params: NavigationParams) -> Result<()> {
        let footprint = match params.validate().and_then(|_| params.robot.footprint()) {
            Ok(footprint) => footprint,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let (resolver, strategy, selector, trajectories) = Self::build_parts(&self.node, &params);
        self.resolver = resolver;
        if self.custom_strategy {
            self.strategy.generator.configure(&params.candidates);
        } else {
            self.strategy = strategy;
        }
        self.selector = selector;
        self.trajectories = trajectories;
        if footprint.is_some() {
            self.footprint = footprint;
        }
        if let Some(logger) = self.logger.take() {
            self.logger = Some(logger.with_policy(params.log_sink.failure_policy));
        }
        self.params = params;
        self.consecutive_blocked = 0;
        self.consecutive_input_failures = 0;

        if self.machine.state() == NavState::Error {
            self.deferred
                .extend(self.machine.transition(NavState::Idle, TransitionCause::Reconfigured));
        }
        info!("Navigator reconfigured ({})", self.strategy.describe());
        Ok(())
    }

    fn fail(&mut self, reason: &NavError) {
        error!("Navigator fault: {}", reason);
        self.goals.clear();
        self.deferred
            .extend(self.machine.transition(NavState::Error, TransitionCause::Fault));
    }

    /// Run one control tick
    pub fn tick(&mut self, inputs: &TickInputs) -> TickOutcome {
        self.ticks += 1;
        let mut transitions = std::mem::take(&mut self.deferred);

        if !self.base.is_active() {
            return self.finish(inputs, TickReport::halted(), transitions);
        }

        self.apply_requests(inputs, &mut transitions);
        if !self.machine.state().is_active() {
            return self.finish(inputs, TickReport::halted(), transitions);
        }

        let footprint = match self.footprint.clone() {
            Some(footprint) => footprint,
            None => {
                let reason = NavError::InputUnavailable("no robot footprint".to_string());
                return self.skip(inputs, reason, transitions);
            }
        };
        let frame = match self.resolver.resolve(inputs.transforms, inputs.obstacles, inputs.now) {
            Ok(frame) => frame,
            Err(reason) => return self.skip(inputs, reason, transitions),
        };
        self.consecutive_input_failures = 0;

        match self.goals.advance(&frame.robot_pose) {
            QueueProgress::Finished => {
                info!(
                    "Goal reached at ({:.2}, {:.2}, {:.2})",
                    frame.robot_pose.x, frame.robot_pose.y, frame.robot_pose.heading
                );
                transitions.extend(
                    self.machine
                        .transition(NavState::GoalReached, TransitionCause::GoalReached),
                );
                self.consecutive_blocked = 0;
                let report = TickReport {
                    kind: TickKind::Executed,
                    command: Some(VelocityCommand::stop()),
                    robot_pose: Some(frame.robot_pose),
                    obstacles: &frame.obstacles,
                    selection: None,
                };
                return self.finish(inputs, report, transitions);
            }
            QueueProgress::Advanced(n) => {
                info!("Passed {} waypoint(s), {} remaining", n, self.goals.len());
            }
            QueueProgress::Pending => {}
        }

        let goal = match self.goals.active() {
            Some(goal) => goal.clone(),
            None => return self.finish(inputs, TickReport::halted(), transitions),
        };

        self.evaluate(inputs, &frame, &footprint, &goal, transitions)
    }

    fn evaluate(
        &mut self,
        inputs: &TickInputs,
        frame: &ResolvedFrame,
        footprint: &Footprint,
        goal: &Goal,
        mut transitions: Vec<Transition>,
    ) -> TickOutcome {
        let limits = &self.params.kinematics;
        let safety = &self.params.safety;
        let max_travel = limits.max_travel(self.trajectories.horizon());
        let reach = footprint.bounding_radius()
            + max_travel
            + self.strategy.safety.safety_margin()
            + safety.clearance_saturation;
        let local = LocalObstacles::build(&frame.robot_pose, &frame.obstacles, reach);

        let current = inputs
            .measured_velocity
            .filter(VelocityCommand::is_finite)
            .unwrap_or(self.last_command);
        let candidates = self
            .strategy
            .generator
            .generate(&current, limits, self.node.control_period);
        let selection = self.selector.select(
            &self.strategy,
            &self.trajectories,
            &frame.robot_pose,
            &candidates,
            footprint,
            &local,
            goal,
            max_travel,
        );
        let command = limits.clamp(&selection.command);

        if selection.blocked {
            self.consecutive_blocked += 1;
            debug!(
                "No feasible motion among {} candidates ({} in a row)",
                candidates.len(),
                self.consecutive_blocked
            );
            if self.consecutive_blocked > self.params.thresholds.blocked_threshold
                && self.machine.state() == NavState::Navigating
            {
                warn!("Robot blocked for {} ticks", self.consecutive_blocked);
                transitions.extend(
                    self.machine
                        .transition(NavState::Blocked, TransitionCause::NoFeasibleCandidate),
                );
            }
        } else {
            self.consecutive_blocked = 0;
            if self.machine.state() == NavState::Blocked {
                transitions.extend(
                    self.machine
                        .transition(NavState::Navigating, TransitionCause::Unblocked),
                );
            }
        }

        let report = TickReport {
            kind: TickKind::Executed,
            command: Some(command),
            robot_pose: Some(frame.robot_pose),
            obstacles: &frame.obstacles,
            selection: Some(selection),
        };
        self.finish(inputs, report, transitions)
    }

    fn skip(&mut self, inputs: &TickInputs, reason: NavError, mut transitions: Vec<Transition>) -> TickOutcome {
        self.consecutive_input_failures += 1;
        warn!(
            "Skipping tick {} ({} in a row): {}",
            self.ticks, self.consecutive_input_failures, reason
        );
        if self.consecutive_input_failures > self.params.thresholds.input_failure_threshold
            && self.machine.state() == NavState::Navigating
        {
            transitions.extend(
                self.machine
                    .transition(NavState::Blocked, TransitionCause::InputLoss),
            );
        }
        let command = match self.params.skipped_tick {
            SkippedTickPolicy::Stop => Some(VelocityCommand::stop()),
            SkippedTickPolicy::Silent => None,
        };
        let report = TickReport {
            kind: TickKind::Skipped { reason },
            command,
            robot_pose: self.resolver.robot_pose(inputs.transforms, inputs.now).ok(),
            obstacles: &[],
            selection: None,
        };
        self.finish(inputs, report, transitions)
    }

    fn finish(&mut self, inputs: &TickInputs, report: TickReport, transitions: Vec<Transition>) -> TickOutcome {
        if let Some(command) = report.command {
            self.last_command = command;
        }

        if let Some(logger) = self.logger.as_mut() {
            if logger.is_enabled() {
                let record = TickRecord {
                    tick: self.ticks,
                    stamp: inputs.now,
                    state: self.machine.state(),
                    outcome: report.kind.label().to_string(),
                    robot_pose: report.robot_pose,
                    goal: self.goals.active().map(|g| g.pose),
                    obstacles: report.obstacles.iter().map(|p| [p.x, p.y]).collect(),
                    candidates: report
                        .selection
                        .as_ref()
                        .map(|s| s.scored.iter().map(candidate_record).collect())
                        .unwrap_or_default(),
                    selected: report.selection.as_ref().map(|s| s.chosen),
                    command: report.command,
                    transitions: transitions.clone(),
                };
                logger.log(&record);
            }
        }

        TickOutcome {
            tick: self.ticks,
            kind: report.kind,
            command: report.command,
            state: self.machine.state(),
            transitions,
            robot_pose: report.robot_pose,
            selection: report.selection,
        }
    }

    fn apply_requests(&mut self, inputs: &TickInputs, transitions: &mut Vec<Transition>) {
        while let Some(request) = self.pending.pop_front() {
            match request {
                GoalRequest::Cancel => self.cancel_goals(transitions),
                GoalRequest::Set(goal) => match self.goal_to_reference(goal, inputs) {
                    Ok(goal) => self.start(vec![(goal, false)], transitions),
                    Err(e) => warn!("Rejecting goal: {}", e),
                },
                GoalRequest::Waypoints(sequence) => {
                    if sequence.waypoints.is_empty() {
                        warn!("Ignoring empty waypoint sequence");
                        continue;
                    }
                    let tolerance = self.params.goal.heading_tolerance;
                    let goals: Result<Vec<(Goal, bool)>> = sequence
                        .waypoints
                        .iter()
                        .map(|wp| {
                            self.goal_to_reference(wp.to_goal(&sequence.frame_id, tolerance), inputs)
                                .map(|goal| (goal, wp.allow_skip))
                        })
                        .collect();
                    match goals {
                        Ok(goals) => self.start(goals, transitions),
                        Err(e) => warn!("Rejecting waypoint sequence: {}", e),
                    }
                }
            }
        }
    }

    fn start(&mut self, goals: Vec<(Goal, bool)>, transitions: &mut Vec<Transition>) {
        let state = self.machine.state();
        if state == NavState::Error {
            warn!("Ignoring goal while in ERROR; reconfigure first");
            return;
        }
        if state.is_active() {
            transitions.extend(
                self.machine
                    .transition(NavState::Aborted, TransitionCause::GoalReplaced),
            );
        }

        if let Some((first, _)) = goals.first() {
            info!(
                "New goal ({:.2}, {:.2}) in '{}', {} waypoint(s)",
                first.pose.x,
                first.pose.y,
                first.frame_id,
                goals.len()
            );
        }
        self.goals.set_sequence(goals);
        self.consecutive_blocked = 0;
        self.consecutive_input_failures = 0;
        transitions.extend(
            self.machine
                .transition(NavState::Navigating, TransitionCause::GoalSet),
        );
    }

    fn cancel_goals(&mut self, transitions: &mut Vec<Transition>) {
        if !self.machine.state().is_active() {
            debug!("Cancel requested with no goal in progress");
            return;
        }
        info!("Navigation cancelled");
        self.goals.clear();
        transitions.extend(
            self.machine
                .transition(NavState::Aborted, TransitionCause::Cancelled),
        );
    }

    fn goal_to_reference(&self, goal: Goal, inputs: &TickInputs) -> Result<Goal> {
        if !goal.pose.is_finite() {
            return Err(NavError::InfeasibleConfiguration("goal pose is not finite".to_string()));
        }
        if !(goal.acceptance_radius > 0.0) || !(goal.heading_tolerance > 0.0) {
            return Err(NavError::InfeasibleConfiguration(format!(
                "goal tolerances must be positive: radius {}, heading {}",
                goal.acceptance_radius, goal.heading_tolerance
            )));
        }

        let reference = self.resolver.reference_frame();
        if goal.frame_id.is_empty() || goal.frame_id == reference {
            return Ok(Goal {
                frame_id: reference.to_string(),
                ..goal
            });
        }
        let pose = self
            .resolver
            .to_reference(inputs.transforms, &goal.frame_id, &goal.pose, inputs.now)?;
        debug!("Goal moved from '{}' into '{}'", goal.frame_id, reference);
        Ok(Goal {
            frame_id: reference.to_string(),
            pose,
            ..goal
        })
    }
}

fn candidate_record(c: &ScoredCandidate) -> CandidateRecord {
    CandidateRecord {
        command: c.command,
        feasible: c.safety.feasible,
        min_clearance: c.safety.min_clearance.is_finite().then_some(c.safety.min_clearance),
        clearance_score: c.safety.score,
        progress: c.progress,
    }
}

impl LifecycleNode for ReactiveNavigator {
    fn on_configure(&mut self) -> Result<()> {
        if !self.base.can_transition(LifecycleState::Inactive) {
            return self.base.transition(LifecycleState::Inactive);
        }
        info!("Configuring reactive navigator ({})", self.strategy.describe());
        let checked = self
            .node
            .validate()
            .and_then(|_| self.params.validate())
            .and_then(|_| self.params.robot.footprint());
        let footprint = match checked {
            Ok(footprint) => footprint,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        if footprint.is_none() && self.footprint.is_none() && self.node.footprint_source.is_empty() {
            let e = NavError::InfeasibleConfiguration(
                "no robot footprint configured and no footprint source".to_string(),
            );
            self.fail(&e);
            return Err(e);
        }
        if footprint.is_some() {
            self.footprint = footprint;
        }
        self.base.transition(LifecycleState::Inactive)
    }

    fn on_activate(&mut self) -> Result<()> {
        self.base.transition(LifecycleState::Active)?;
        info!("Activating reactive navigator");
        Ok(())
    }

    fn on_deactivate(&mut self) -> Result<()> {
        self.base.transition(LifecycleState::Inactive)?;
        info!("Deactivating reactive navigator");
        self.pending.clear();
        self.goals.clear();
        if self.machine.state() != NavState::Error {
            self.deferred
                .extend(self.machine.transition(NavState::Idle, TransitionCause::Deactivated));
        }
        self.last_command = VelocityCommand::stop();
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<()> {
        self.base.transition(LifecycleState::Unconfigured)?;
        info!("Cleaning up reactive navigator");
        self.logger = None;
        Ok(())
    }
}
