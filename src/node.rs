//! Navigation node runtime
//!
//! Drives a [`ReactiveNavigator`] from a fixed-period tokio interval. Inputs
//! arrive through the channels in [`NodeHandles`]; each tick drains the goal
//! queue, takes one snapshot of the latest obstacles, footprint, odometry and
//! transforms, and sends at most one command.

use crate::common::{Stamp, VelocityCommand};
use crate::config::{NavigationParams, NodeConfig};
use crate::control::{OverrunMonitor, TimingEvent};
use crate::error::{NavError, Result};
use crate::geometry::FootprintUpdate;
use crate::lifecycle::{LifecycleNode, LifecycleState};
use crate::navigation::{GoalRequest, JsonLinesSink, NavState, ReactiveNavigator, TickInputs, TickOutcome};
use crate::perception::{ObstacleSet, TransformBuffer};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Monotonic clock shared by the node and its producers
#[derive(Debug, Clone, Copy)]
pub struct NavClock {
    start: Instant,
}

impl NavClock {
    pub fn new() -> Self {
        NavClock { start: Instant::now() }
    }

    /// Seconds since the clock was created
    pub fn now(&self) -> Stamp {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for NavClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Published after every tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavStatus {
    pub tick: u64,
    pub state: NavState,
    /// Control loop has overrun its period too often in a row
    pub degraded: bool,
    pub last_command: Option<VelocityCommand>,
    pub consecutive_blocked: u32,
    pub consecutive_input_failures: u32,
}

/// Producer and consumer ends of a running node
#[derive(Debug)]
pub struct NodeHandles {
    pub clock: NavClock,
    pub transforms: Arc<RwLock<TransformBuffer>>,
    pub obstacles: watch::Sender<Option<ObstacleSet>>,
    pub footprint: watch::Sender<Option<FootprintUpdate>>,
    /// Measured base velocity with its stamp
    pub odometry: watch::Sender<Option<(Stamp, VelocityCommand)>>,
    pub goals: mpsc::UnboundedSender<GoalRequest>,
    pub commands: mpsc::UnboundedReceiver<VelocityCommand>,
    pub status: watch::Receiver<NavStatus>,
    pub shutdown: watch::Sender<bool>,
}

impl NodeHandles {
    /// Ask the node to stop after the current tick
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Write a transform into the shared buffer
    pub fn publish_transform(&self, parent: &str, child: &str, transform: nalgebra::Isometry2<f64>, stamp: Stamp) {
        let mut buffer = self.transforms.write().unwrap_or_else(PoisonError::into_inner);
        buffer.set_transform(parent, child, transform, stamp);
    }
}

/// The navigator plus the plumbing around it
pub struct NavigationNode {
    navigator: ReactiveNavigator,
    clock: NavClock,
    period: Duration,
    monitor: OverrunMonitor,
    transforms: Arc<RwLock<TransformBuffer>>,
    obstacles: watch::Receiver<Option<ObstacleSet>>,
    footprint: watch::Receiver<Option<FootprintUpdate>>,
    odometry: watch::Receiver<Option<(Stamp, VelocityCommand)>>,
    goals: mpsc::UnboundedReceiver<GoalRequest>,
    commands: mpsc::UnboundedSender<VelocityCommand>,
    status: watch::Sender<NavStatus>,
    shutdown: watch::Receiver<bool>,
}

impl NavigationNode {
    /// Configure and activate a navigator for `config` and wire up its channels
    pub fn new(config: NodeConfig, params: NavigationParams) -> Result<(Self, NodeHandles)> {
        let save_nav_log = config.save_nav_log;
        let mut navigator = ReactiveNavigator::activated(config, params)?;
        if save_nav_log {
            let path = navigator.params().log_sink.path.clone();
            match JsonLinesSink::create(&path) {
                Ok(sink) => navigator.enable_logging(Box::new(sink)),
                Err(e) => warn!("Navigation log disabled: {}", e),
            }
        }
        Self::with_navigator(navigator)
    }

    /// Wire up an already activated navigator
    pub fn with_navigator(navigator: ReactiveNavigator) -> Result<(Self, NodeHandles)> {
        navigator.node_config().validate()?;
        if navigator.lifecycle_state() != LifecycleState::Active {
            return Err(NavError::Config(format!(
                "navigator must be active to run, it is {}",
                navigator.lifecycle_state()
            )));
        }
        let clock = NavClock::new();
        let transforms = Arc::new(RwLock::new(TransformBuffer::new()));
        let (obstacles_tx, obstacles_rx) = watch::channel(None);
        let (footprint_tx, footprint_rx) = watch::channel(None);
        let (odometry_tx, odometry_rx) = watch::channel(None);
        let (goals_tx, goals_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(NavStatus::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let config = navigator.node_config();
        let period = config.period();
        let monitor = OverrunMonitor::new(period, navigator.params().thresholds.overrun_degraded_threshold);
        info!(
            "Navigation node: {} -> {} every {:?}, obstacles from '{}', goals from '{}', commands to '{}'",
            config.reference_frame, config.robot_frame, period, config.obstacle_source, config.goal_source,
            config.command_sink
        );

        let node = NavigationNode {
            navigator,
            clock,
            period,
            monitor,
            transforms: Arc::clone(&transforms),
            obstacles: obstacles_rx,
            footprint: footprint_rx,
            odometry: odometry_rx,
            goals: goals_rx,
            commands: commands_tx,
            status: status_tx,
            shutdown: shutdown_rx,
        };
        let handles = NodeHandles {
            clock,
            transforms,
            obstacles: obstacles_tx,
            footprint: footprint_tx,
            odometry: odometry_tx,
            goals: goals_tx,
            commands: commands_rx,
            status: status_rx,
            shutdown: shutdown_tx,
        };
        Ok((node, handles))
    }

    pub fn navigator(&self) -> &ReactiveNavigator {
        &self.navigator
    }

    /// Tick until shutdown is requested or every handle is dropped
    pub async fn run(mut self) -> Result<u64> {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = self.shutdown.clone();

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    let started = Instant::now();
                    let outcome = self.step();
                    let timing = self.monitor.record(started.elapsed());
                    if let TimingEvent::Overrun { elapsed, .. } = timing {
                        debug!("Tick {} took {:?}", outcome.tick, elapsed);
                    }
                    self.publish_status(&outcome);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("All node handles dropped");
                        break;
                    }
                }
            }
        }

        self.navigator.on_deactivate()?;
        if self.commands.send(VelocityCommand::stop()).is_err() {
            debug!("Command receiver gone before the final stop");
        }
        let ticks = self.navigator.tick_count();
        info!("Navigation node stopped after {} ticks", ticks);
        Ok(ticks)
    }

    /// One tick on the current input snapshot
    pub fn step(&mut self) -> TickOutcome {
        while let Ok(request) = self.goals.try_recv() {
            self.navigator.request(request);
        }

        if self.footprint.has_changed().unwrap_or(false) {
            let update = self.footprint.borrow_and_update().clone();
            if let Some(update) = update {
                if let Err(e) = self.navigator.update_footprint(&update) {
                    debug!("Footprint update rejected: {}", e);
                }
            }
        }

        let now = self.clock.now();
        let obstacles = self.obstacles.borrow().clone();
        let max_age = self.navigator.params().thresholds.max_obstacle_age;
        let measured_velocity = (*self.odometry.borrow())
            .filter(|(stamp, velocity)| now - stamp <= max_age && velocity.is_finite())
            .map(|(_, velocity)| velocity);

        let outcome = {
            let transforms = self.transforms.read().unwrap_or_else(PoisonError::into_inner);
            self.navigator.tick(&TickInputs {
                now,
                transforms: &transforms,
                obstacles: obstacles.as_ref(),
                measured_velocity,
            })
        };

        if let Some(command) = outcome.command {
            if self.commands.send(command).is_err() {
                debug!("Command receiver dropped");
            }
        }
        outcome
    }

    fn publish_status(&self, outcome: &TickOutcome) {
        self.status.send_replace(NavStatus {
            tick: outcome.tick,
            state: outcome.state,
            degraded: self.monitor.is_degraded(),
            last_command: outcome.command,
            consecutive_blocked: self.navigator.consecutive_blocked(),
            consecutive_input_failures: self.navigator.consecutive_input_failures(),
        });
    }
}
