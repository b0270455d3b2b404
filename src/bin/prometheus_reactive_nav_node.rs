use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use nalgebra::Point2;
use prometheus_reactive_nav::{
    navigation::GoalRequest, sim::KinematicSimulator, Goal, NavState, NavigationNode, NodeConfig, Pose2D,
    VelocityCommand,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "prometheus_reactive_nav_node",
    about = "Reactive local navigation node driving a simulated base"
)]
struct Args {
    /// Navigation parameters (YAML)
    #[arg(long)]
    params_file: Option<PathBuf>,
    #[arg(long, default_value = "map")]
    reference_frame: String,
    #[arg(long, default_value = "base_link")]
    robot_frame: String,
    /// Control period in seconds
    #[arg(long, default_value_t = 0.2)]
    nav_period: f64,
    #[arg(long, default_value = "/local_map_pointcloud")]
    topic_obstacles: String,
    /// Empty: footprint comes from the parameters file
    #[arg(long, default_value = "")]
    topic_robot_shape: String,
    #[arg(long, default_value = "/goal_pose")]
    topic_reactive_nav_goal: String,
    #[arg(long, default_value = "/cmd_vel")]
    cmd_vel_out: String,
    /// Write one JSON line per tick to the configured log path
    #[arg(long)]
    save_nav_log: bool,
    /// Used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Robot radius when the parameters define no footprint
    #[arg(long)]
    robot_radius: Option<f64>,
    /// Start pose "x,y,heading"
    #[arg(long, value_parser = parse_pose, default_value = "0,0,0")]
    start: Pose2D,
    /// Goal "x,y" or "x,y,heading"
    #[arg(long, value_parser = parse_pose)]
    goal: Option<Pose2D>,
    /// Obstacle point "x,y" in the reference frame; repeatable
    #[arg(long = "obstacle", value_parser = parse_point)]
    obstacles: Vec<Point2<f64>>,
    /// Give up after this many seconds
    #[arg(long, default_value_t = 60.0)]
    max_duration: f64,
}

fn parse_numbers(s: &str) -> std::result::Result<Vec<f64>, String> {
    s.split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{}': {}", v, e)))
        .collect()
}

fn parse_pose(s: &str) -> std::result::Result<Pose2D, String> {
    match parse_numbers(s)?.as_slice() {
        [x, y] => Ok(Pose2D::new(*x, *y, 0.0)),
        [x, y, heading] => Ok(Pose2D::new(*x, *y, *heading)),
        _ => Err(format!("expected x,y[,heading], got '{}'", s)),
    }
}

fn parse_point(s: &str) -> std::result::Result<Point2<f64>, String> {
    match parse_numbers(s)?.as_slice() {
        [x, y] => Ok(Point2::new(*x, *y)),
        _ => Err(format!("expected x,y, got '{}'", s)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("prometheus_reactive_nav={}", args.log_level).into()),
        )
        .init();

    let config = NodeConfig {
        reference_frame: args.reference_frame.clone(),
        robot_frame: args.robot_frame.clone(),
        control_period: args.nav_period,
        obstacle_source: args.topic_obstacles.clone(),
        footprint_source: args.topic_robot_shape.clone(),
        goal_source: args.topic_reactive_nav_goal.clone(),
        command_sink: args.cmd_vel_out.clone(),
        params_file: args.params_file.clone(),
        save_nav_log: args.save_nav_log,
        log_level: args.log_level.clone(),
    };
    config.validate().context("invalid node options")?;

    if !(args.max_duration.is_finite() && args.max_duration > 0.0) {
        bail!("--max-duration must be a positive number of seconds, got {}", args.max_duration);
    }

    let mut params = config.load_params().context("failed to load navigation parameters")?;
    if params.robot.footprint.is_none() && params.robot.radius.is_none() {
        params.robot.radius = args.robot_radius;
    }
    let goal_radius = params.goal.acceptance_radius;

    let (node, mut handles) = NavigationNode::new(config.clone(), params).context("failed to start navigator")?;
    let node_task = tokio::spawn(node.run());

    let mut sim = KinematicSimulator::new(args.start).with_obstacles(args.obstacles.clone());
    let publish = |sim: &KinematicSimulator, handles: &prometheus_reactive_nav::NodeHandles| {
        let now = handles.clock.now();
        handles.publish_transform(&config.reference_frame, &config.robot_frame, sim.pose().to_isometry(), now);
        handles.obstacles.send_replace(Some(sim.scan(&config.robot_frame, now)));
        handles.odometry.send_replace(Some((now, sim.velocity())));
    };
    publish(&sim, &handles);

    match args.goal {
        Some(pose) => {
            let goal = Goal::new(&config.reference_frame, pose, goal_radius, std::f64::consts::PI);
            info!("Sending goal ({:.2}, {:.2})", pose.x, pose.y);
            handles
                .goals
                .send(GoalRequest::Set(goal))
                .map_err(|_| anyhow!("navigator stopped before the goal was sent"))?;
        }
        None => warn!("No goal given; the robot will hold still"),
    }

    let step = Duration::from_secs_f64(args.nav_period / 4.0);
    let mut ticker = tokio::time::interval(step);
    let mut command = VelocityCommand::stop();
    let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(args.max_duration);
    let mut last_state = NavState::Idle;
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut interrupted => {
                info!("Interrupted");
                break;
            }
        }

        while let Ok(cmd) = handles.commands.try_recv() {
            command = cmd;
        }
        sim.step(&command, step.as_secs_f64());
        publish(&sim, &handles);

        let state = handles.status.borrow().state;
        if state != last_state {
            info!("Navigator is {}", state);
            last_state = state;
        }
        if args.goal.is_some() && state.is_terminal() {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            warn!("Giving up after {:.1}s", args.max_duration);
            break;
        }
    }

    let status = handles.status.borrow().clone();
    let pose = sim.pose();
    info!(
        "Final state {} after {} ticks at ({:.2}, {:.2}, {:.2}), degraded: {}",
        status.state, status.tick, pose.x, pose.y, pose.heading, status.degraded
    );

    handles.request_shutdown();
    let ticks = node_task.await.context("navigation task panicked")??;
    info!("Node ran {} ticks", ticks);
    Ok(())
}
