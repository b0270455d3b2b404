//! The tokio node driving a simulated base in real time

use nalgebra::Point2;
use pretty_assertions::assert_eq;
use prometheus_reactive_nav::geometry::FootprintUpdate;
use prometheus_reactive_nav::sim::KinematicSimulator;
use prometheus_reactive_nav::{
    Goal, GoalRequest, NavState, NavigationNode, NavigationParams, NodeConfig, NodeHandles, Pose2D, ReactiveNavigator,
    VelocityCommand,
};
use std::f64::consts::PI;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

fn config() -> NodeConfig {
    NodeConfig {
        control_period: 0.02,
        ..NodeConfig::default()
    }
}

fn params() -> NavigationParams {
    let mut params = NavigationParams::default();
    params.robot.radius = Some(0.2);
    params
}

/// Feed the simulator into the node until `done` holds or `limit` passes
async fn drive(
    handles: &mut NodeHandles,
    sim: &mut KinematicSimulator,
    obstacles: bool,
    limit: Duration,
    done: impl Fn(&NodeHandles) -> bool,
) -> bool {
    let deadline = Instant::now() + limit;
    let mut command = VelocityCommand::stop();
    let mut last = Instant::now();
    while Instant::now() < deadline {
        while let Ok(cmd) = handles.commands.try_recv() {
            command = cmd;
        }
        let dt = last.elapsed().as_secs_f64();
        last = Instant::now();
        sim.step(&command, dt);

        let now = handles.clock.now();
        handles.publish_transform("map", "base_link", sim.pose().to_isometry(), now);
        if obstacles {
            handles.obstacles.send_replace(Some(sim.scan("base_link", now)));
        }
        handles.odometry.send_replace(Some((now, sim.velocity())));

        if done(&*handles) {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test]
async fn test_node_reaches_goal() {
    let (node, mut handles) = NavigationNode::new(config(), params()).unwrap();
    let task = tokio::spawn(node.run());

    let mut sim = KinematicSimulator::new(Pose2D::default()).with_obstacles(vec![Point2::new(0.6, 0.8)]);
    handles
        .goals
        .send(GoalRequest::Set(Goal::new("map", Pose2D::new(1.0, 0.0, 0.0), 0.15, PI)))
        .unwrap();

    let reached = drive(&mut handles, &mut sim, true, Duration::from_secs(15), |h| {
        h.status.borrow().state == NavState::GoalReached
    })
    .await;
    assert!(reached, "status: {:?}", *handles.status.borrow());
    assert!(sim.pose().distance_to(&Pose2D::new(1.0, 0.0, 0.0)) < 0.3);

    handles.request_shutdown();
    let ticks = timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
    assert!(ticks > 0);
}

#[tokio::test]
async fn test_footprint_arrives_from_source() {
    let config = NodeConfig {
        footprint_source: "/robot_shape".to_string(),
        ..config()
    };
    let (node, mut handles) = NavigationNode::new(config, NavigationParams::default()).unwrap();
    let task = tokio::spawn(node.run());

    let mut sim = KinematicSimulator::new(Pose2D::default());
    handles
        .goals
        .send(GoalRequest::Set(Goal::new("map", Pose2D::new(3.0, 0.0, 0.0), 0.15, PI)))
        .unwrap();

    // Without a footprint every tick is skipped
    let skipping = drive(&mut handles, &mut sim, true, Duration::from_secs(5), |h| {
        h.status.borrow().consecutive_input_failures >= 2
    })
    .await;
    assert!(skipping);
    assert_eq!(sim.pose(), Pose2D::default());

    handles
        .footprint
        .send_replace(Some(FootprintUpdate::Circle { radius: 0.2 }));
    let moving = drive(&mut handles, &mut sim, true, Duration::from_secs(5), |h| {
        h.status
            .borrow()
            .last_command
            .map_or(false, |cmd| cmd.linear_x > 0.0)
    })
    .await;
    assert!(moving);
    assert_eq!(handles.status.borrow().consecutive_input_failures, 0);

    handles.request_shutdown();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_lost_obstacles_block_the_robot() {
    let (node, mut handles) = NavigationNode::new(config(), params()).unwrap();
    let task = tokio::spawn(node.run());

    let mut sim = KinematicSimulator::new(Pose2D::default());
    handles
        .goals
        .send(GoalRequest::Set(Goal::new("map", Pose2D::new(2.0, 0.0, 0.0), 0.15, PI)))
        .unwrap();

    let blocked = drive(&mut handles, &mut sim, false, Duration::from_secs(5), |h| {
        h.status.borrow().state == NavState::Blocked
    })
    .await;
    assert!(blocked);
    let status = handles.status.borrow().clone();
    assert_eq!(status.last_command, Some(VelocityCommand::stop()));
    assert!(status.consecutive_input_failures > 3);

    handles.request_shutdown();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_sends_final_stop() {
    let (node, mut handles) = NavigationNode::new(config(), params()).unwrap();
    let task = tokio::spawn(node.run());
    sleep(Duration::from_millis(60)).await;

    handles.request_shutdown();
    let ticks = timeout(Duration::from_secs(2), task).await.unwrap().unwrap().unwrap();
    assert!(ticks >= 1);

    let mut last = None;
    while let Ok(cmd) = handles.commands.try_recv() {
        last = Some(cmd);
    }
    assert_eq!(last, Some(VelocityCommand::stop()));
}

#[tokio::test]
async fn test_dropping_handles_stops_the_node() {
    let (node, handles) = NavigationNode::new(config(), params()).unwrap();
    let task = tokio::spawn(node.run());
    sleep(Duration::from_millis(30)).await;
    drop(handles);
    assert!(timeout(Duration::from_secs(2), task).await.unwrap().unwrap().is_ok());
}

#[test]
fn test_node_refuses_unusable_configuration() {
    // No footprint, no radius and no footprint source
    let result = NavigationNode::new(config(), NavigationParams::default());
    assert!(result.is_err());
}

#[test]
fn test_node_needs_an_active_navigator() {
    let navigator = ReactiveNavigator::new(config(), params());
    assert!(NavigationNode::with_navigator(navigator).is_err());

    let navigator = ReactiveNavigator::activated(config(), params()).unwrap();
    assert!(NavigationNode::with_navigator(navigator).is_ok());
}
