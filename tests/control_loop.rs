use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use xoq_sequencer::{
    ActuatorPort, ArmMotionResult, ChannelActuator, Command, CommandKind, CommandPlan, CommandSpec,
    ControlLoop, DependencyGate, DependencyOp, JointStateSample, LoopState, PositionTable,
    ResolvedSpec, RunState, RunStateGate, SequencerConfig, SequencerError, SimSettings,
    SimulatedArm, ARM_JOINT_NAMES, GRIPPER_JOINT_NAMES,
};

const HOME: [f64; 5] = [0.0, 0.0, 0.0, 0.0, 0.0];
const CANDLE: [f64; 5] = [2.95, 1.05, -2.44, 1.73, 2.95];

fn positions() -> PositionTable {
    PositionTable::new()
        .with("home", HOME.to_vec())
        .with("candle", CANDLE.to_vec())
        .with("open", vec![0.02])
        .with("closed", vec![0.0])
}

fn fast_config() -> SequencerConfig {
    SequencerConfig {
        gripper_poll_hz: 500.0,
        gripper_timeout_secs: Some(5.0),
        ..SequencerConfig::default()
    }
}

fn fast_sim() -> SimSettings {
    SimSettings {
        trajectory_time_scale: 0.0,
        ..SimSettings::default()
    }
}

struct Harness {
    sequencer: ControlLoop,
    arm: Arc<SimulatedArm>,
    depends: DependencyGate,
    run_state: RunStateGate,
    cancel: CancellationToken,
}

fn harness(commands: Vec<Command>) -> Harness {
    harness_with(commands, fast_config(), fast_sim(), DependencyGate::new())
}

fn harness_with(
    commands: Vec<Command>,
    config: SequencerConfig,
    sim: SimSettings,
    depends: DependencyGate,
) -> Harness {
    let arm = Arc::new(SimulatedArm::new(sim));
    let run_state = RunStateGate::new(RunState::Running);
    let cancel = CancellationToken::new();
    let mut sequencer = ControlLoop::new(
        config,
        arm.clone(),
        depends.clone(),
        run_state.clone(),
        cancel.clone(),
    );
    sequencer
        .load(CommandPlan::new(positions(), commands))
        .unwrap();
    Harness {
        sequencer,
        arm,
        depends,
        run_state,
        cancel,
    }
}

fn name(s: &str) -> CommandSpec {
    CommandSpec::Name(s.to_string())
}

#[tokio::test]
async fn noop_then_sleep_completes_in_order() {
    let mut h = harness(vec![Command::noop(), Command::sleep(0.1)]);
    assert_eq!(h.sequencer.state(), LoopState::Ready);

    let started = std::time::Instant::now();
    let report = h.sequencer.run().await.unwrap();

    assert_eq!(h.sequencer.state(), LoopState::Completed);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].index, 0);
    assert_eq!(report.steps[0].kind, CommandKind::Noop);
    assert_eq!(report.steps[0].resolved, None);
    assert_eq!(report.steps[1].index, 1);
    assert_eq!(report.steps[1].kind, CommandKind::Sleep);
    assert_eq!(report.steps[1].resolved, Some(ResolvedSpec::Scalar(0.1)));
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn invalid_type_fails_and_stops() {
    let mut h = harness(vec![
        Command::noop().with_depend(DependencyOp::set("first_done")),
        Command::new("bogus"),
        Command::move_gripper(name("open")).with_depend(DependencyOp::set("never")),
    ]);

    let err = h.sequencer.run().await.unwrap_err();
    assert_eq!(h.sequencer.state(), LoopState::Failed);
    match &err {
        SequencerError::CommandFailed { index, kind, .. } => {
            assert_eq!(*index, 1);
            assert_eq!(kind, &CommandKind::Other("bogus".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err.root(), SequencerError::InvalidCommandType(t) if t == "bogus"));
    assert!(err.to_string().contains("bogus"));

    assert!(h.depends.is_set("first_done"));
    assert!(!h.depends.is_set("never"));
    assert!(h.arm.gripper_commands().is_empty());
}

#[tokio::test]
async fn gripper_and_arm_motion() {
    let mut h = harness(vec![
        Command::move_gripper(name("open")),
        Command::move_arm("candle"),
        Command::move_gripper(CommandSpec::Number(0.01)),
        Command::move_arm("home"),
    ]);

    let report = h.sequencer.run().await.unwrap();
    assert_eq!(report.steps.len(), 4);
    assert_eq!(
        report.steps[1].resolved,
        Some(ResolvedSpec::Vector(CANDLE.to_vec()))
    );

    assert_eq!(h.arm.jaws(), [0.005, 0.005]);
    assert_eq!(h.arm.arm_pose(), HOME);

    let goals = h.arm.trajectory_goals();
    assert_eq!(goals.len(), 2);
    assert_eq!(goals[0].target().unwrap(), &CANDLE);
    assert_eq!(goals[0].points[0].time_from_start, Duration::from_millis(500));
    assert_eq!(goals[0].points[0].velocities, vec![0.0; 5]);
}

#[tokio::test]
async fn out_of_range_gripper_is_fatal() {
    let mut h = harness(vec![
        Command::move_gripper(CommandSpec::Number(0.03)),
        Command::noop(),
    ]);
    let err = h.sequencer.run().await.unwrap_err();
    assert!(matches!(
        err.root(),
        SequencerError::OutOfRangeTarget { value, .. } if *value == 0.03
    ));
    assert!(h.arm.gripper_commands().is_empty());
    assert_eq!(h.sequencer.state(), LoopState::Failed);
}

#[tokio::test]
async fn unknown_position_is_fatal() {
    let mut h = harness(vec![Command::move_arm("nowhere")]);
    let err = h.sequencer.run().await.unwrap_err();
    assert!(matches!(err.root(), SequencerError::UnknownPositionName(n) if n == "nowhere"));
    assert!(h.arm.trajectory_goals().is_empty());
}

#[tokio::test]
async fn planner_variants_are_not_implemented() {
    for kind in [CommandKind::PlanExecArm, CommandKind::PlanArm] {
        let mut h = harness(vec![Command::new(kind).with_spec(name("home"))]);
        let err = h.sequencer.run().await.unwrap_err();
        assert!(matches!(err.root(), SequencerError::NotImplemented(_)));
        assert_eq!(h.sequencer.state(), LoopState::Failed);
    }
}

#[tokio::test]
async fn run_without_plan_fails() {
    let mut sequencer = ControlLoop::new(
        SequencerConfig::default(),
        Arc::new(SimulatedArm::new(fast_sim())),
        DependencyGate::new(),
        RunStateGate::new(RunState::Running),
        CancellationToken::new(),
    );
    assert_eq!(sequencer.state(), LoopState::NotLoaded);

    let err = sequencer
        .load(CommandPlan::new(positions(), Vec::new()))
        .unwrap_err();
    assert!(matches!(err, SequencerError::Configuration(_)));
    assert_eq!(sequencer.state(), LoopState::NotLoaded);

    let err = sequencer.run().await.unwrap_err();
    assert!(matches!(err, SequencerError::Configuration(_)));
    assert_eq!(sequencer.state(), LoopState::Failed);
}

#[tokio::test]
async fn set_then_clear_after_dispatch() {
    let mut h = harness(vec![Command::noop()
        .with_depend(DependencyOp::clear("x"))
        .with_depend(DependencyOp::set("x"))
        .with_depend(DependencyOp::set("y"))]);
    h.sequencer.run().await.unwrap();
    assert!(!h.depends.is_set("x"));
    assert!(h.depends.is_set("y"));
}

#[tokio::test]
async fn sequences_coordinate_through_depends() {
    let depends = DependencyGate::new();
    let mut waiter = harness_with(
        vec![Command::move_arm("candle").with_depend(DependencyOp::wait("gripper_open"))],
        fast_config(),
        fast_sim(),
        depends.clone(),
    );
    let mut setter = harness_with(
        vec![
            Command::sleep(0.05),
            Command::move_gripper(name("open")).with_depend(DependencyOp::set("gripper_open")),
        ],
        fast_config(),
        fast_sim(),
        depends.clone(),
    );

    let (waited, set) = tokio::join!(waiter.sequencer.run(), setter.sequencer.run());
    waited.unwrap();
    set.unwrap();
    assert_eq!(waiter.arm.arm_pose(), CANDLE);
    assert!(depends.is_set("gripper_open"));
}

#[tokio::test]
async fn paused_run_state_holds_the_sequence() {
    let h = harness(vec![Command::noop(), Command::noop()]);
    h.run_state.set(RunState::Paused);
    let run_state = h.run_state.clone();
    let mut sequencer = h.sequencer;

    let task = tokio::spawn(async move {
        let report = sequencer.run().await;
        (sequencer.state(), report)
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    run_state.set(RunState::Running);
    let (state, report) = task.await.unwrap();
    assert_eq!(state, LoopState::Completed);
    assert_eq!(report.unwrap().steps.len(), 2);
}

#[tokio::test]
async fn cancel_releases_dependency_wait() {
    let h = harness(vec![Command::noop().with_depend(DependencyOp::wait("never"))]);
    let cancel = h.cancel.clone();
    let mut sequencer = h.sequencer;

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
    });
    let err = sequencer.run().await.unwrap_err();
    assert!(matches!(err.root(), SequencerError::Cancelled));
    assert_eq!(sequencer.state(), LoopState::Failed);
}

#[tokio::test]
async fn depend_timeout_is_configurable() {
    let config = SequencerConfig {
        depend_timeout_secs: Some(0.05),
        ..fast_config()
    };
    let mut h = harness_with(
        vec![Command::noop().with_depend(DependencyOp::wait("never"))],
        config,
        fast_sim(),
        DependencyGate::new(),
    );
    let err = h.sequencer.run().await.unwrap_err();
    assert!(matches!(err.root(), SequencerError::Timeout(_)));
}

#[tokio::test]
async fn arm_failures_propagate() {
    let rejecting = SimSettings {
        reject_trajectories: true,
        ..fast_sim()
    };
    let mut h = harness_with(
        vec![Command::move_arm("home")],
        fast_config(),
        rejecting,
        DependencyGate::new(),
    );
    let err = h.sequencer.run().await.unwrap_err();
    assert!(matches!(err.root(), SequencerError::ActuatorFailure(_)));

    let drifting = SimSettings {
        arm_error: 0.1,
        ..fast_sim()
    };
    let mut h = harness_with(
        vec![Command::move_arm("home")],
        fast_config(),
        drifting,
        DependencyGate::new(),
    );
    let err = h.sequencer.run().await.unwrap_err();
    assert!(matches!(err.root(), SequencerError::ActuatorFailure(_)));
}

#[tokio::test]
async fn slow_arm_times_out() {
    let config = SequencerConfig {
        arm_timeout_secs: Some(0.05),
        ..fast_config()
    };
    let slow = SimSettings {
        trajectory_time_scale: 10.0,
        ..SimSettings::default()
    };
    let mut h = harness_with(
        vec![Command::move_arm("home")],
        config,
        slow,
        DependencyGate::new(),
    );
    let err = h.sequencer.run().await.unwrap_err();
    assert!(matches!(err.root(), SequencerError::ActuatorTimeout(_)));
}

#[tokio::test]
async fn plan_file_runs_end_to_end() {
    let json = r#"{
        "positions": {"home": [0, 0, 0, 0, 0], "open": 0.02},
        "commands": [
            {"type": "move_gripper", "spec": "open", "depends": [{"kind": "set", "name": "open"}]},
            {"type": "sleep", "spec": "0.01"},
            {"type": "move_arm", "spec": "home", "depends": [{"kind": "wait", "name": "open"}]}
        ]
    }"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, json.as_bytes()).unwrap();
    let plan = CommandPlan::load(file.path()).unwrap();

    let arm = Arc::new(SimulatedArm::new(fast_sim()));
    let mut sequencer = ControlLoop::new(
        fast_config(),
        arm.clone(),
        DependencyGate::new(),
        RunStateGate::new(RunState::Running),
        CancellationToken::new(),
    );
    sequencer.load(plan).unwrap();
    let report = sequencer.run().await.unwrap();
    assert_eq!(report.steps.len(), 3);
    assert_eq!(report.steps[1].resolved, Some(ResolvedSpec::Scalar(0.01)));
    for jaw in arm.jaws() {
        assert!((jaw - 0.01).abs() < 1e-9, "jaw at {}", jaw);
    }
}

#[tokio::test]
async fn channel_actuator_with_fake_transport() {
    let (actuator, mut handles) = ChannelActuator::new(8);
    let feedback = handles.feedback.clone();

    // Transport side: echo gripper commands back as joint states and
    // complete every trajectory at its target.
    let transport = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = handles.gripper_rx.recv() => {
                    let names: Vec<&str> = msg.joint_names();
                    feedback.update(JointStateSample::new(&names, &msg.values()));
                }
                Some(req) = handles.trajectory_rx.recv() => {
                    let target = req.goal.target().map(|t| t.to_vec());
                    let _ = req.reply.send(ArmMotionResult::succeeded(target));
                }
                else => break,
            }
        }
    });

    let actuator: Arc<dyn ActuatorPort> = Arc::new(actuator);
    let mut sequencer = ControlLoop::new(
        fast_config(),
        actuator.clone(),
        DependencyGate::new(),
        RunStateGate::new(RunState::Running),
        CancellationToken::new(),
    );
    sequencer
        .load(CommandPlan::new(
            positions(),
            vec![Command::move_gripper(name("open")), Command::move_arm("candle")],
        ))
        .unwrap();
    let report = sequencer.run().await.unwrap();
    assert_eq!(report.steps.len(), 2);

    assert_eq!(
        actuator.feedback(&GRIPPER_JOINT_NAMES).unwrap(),
        vec![0.01, 0.01]
    );
    assert!(actuator.feedback(&ARM_JOINT_NAMES).is_err());

    drop(sequencer);
    drop(actuator);
    transport.await.unwrap();
}
