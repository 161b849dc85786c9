//! Command sequencer - runs a command plan against the simulated arm.
//!
//! Usage: xoq-sequencer <plan.json> [OPTIONS]
//!
//! Examples:
//!   xoq-sequencer plan.json                                  # run immediately
//!   xoq-sequencer plan.json --start-delay 2 --arm-num 2      # stay idle for 2s first
//!   xoq-sequencer plan.json --config sequencer.json --gripper-tol 0.0005

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use xoq_sequencer::{
    CommandPlan, ControlLoop, DependencyGate, RunState, RunStateGate, SequencerConfig, SimSettings,
    SimulatedArm,
};

#[derive(Parser, Debug)]
#[command(name = "xoq-sequencer", about = "Run an arm/gripper command plan")]
struct Args {
    /// Plan file (positions + commands, JSON)
    plan: PathBuf,

    /// Sequencer config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Arm instance index
    #[arg(long)]
    arm_num: Option<u32>,

    /// Gripper convergence tolerance in meters
    #[arg(long)]
    gripper_tol: Option<f64>,

    /// Arm pose tolerance in radians
    #[arg(long)]
    joint_tol: Option<f64>,

    /// Give up on a dependency wait after this many seconds
    #[arg(long)]
    depend_timeout: Option<f64>,

    /// Seconds to stay idle before switching to running
    #[arg(long, default_value_t = 0.0)]
    start_delay: f64,

    /// Simulated jaw travel per gripper publish in meters
    #[arg(long, default_value_t = 0.002)]
    sim_gripper_step: f64,
}

fn build_config(args: &Args) -> Result<SequencerConfig> {
    let mut config = match &args.config {
        Some(path) => SequencerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SequencerConfig::default(),
    };
    if let Some(n) = args.arm_num {
        config.arm_num = n;
    }
    if let Some(tol) = args.gripper_tol {
        config.gripper_distance_tol = tol;
    }
    if let Some(tol) = args.joint_tol {
        config.joint_distance_tol = tol;
    }
    if args.depend_timeout.is_some() {
        config.depend_timeout_secs = args.depend_timeout;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("xoq_sequencer=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let plan = CommandPlan::load(&args.plan)
        .with_context(|| format!("loading plan {}", args.plan.display()))?;

    tracing::info!("Arm topic: {}", config.arm_topic());
    tracing::info!("Gripper topic: {}", config.gripper_topic());
    tracing::info!("Feedback topic: {}", config.joint_states_topic);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl-C received, cancelling sequence");
                cancel.cancel();
            }
        });
    }

    let run_state = RunStateGate::new(RunState::Idle);
    {
        let run_state = run_state.clone();
        let delay = Duration::try_from_secs_f64(args.start_delay)
            .context("--start-delay must be a non-negative number")?;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            run_state.set(RunState::Running);
        });
    }

    let actuator = Arc::new(SimulatedArm::new(SimSettings {
        gripper_step: args.sim_gripper_step,
        ..SimSettings::default()
    }));

    let mut sequencer = ControlLoop::new(
        config,
        actuator,
        DependencyGate::new(),
        run_state.clone(),
        cancel,
    );
    sequencer.load(plan)?;

    let result = sequencer.run().await;
    run_state.set(RunState::Stopped);
    let report = result?;

    for step in &report.steps {
        match &step.resolved {
            Some(value) => tracing::info!("#{} {} -> {}", step.index, step.kind, value),
            None => tracing::info!("#{} {}", step.index, step.kind),
        }
    }
    tracing::info!("Done: {} steps", report.steps.len());
    Ok(())
}
