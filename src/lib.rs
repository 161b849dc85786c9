//! xoq-sequencer - command sequencing for an arm + gripper manipulator.
//!
//! A [`ControlLoop`] runs a pre-loaded list of motion commands. Each command
//! is gated on an external run-state and on named dependency flags shared
//! with other sequences, and gripper moves are closed-loop: the target is
//! re-published until joint feedback converges.
//!
//! Motion execution and joint feedback come from an [`ActuatorPort`];
//! [`ChannelActuator`] exposes them as channels for a transport to drive,
//! and [`SimulatedArm`] stands in for hardware.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use xoq_sequencer::{
//!     CommandPlan, ControlLoop, DependencyGate, RunState, RunStateGate, SequencerConfig,
//!     SimSettings, SimulatedArm,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let plan = CommandPlan::load("plan.json")?;
//! let run_state = RunStateGate::new(RunState::Running);
//! let mut sequencer = ControlLoop::new(
//!     SequencerConfig::default(),
//!     Arc::new(SimulatedArm::new(SimSettings::default())),
//!     DependencyGate::new(),
//!     run_state,
//!     CancellationToken::new(),
//! );
//! sequencer.load(plan)?;
//! let report = sequencer.run().await?;
//! println!("{} steps", report.steps.len());
//! # Ok(())
//! # }
//! ```

pub mod actuator;
pub mod command;
pub mod config;
pub mod depends;
pub mod error;
pub mod feedback;
pub mod gripper;
pub mod plan;
pub mod planner;
pub mod positions;
pub mod resolver;
pub mod run_state;
pub mod sequencer;
pub mod sim;
pub mod trajectory;
mod wait;

pub use actuator::{
    ActuatorPort, ArmMotionResult, ArmRequest, ChannelActuator, ChannelActuatorHandles, JointPositions,
    JointUnit, JointValue, GRIPPER_JOINT_NAMES,
};
pub use command::{Command, CommandKind, CommandSpec, DependKind, DependencyOp};
pub use config::SequencerConfig;
pub use depends::DependencyGate;
pub use error::{Result, SequencerError};
pub use feedback::{euclidean_distance, FeedbackCell, JointStateSample};
pub use gripper::{ClosedLoopController, GripperOutcome, GripperSettings, MAX_GRIPPER_OPENING};
pub use plan::CommandPlan;
pub use planner::{PlannerPort, UnsupportedPlanner};
pub use positions::PositionTable;
pub use resolver::{CommandSpecResolver, ResolvedSpec};
pub use run_state::{RunState, RunStateGate};
pub use sequencer::{ControlLoop, LoopState, RunReport, StepRecord};
pub use sim::{SimSettings, SimulatedArm};
pub use trajectory::{
    ArmTrajectoryBuilder, TrajectoryGoal, TrajectoryPoint, ARM_JOINT_NAMES, WAYPOINT_TIME_FROM_START,
};
pub use wait::cancellable_sleep;
