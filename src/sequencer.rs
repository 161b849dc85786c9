//! The command sequencer.
//!
//! [`ControlLoop`] walks a loaded [`CommandPlan`] one command at a time:
//!
//! 1. wait for the run-state to be `Running`
//! 2. resolve the spec (every type except `noop`)
//! 3. wait for the command's `wait` depends
//! 4. dispatch on the command type
//! 5. apply `set` depends, then `clear` depends
//!
//! Any failure aborts the remaining commands. The run-state is checked once
//! per command, so a pause takes effect between commands, not inside one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::actuator::{ActuatorPort, ArmMotionResult};
use crate::command::{Command, CommandKind, DependKind};
use crate::config::SequencerConfig;
use crate::depends::DependencyGate;
use crate::error::{Result, SequencerError};
use crate::feedback::euclidean_distance;
use crate::gripper::{ClosedLoopController, GripperSettings};
use crate::plan::CommandPlan;
use crate::planner::{PlannerPort, UnsupportedPlanner};
use crate::resolver::{CommandSpecResolver, ResolvedSpec};
use crate::run_state::RunStateGate;
use crate::trajectory::{ArmTrajectoryBuilder, TrajectoryGoal, ARM_JOINT_NAMES};
use crate::wait::{cancellable_sleep, guarded};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    NotLoaded,
    Ready,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotLoaded => "not-loaded",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One executed command.
#[derive(Clone, Debug, PartialEq)]
pub struct StepRecord {
    pub index: usize,
    pub kind: CommandKind,
    pub resolved: Option<ResolvedSpec>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    pub steps: Vec<StepRecord>,
}

/// Bounds derived from the config once per run.
struct Limits {
    run_state: Option<Duration>,
    depend: Option<Duration>,
    arm: Option<Duration>,
    gripper: GripperSettings,
    joint_tol: f64,
}

impl Limits {
    fn from_config(config: &SequencerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            run_state: config.run_state_timeout()?,
            depend: config.depend_timeout()?,
            arm: config.arm_timeout()?,
            gripper: config.gripper_settings()?,
            joint_tol: config.joint_distance_tol,
        })
    }
}

pub struct ControlLoop {
    config: SequencerConfig,
    actuator: Arc<dyn ActuatorPort>,
    planner: Arc<dyn PlannerPort>,
    depends: DependencyGate,
    run_state: RunStateGate,
    cancel: CancellationToken,
    plan: Option<CommandPlan>,
    state: LoopState,
}

impl ControlLoop {
    /// Create a sequencer over shared dependency and run-state services.
    pub fn new(
        config: SequencerConfig,
        actuator: Arc<dyn ActuatorPort>,
        depends: DependencyGate,
        run_state: RunStateGate,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            actuator,
            planner: Arc::new(UnsupportedPlanner),
            depends,
            run_state,
            cancel,
            plan: None,
            state: LoopState::NotLoaded,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn PlannerPort>) -> Self {
        self.planner = planner;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Load a plan. An empty command list leaves the loop `NotLoaded`.
    pub fn load(&mut self, plan: CommandPlan) -> Result<()> {
        if self.state == LoopState::Running {
            return Err(SequencerError::configuration("cannot load while running"));
        }
        plan.validate()?;
        tracing::info!("Plan loaded: {} commands", plan.commands.len());
        self.plan = Some(plan);
        self.state = LoopState::Ready;
        Ok(())
    }

    /// Execute every command in order.
    pub async fn run(&mut self) -> Result<RunReport> {
        let plan = match (self.state, self.plan.take()) {
            (LoopState::Ready, Some(plan)) => plan,
            (state, Some(plan)) => {
                // A finished plan is kept but not restarted implicitly.
                self.plan = Some(plan);
                return Err(SequencerError::configuration(format!(
                    "sequence is {}; load a plan again to rerun it",
                    state
                )));
            }
            (_, None) => {
                self.state = LoopState::Failed;
                let err = SequencerError::configuration(
                    "command list is empty; was the control plan loaded?",
                );
                tracing::error!("Sequence failed: {}", err);
                return Err(err);
            }
        };

        self.state = LoopState::Running;
        tracing::info!("Sequence started: {} commands", plan.commands.len());

        let result = self.run_plan(&plan).await;
        self.state = match &result {
            Ok(report) => {
                tracing::info!("Sequence completed: {} steps", report.steps.len());
                LoopState::Completed
            }
            Err(e) => {
                tracing::error!("Sequence failed: {}", e);
                LoopState::Failed
            }
        };
        self.plan = Some(plan);
        result
    }

    async fn run_plan(&self, plan: &CommandPlan) -> Result<RunReport> {
        let limits = Limits::from_config(&self.config)?;
        let resolver = CommandSpecResolver::new(&plan.positions);
        let mut report = RunReport::default();

        for (index, cmd) in plan.commands.iter().enumerate() {
            let resolved = self
                .run_command(cmd, &resolver, &limits)
                .await
                .map_err(|source| SequencerError::CommandFailed {
                    index,
                    kind: cmd.kind.clone(),
                    spec: cmd.spec_label(),
                    source: Box::new(source),
                })?;
            report.steps.push(StepRecord {
                index,
                kind: cmd.kind.clone(),
                resolved,
            });
        }
        Ok(report)
    }

    async fn run_command(
        &self,
        cmd: &Command,
        resolver: &CommandSpecResolver<'_>,
        limits: &Limits,
    ) -> Result<Option<ResolvedSpec>> {
        self.run_state
            .wait_for_running(&self.cancel, limits.run_state)
            .await?;

        let resolved = match (&cmd.kind, &cmd.spec) {
            (CommandKind::Noop, _) | (_, None) => None,
            (_, Some(spec)) => Some(resolver.resolve(spec)?),
        };
        match &resolved {
            Some(value) => tracing::info!(
                "Command type: {}, spec: {}, value: {}",
                cmd.kind,
                cmd.spec_label(),
                value
            ),
            None => tracing::info!("Command type: {}", cmd.kind),
        }

        self.depends
            .wait_for(&cmd.depends_of(DependKind::Wait), &self.cancel, limits.depend)
            .await?;

        self.dispatch(&cmd.kind, resolved.as_ref(), limits).await?;

        self.depends.set(&cmd.depends_of(DependKind::Set));
        self.depends.clear(&cmd.depends_of(DependKind::Clear));
        Ok(resolved)
    }

    async fn dispatch(
        &self,
        kind: &CommandKind,
        resolved: Option<&ResolvedSpec>,
        limits: &Limits,
    ) -> Result<()> {
        match kind {
            CommandKind::Noop => Ok(()),
            CommandKind::Sleep => {
                let secs = required(kind, resolved)?.scalar()?;
                let duration = Duration::try_from_secs_f64(secs).map_err(|_| {
                    SequencerError::configuration(format!("invalid sleep duration {}", secs))
                })?;
                tracing::debug!("Sleeping {:?}", duration);
                cancellable_sleep(duration, &self.cancel).await
            }
            CommandKind::MoveGripper => {
                let opening = required(kind, resolved)?.gripper_opening()?;
                ClosedLoopController::new(self.actuator.as_ref(), &limits.gripper, &self.cancel)
                    .move_gripper(opening)
                    .await
                    .map(|_| ())
            }
            CommandKind::MoveArm => {
                let target = required(kind, resolved)?.vector()?;
                let goal = ArmTrajectoryBuilder::build(&ARM_JOINT_NAMES, target)?;
                self.execute_arm(&goal, limits).await
            }
            CommandKind::PlanArm => {
                let target = required(kind, resolved)?;
                let goal = self.planner.plan_arm(&ARM_JOINT_NAMES, target).await?;
                tracing::info!("Planned arm goal with {} points", goal.points.len());
                Ok(())
            }
            CommandKind::PlanExecArm => {
                let target = required(kind, resolved)?;
                let goal = self.planner.plan_arm(&ARM_JOINT_NAMES, target).await?;
                self.execute_arm(&goal, limits).await
            }
            CommandKind::Other(tag) => Err(SequencerError::InvalidCommandType(tag.clone())),
        }
    }

    async fn execute_arm(&self, goal: &TrajectoryGoal, limits: &Limits) -> Result<()> {
        tracing::debug!("Arm goal: {:?}", goal);
        let result = guarded(
            "arm trajectory",
            self.actuator.execute_arm_trajectory(goal),
            &self.cancel,
            limits.arm,
        )
        .await
        .map_err(|e| match e {
            SequencerError::Timeout(what) => SequencerError::ActuatorTimeout(what),
            other => other,
        })?;
        check_arm_result(goal, &result, limits.joint_tol)
    }
}

fn required<'a>(kind: &CommandKind, resolved: Option<&'a ResolvedSpec>) -> Result<&'a ResolvedSpec> {
    resolved.ok_or_else(|| SequencerError::configuration(format!("{} command needs a spec", kind)))
}

fn check_arm_result(goal: &TrajectoryGoal, result: &ArmMotionResult, tolerance: f64) -> Result<()> {
    if !result.success {
        return Err(SequencerError::actuator_failure(result.message.clone()));
    }
    if let (Some(target), Some(reached)) = (goal.target(), &result.final_positions) {
        if target.len() != reached.len() {
            return Err(SequencerError::actuator_failure(format!(
                "final pose has {} joints, expected {}",
                reached.len(),
                target.len()
            )));
        }
        let distance = euclidean_distance(target, reached);
        if distance > tolerance {
            return Err(SequencerError::actuator_failure(format!(
                "arm stopped {:.4} rad from target (tolerance {})",
                distance, tolerance
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::ArmTrajectoryBuilder;

    #[test]
    fn test_arm_result_checks() {
        let goal = ArmTrajectoryBuilder::build(&ARM_JOINT_NAMES, &[0.0; 5]).unwrap();

        check_arm_result(&goal, &ArmMotionResult::succeeded(None), 0.02).unwrap();
        check_arm_result(
            &goal,
            &ArmMotionResult::succeeded(Some(vec![0.005; 5])),
            0.02,
        )
        .unwrap();

        let err = check_arm_result(&goal, &ArmMotionResult::succeeded(Some(vec![0.1; 5])), 0.02)
            .unwrap_err();
        assert!(matches!(err, SequencerError::ActuatorFailure(_)));

        let err = check_arm_result(&goal, &ArmMotionResult::failed("aborted"), 0.02).unwrap_err();
        assert!(err.to_string().contains("aborted"));
    }

    #[tokio::test]
    async fn test_rerun_needs_reload() {
        let arm = Arc::new(crate::sim::SimulatedArm::new(crate::sim::SimSettings::default()));
        let mut sequencer = ControlLoop::new(
            SequencerConfig::default(),
            arm,
            DependencyGate::new(),
            RunStateGate::new(crate::run_state::RunState::Running),
            CancellationToken::new(),
        );
        let plan = CommandPlan::new(
            crate::positions::PositionTable::new(),
            vec![Command::noop()],
        );
        sequencer.load(plan.clone()).unwrap();
        sequencer.run().await.unwrap();
        assert_eq!(sequencer.state(), LoopState::Completed);

        let err = sequencer.run().await.unwrap_err();
        assert!(err.to_string().contains("sequence is completed"));
        assert!(!err.to_string().contains("empty"));
        assert_eq!(sequencer.state(), LoopState::Completed);

        sequencer.load(plan).unwrap();
        assert_eq!(sequencer.run().await.unwrap().steps.len(), 1);
    }

    #[test]
    fn test_required_spec() {
        assert!(required(&CommandKind::Sleep, None).is_err());
        let spec = ResolvedSpec::Scalar(1.0);
        assert_eq!(required(&CommandKind::Sleep, Some(&spec)).unwrap(), &spec);
    }
}
