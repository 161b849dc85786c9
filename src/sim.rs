//! Simulated arm and gripper.
//!
//! Stands in for the transport and hardware: each gripper publish moves the
//! jaws a bounded step towards the commanded opening, and trajectories
//! complete after their time-from-start, reporting the reached pose.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::actuator::{ActuatorPort, ArmMotionResult, JointPositions, GRIPPER_JOINT_NAMES};
use crate::error::Result;
use crate::feedback::{FeedbackCell, JointStateSample};
use crate::trajectory::{TrajectoryGoal, ARM_JOINT_NAMES};

#[derive(Clone, Debug, PartialEq)]
pub struct SimSettings {
    /// Maximum jaw travel per gripper publish, in meters.
    pub gripper_step: f64,
    /// When false no joint state is ever produced.
    pub feedback_enabled: bool,
    /// Report every trajectory as failed.
    pub reject_trajectories: bool,
    /// Offset added to every reached arm joint, in radians.
    pub arm_error: f64,
    /// Multiplier on waypoint time-from-start (0 completes instantly).
    pub trajectory_time_scale: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            gripper_step: 0.002,
            feedback_enabled: true,
            reject_trajectories: false,
            arm_error: 0.0,
            trajectory_time_scale: 1.0,
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    jaws: [f64; 2],
    arm: [f64; 5],
    gripper_log: Vec<JointPositions>,
    arm_log: Vec<JointPositions>,
    goals: Vec<TrajectoryGoal>,
}

pub struct SimulatedArm {
    settings: SimSettings,
    state: Mutex<SimState>,
    feedback: FeedbackCell,
}

impl SimulatedArm {
    pub fn new(settings: SimSettings) -> Self {
        let arm = Self {
            settings,
            state: Mutex::new(SimState::default()),
            feedback: FeedbackCell::new(),
        };
        arm.publish_state(&arm.lock());
        arm
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Mirrors the joint-state callback of a real transport.
    fn publish_state(&self, state: &SimState) {
        if !self.settings.feedback_enabled {
            return;
        }
        let names: Vec<&str> = ARM_JOINT_NAMES
            .iter()
            .chain(GRIPPER_JOINT_NAMES.iter())
            .copied()
            .collect();
        let positions: Vec<f64> = state.arm.iter().chain(state.jaws.iter()).copied().collect();
        self.feedback
            .update(JointStateSample::new(&names, &positions));
    }

    pub fn gripper_commands(&self) -> Vec<JointPositions> {
        self.lock().gripper_log.clone()
    }

    pub fn arm_commands(&self) -> Vec<JointPositions> {
        self.lock().arm_log.clone()
    }

    pub fn trajectory_goals(&self) -> Vec<TrajectoryGoal> {
        self.lock().goals.clone()
    }

    pub fn jaws(&self) -> [f64; 2] {
        self.lock().jaws
    }

    pub fn arm_pose(&self) -> [f64; 5] {
        self.lock().arm
    }
}

fn step_towards(current: f64, target: f64, step: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= step {
        target
    } else {
        current + step * delta.signum()
    }
}

#[async_trait]
impl ActuatorPort for SimulatedArm {
    fn publish_arm(&self, msg: &JointPositions) -> Result<()> {
        let mut state = self.lock();
        for (joint, value) in state.arm.iter_mut().zip(msg.values()) {
            *joint = value;
        }
        state.arm_log.push(msg.clone());
        self.publish_state(&state);
        Ok(())
    }

    fn publish_gripper(&self, msg: &JointPositions) -> Result<()> {
        let mut state = self.lock();
        let step = self.settings.gripper_step;
        for (jaw, target) in state.jaws.iter_mut().zip(msg.values()) {
            *jaw = step_towards(*jaw, target, step);
        }
        state.gripper_log.push(msg.clone());
        self.publish_state(&state);
        Ok(())
    }

    fn feedback(&self, joints: &[&str]) -> Result<Vec<f64>> {
        self.feedback.positions_for(joints)
    }

    async fn execute_arm_trajectory(&self, goal: &TrajectoryGoal) -> Result<ArmMotionResult> {
        self.lock().goals.push(goal.clone());
        if self.settings.reject_trajectories {
            return Ok(ArmMotionResult::failed("trajectory rejected by controller"));
        }

        for point in &goal.points {
            let wait = point.time_from_start.mul_f64(self.settings.trajectory_time_scale);
            tokio::time::sleep(wait).await;
        }

        let mut state = self.lock();
        if let Some(target) = goal.target() {
            for (joint, value) in state.arm.iter_mut().zip(target) {
                *joint = value + self.settings.arm_error;
            }
        }
        let reached = state.arm.to_vec();
        self.publish_state(&state);
        Ok(ArmMotionResult::succeeded(Some(reached)))
    }
}
