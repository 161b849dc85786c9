//! Actuator interface: joint position commands, feedback, and blocking arm
//! trajectory execution.
//!
//! The transport that actually carries these messages lives outside this
//! crate. [`ChannelActuator`] is the seam a transport plugs into: commands
//! come out of mpsc channels and joint states go into a [`FeedbackCell`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, SequencerError};
use crate::feedback::FeedbackCell;
use crate::trajectory::{TrajectoryGoal, ARM_JOINT_NAMES};

/// Gripper jaw joint names (left, right).
pub const GRIPPER_JOINT_NAMES: [&str; 2] = ["gripper_finger_joint_l", "gripper_finger_joint_r"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum JointUnit {
    #[serde(rename = "rad")]
    Radian,
    #[serde(rename = "m")]
    Length,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JointValue {
    pub joint_uri: String,
    pub unit: JointUnit,
    pub value: f64,
}

/// A joint position command message.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct JointPositions {
    pub positions: Vec<JointValue>,
}

impl JointPositions {
    /// Arm command in radians, one value per arm joint. `move_arm` goes
    /// through trajectories; this is for transports and direct-command callers.
    pub fn arm(positions: &[f64]) -> Result<Self> {
        if positions.len() != ARM_JOINT_NAMES.len() {
            return Err(SequencerError::configuration(format!(
                "arm command needs {} joints, got {}",
                ARM_JOINT_NAMES.len(),
                positions.len()
            )));
        }
        Ok(Self {
            positions: ARM_JOINT_NAMES
                .iter()
                .zip(positions)
                .map(|(name, value)| JointValue {
                    joint_uri: name.to_string(),
                    unit: JointUnit::Radian,
                    value: *value,
                })
                .collect(),
        })
    }

    /// Gripper command: the opening is split evenly across both jaws.
    pub fn gripper(opening_m: f64) -> Self {
        let half = opening_m / 2.0;
        Self {
            positions: GRIPPER_JOINT_NAMES
                .iter()
                .map(|name| JointValue {
                    joint_uri: name.to_string(),
                    unit: JointUnit::Length,
                    value: half,
                })
                .collect(),
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.positions.iter().map(|p| p.value).collect()
    }

    pub fn joint_names(&self) -> Vec<&str> {
        self.positions.iter().map(|p| p.joint_uri.as_str()).collect()
    }
}

/// Terminal status of an arm trajectory execution.
#[derive(Clone, Debug, PartialEq)]
pub struct ArmMotionResult {
    pub success: bool,
    /// Measured final joint positions, if the executor reports them.
    pub final_positions: Option<Vec<f64>>,
    pub message: String,
}

impl ArmMotionResult {
    pub fn succeeded(final_positions: Option<Vec<f64>>) -> Self {
        Self {
            success: true,
            final_positions,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            final_positions: None,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ActuatorPort: Send + Sync {
    /// Publish an arm joint position command. Not used by the sequencer,
    /// which moves the arm with [`ActuatorPort::execute_arm_trajectory`].
    fn publish_arm(&self, msg: &JointPositions) -> Result<()>;

    /// Publish a gripper joint position command.
    fn publish_gripper(&self, msg: &JointPositions) -> Result<()>;

    /// Latest measured positions of the named joints.
    fn feedback(&self, joints: &[&str]) -> Result<Vec<f64>>;

    /// Execute a trajectory and wait for its terminal status.
    async fn execute_arm_trajectory(&self, goal: &TrajectoryGoal) -> Result<ArmMotionResult>;
}

/// A trajectory execution request with its reply slot.
#[derive(Debug)]
pub struct ArmRequest {
    pub goal: TrajectoryGoal,
    pub reply: oneshot::Sender<ArmMotionResult>,
}

/// Receiving ends of a [`ChannelActuator`], held by the transport.
#[derive(Debug)]
pub struct ChannelActuatorHandles {
    pub arm_rx: mpsc::Receiver<JointPositions>,
    pub gripper_rx: mpsc::Receiver<JointPositions>,
    pub trajectory_rx: mpsc::Receiver<ArmRequest>,
    pub feedback: Arc<FeedbackCell>,
}

/// [`ActuatorPort`] backed by channels.
pub struct ChannelActuator {
    arm_tx: mpsc::Sender<JointPositions>,
    gripper_tx: mpsc::Sender<JointPositions>,
    trajectory_tx: mpsc::Sender<ArmRequest>,
    feedback: Arc<FeedbackCell>,
}

impl ChannelActuator {
    pub fn new(capacity: usize) -> (Self, ChannelActuatorHandles) {
        let (arm_tx, arm_rx) = mpsc::channel(capacity);
        let (gripper_tx, gripper_rx) = mpsc::channel(capacity);
        let (trajectory_tx, trajectory_rx) = mpsc::channel(1);
        let feedback = Arc::new(FeedbackCell::new());
        (
            Self {
                arm_tx,
                gripper_tx,
                trajectory_tx,
                feedback: Arc::clone(&feedback),
            },
            ChannelActuatorHandles {
                arm_rx,
                gripper_rx,
                trajectory_rx,
                feedback,
            },
        )
    }

    // Position commands are re-sent by the caller, so a full queue drops
    // the newest message instead of blocking the sequence.
    fn publish(tx: &mpsc::Sender<JointPositions>, msg: &JointPositions, what: &str) -> Result<()> {
        match tx.try_send(msg.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("{} command queue full, dropping command", what);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SequencerError::actuator_failure(
                format!("{} command channel closed", what),
            )),
        }
    }
}

#[async_trait]
impl ActuatorPort for ChannelActuator {
    fn publish_arm(&self, msg: &JointPositions) -> Result<()> {
        Self::publish(&self.arm_tx, msg, "arm")
    }

    fn publish_gripper(&self, msg: &JointPositions) -> Result<()> {
        Self::publish(&self.gripper_tx, msg, "gripper")
    }

    fn feedback(&self, joints: &[&str]) -> Result<Vec<f64>> {
        self.feedback.positions_for(joints)
    }

    async fn execute_arm_trajectory(&self, goal: &TrajectoryGoal) -> Result<ArmMotionResult> {
        let (reply, rx) = oneshot::channel();
        self.trajectory_tx
            .send(ArmRequest {
                goal: goal.clone(),
                reply,
            })
            .await
            .map_err(|_| SequencerError::actuator_failure("trajectory executor is gone"))?;
        rx.await
            .map_err(|_| SequencerError::actuator_failure("trajectory executor dropped the goal"))
    }
}
