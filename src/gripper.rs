//! Closed-loop gripper motion.
//!
//! The target is re-published at a fixed rate and the jaw feedback sampled
//! after each publish, until the Euclidean distance between target and
//! measurement drops below tolerance. There is no implicit timeout; the loop
//! ends on convergence, cancellation, or an explicitly configured deadline.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::actuator::{ActuatorPort, JointPositions, GRIPPER_JOINT_NAMES};
use crate::error::{Result, SequencerError};
use crate::feedback::euclidean_distance;
use crate::wait::guarded;

/// Maximum total jaw opening (23 mm).
pub const MAX_GRIPPER_OPENING: f64 = 0.023;

#[derive(Clone, Debug, PartialEq)]
pub struct GripperSettings {
    /// Convergence threshold in meters.
    pub tolerance: f64,
    /// Publish/sample period.
    pub period: Duration,
    /// Deadline for convergence. `None` waits until cancelled.
    pub timeout: Option<Duration>,
}

impl Default for GripperSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.001,
            period: Duration::from_millis(100),
            timeout: None,
        }
    }
}

/// Result of a converged gripper move.
#[derive(Clone, Debug, PartialEq)]
pub struct GripperOutcome {
    /// Number of publish/sample cycles.
    pub polls: usize,
    /// Final target-to-feedback distance.
    pub distance: f64,
}

pub struct ClosedLoopController<'a> {
    actuator: &'a dyn ActuatorPort,
    settings: &'a GripperSettings,
    cancel: &'a CancellationToken,
}

impl<'a> ClosedLoopController<'a> {
    pub fn new(
        actuator: &'a dyn ActuatorPort,
        settings: &'a GripperSettings,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            actuator,
            settings,
            cancel,
        }
    }

    /// Drive the jaws to `opening_m` total opening.
    pub async fn move_gripper(&self, opening_m: f64) -> Result<GripperOutcome> {
        if !(0.0..=MAX_GRIPPER_OPENING).contains(&opening_m) {
            return Err(SequencerError::OutOfRangeTarget {
                value: opening_m,
                max: MAX_GRIPPER_OPENING,
            });
        }

        let msg = JointPositions::gripper(opening_m);
        let target = msg.values();
        tracing::debug!("Gripper target {:?}", target);

        guarded(
            "gripper convergence",
            self.converge(&msg, &target),
            self.cancel,
            self.settings.timeout,
        )
        .await
    }

    async fn converge(&self, msg: &JointPositions, target: &[f64]) -> Result<GripperOutcome> {
        let mut tick = tokio::time::interval(self.settings.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut polls = 0usize;

        loop {
            tick.tick().await;
            polls += 1;
            self.actuator.publish_gripper(msg)?;

            match self.actuator.feedback(&GRIPPER_JOINT_NAMES) {
                Ok(measured) if measured.len() != target.len() => {
                    tracing::warn!(
                        "Gripper poll {}: feedback has {} values, expected {}",
                        polls,
                        measured.len(),
                        target.len()
                    );
                }
                Ok(measured) => {
                    let distance = euclidean_distance(target, &measured);
                    tracing::debug!("Gripper poll {}: distance {:.5} m", polls, distance);
                    if distance < self.settings.tolerance {
                        tracing::info!("Gripper converged after {} polls", polls);
                        return Ok(GripperOutcome { polls, distance });
                    }
                }
                Err(SequencerError::FeedbackUnavailable(reason)) => {
                    tracing::warn!("Gripper poll {}: feedback unavailable: {}", polls, reason);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
