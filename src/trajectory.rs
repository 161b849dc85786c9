//! Single-waypoint arm trajectory goals.

use std::time::Duration;

use crate::error::{Result, SequencerError};

/// Joint names of the 5-DOF arm, in command order.
pub const ARM_JOINT_NAMES: [&str; 5] = [
    "arm_joint_1",
    "arm_joint_2",
    "arm_joint_3",
    "arm_joint_4",
    "arm_joint_5",
];

/// Settling margin for the joint trajectory controller.
pub const WAYPOINT_TIME_FROM_START: Duration = Duration::from_millis(500);

#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryPoint {
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
    pub time_from_start: Duration,
}

/// Goal handed to the arm execution capability.
#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryGoal {
    pub joint_names: Vec<String>,
    pub points: Vec<TrajectoryPoint>,
}

impl TrajectoryGoal {
    /// Positions of the last waypoint.
    pub fn target(&self) -> Option<&[f64]> {
        self.points.last().map(|p| p.positions.as_slice())
    }
}

pub struct ArmTrajectoryBuilder;

impl ArmTrajectoryBuilder {
    /// One waypoint at `target`, zero velocities, reached at
    /// [`WAYPOINT_TIME_FROM_START`].
    pub fn build(joint_names: &[&str], target: &[f64]) -> Result<TrajectoryGoal> {
        if joint_names.len() != target.len() {
            return Err(SequencerError::configuration(format!(
                "arm target has {} values for {} joints",
                target.len(),
                joint_names.len()
            )));
        }
        Ok(TrajectoryGoal {
            joint_names: joint_names.iter().map(|s| s.to_string()).collect(),
            points: vec![TrajectoryPoint {
                positions: target.to_vec(),
                velocities: vec![0.0; target.len()],
                time_from_start: WAYPOINT_TIME_FROM_START,
            }],
        })
    }
}
