//! Sequencer parameters.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "arm_num": 2, "gripper_distance_tol": 0.0005, "depend_timeout_secs": 30 }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SequencerError};
use crate::gripper::GripperSettings;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Arm instance index, used in actuator topic names.
    pub arm_num: u32,
    /// Gripper convergence tolerance in meters.
    pub gripper_distance_tol: f64,
    /// Arm pose tolerance in radians.
    pub joint_distance_tol: f64,
    /// Joint-state feedback topic.
    pub joint_states_topic: String,
    /// Gripper publish/sample rate.
    pub gripper_poll_hz: f64,
    pub run_state_timeout_secs: Option<f64>,
    pub depend_timeout_secs: Option<f64>,
    pub gripper_timeout_secs: Option<f64>,
    pub arm_timeout_secs: Option<f64>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            arm_num: 1,
            gripper_distance_tol: 0.001,
            joint_distance_tol: 0.02,
            joint_states_topic: "joint_states".to_string(),
            gripper_poll_hz: 10.0,
            run_state_timeout_secs: None,
            depend_timeout_secs: None,
            gripper_timeout_secs: None,
            arm_timeout_secs: None,
        }
    }
}

fn seconds(field: &str, value: Option<f64>) -> Result<Option<Duration>> {
    value
        .map(|s| {
            Duration::try_from_secs_f64(s).map_err(|_| {
                SequencerError::configuration(format!("{} must be a non-negative number, got {}", field, s))
            })
        })
        .transpose()
}

impl SequencerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded config from {}", path.display());
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("gripper_distance_tol", self.gripper_distance_tol),
            ("joint_distance_tol", self.joint_distance_tol),
            ("gripper_poll_hz", self.gripper_poll_hz),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SequencerError::configuration(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        self.run_state_timeout()?;
        self.depend_timeout()?;
        self.gripper_timeout()?;
        self.arm_timeout()?;
        Ok(())
    }

    pub fn arm_topic(&self) -> String {
        format!("arm_{}/arm_controller/position_command", self.arm_num)
    }

    pub fn gripper_topic(&self) -> String {
        format!("arm_{}/gripper_controller/position_command", self.arm_num)
    }

    pub fn run_state_timeout(&self) -> Result<Option<Duration>> {
        seconds("run_state_timeout_secs", self.run_state_timeout_secs)
    }

    pub fn depend_timeout(&self) -> Result<Option<Duration>> {
        seconds("depend_timeout_secs", self.depend_timeout_secs)
    }

    pub fn gripper_timeout(&self) -> Result<Option<Duration>> {
        seconds("gripper_timeout_secs", self.gripper_timeout_secs)
    }

    pub fn arm_timeout(&self) -> Result<Option<Duration>> {
        seconds("arm_timeout_secs", self.arm_timeout_secs)
    }

    pub fn gripper_settings(&self) -> Result<GripperSettings> {
        Ok(GripperSettings {
            tolerance: self.gripper_distance_tol,
            period: Duration::from_secs_f64(1.0 / self.gripper_poll_hz),
            timeout: self.gripper_timeout()?,
        })
    }
}
