//! Motion planning capability.

use async_trait::async_trait;

use crate::error::{Result, SequencerError};
use crate::resolver::ResolvedSpec;
use crate::trajectory::TrajectoryGoal;

#[async_trait]
pub trait PlannerPort: Send + Sync {
    /// Plan a trajectory for the named joints towards `target`.
    async fn plan_arm(&self, joint_names: &[&str], target: &ResolvedSpec) -> Result<TrajectoryGoal>;
}

/// The default planner: every request is an explicit `NotImplemented`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedPlanner;

#[async_trait]
impl PlannerPort for UnsupportedPlanner {
    async fn plan_arm(&self, _joint_names: &[&str], target: &ResolvedSpec) -> Result<TrajectoryGoal> {
        Err(SequencerError::NotImplemented(format!(
            "arm planning (target {})",
            target
        )))
    }
}
