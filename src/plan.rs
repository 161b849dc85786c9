//! Command plans: a position table plus an ordered command list.
//!
//! ```json
//! {
//!   "positions": { "home": [0, 0, 0, 0, 0], "open": 0.02 },
//!   "commands": [
//!     { "type": "move_gripper", "spec": "open", "depends": [{ "kind": "set", "name": "ready" }] },
//!     { "type": "sleep", "spec": 0.5 }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{Result, SequencerError};
use crate::positions::PositionTable;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandPlan {
    #[serde(default)]
    pub positions: PositionTable,
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl CommandPlan {
    pub fn new(positions: PositionTable, commands: Vec<Command>) -> Self {
        Self {
            positions,
            commands,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let plan = Self::from_json(&content)?;
        tracing::info!(
            "Loaded plan {}: {} commands, {} positions",
            path.display(),
            plan.commands.len(),
            plan.positions.len()
        );
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.commands.is_empty() {
            return Err(SequencerError::configuration(
                "command list is empty; was the control plan loaded?",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandKind, DependKind};

    const PLAN: &str = r#"{
        "positions": {"home": [0, 0, 0, 0, 0], "open": 0.02},
        "commands": [
            {"type": "move_gripper", "spec": "open", "depends": [{"kind": "set", "name": "ready"}]},
            {"type": "sleep", "spec": 0.5},
            {"type": "move_arm", "spec": "home", "depends": [{"kind": "wait", "name": "ready"}]}
        ]
    }"#;

    #[test]
    fn test_parse_plan() {
        let plan = CommandPlan::from_json(PLAN).unwrap();
        plan.validate().unwrap();
        assert_eq!(plan.commands.len(), 3);
        assert_eq!(plan.commands[2].kind, CommandKind::MoveArm);
        assert_eq!(plan.commands[2].depends_of(DependKind::Wait), vec!["ready"]);
        assert_eq!(plan.positions.get("open").unwrap(), &[0.02]);
    }

    #[test]
    fn test_empty_plan_is_invalid() {
        let plan = CommandPlan::from_json(r#"{"positions": {}}"#).unwrap();
        assert!(matches!(
            plan.validate(),
            Err(SequencerError::Configuration(_))
        ));
    }

    #[test]
    fn test_malformed_plan() {
        assert!(matches!(
            CommandPlan::from_json(r#"{"commands": [{"spec": 1}]}"#),
            Err(SequencerError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            CommandPlan::load("/nonexistent/plan.json"),
            Err(SequencerError::Io(_))
        ));
    }
}
