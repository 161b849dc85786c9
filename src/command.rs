//! Command records as loaded from a plan.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Command type tag.
///
/// Unknown tags are kept as [`CommandKind::Other`] so a plan still loads and
/// the sequencer fails at the offending command instead of at parse time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandKind {
    Noop,
    Sleep,
    MoveGripper,
    MoveArm,
    PlanArm,
    PlanExecArm,
    Other(String),
}

impl CommandKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Noop => "noop",
            Self::Sleep => "sleep",
            Self::MoveGripper => "move_gripper",
            Self::MoveArm => "move_arm",
            Self::PlanArm => "plan_arm",
            Self::PlanExecArm => "plan_exec_arm",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for CommandKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "noop" => Self::Noop,
            "sleep" => Self::Sleep,
            "move_gripper" => Self::MoveGripper,
            "move_arm" => Self::MoveArm,
            "plan_arm" => Self::PlanArm,
            "plan_exec_arm" => Self::PlanExecArm,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for CommandKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<CommandKind> for String {
    fn from(kind: CommandKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw spec field: a numeric literal or a position-table name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Number(f64),
    Name(String),
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", v),
            Self::Name(s) => write!(f, "{:?}", s),
        }
    }
}

/// When a dependency op is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependKind {
    /// Block before dispatch until the flag is set.
    Wait,
    /// Raise the flag after dispatch.
    Set,
    /// Lower the flag after dispatch (after all sets).
    Clear,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyOp {
    pub kind: DependKind,
    pub name: String,
}

impl DependencyOp {
    pub fn wait(name: &str) -> Self {
        Self {
            kind: DependKind::Wait,
            name: name.to_string(),
        }
    }

    pub fn set(name: &str) -> Self {
        Self {
            kind: DependKind::Set,
            name: name.to_string(),
        }
    }

    pub fn clear(name: &str) -> Self {
        Self {
            kind: DependKind::Clear,
            name: name.to_string(),
        }
    }
}

/// One entry of the command list. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<DependencyOp>,
}

impl Command {
    pub fn new(kind: impl Into<CommandKind>) -> Self {
        Self {
            kind: kind.into(),
            spec: None,
            depends: Vec::new(),
        }
    }

    pub fn noop() -> Self {
        Self::new(CommandKind::Noop)
    }

    pub fn sleep(seconds: f64) -> Self {
        Self::new(CommandKind::Sleep).with_spec(CommandSpec::Number(seconds))
    }

    pub fn move_gripper(spec: CommandSpec) -> Self {
        Self::new(CommandKind::MoveGripper).with_spec(spec)
    }

    pub fn move_arm(position: &str) -> Self {
        Self::new(CommandKind::MoveArm).with_spec(CommandSpec::Name(position.to_string()))
    }

    pub fn with_spec(mut self, spec: CommandSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn with_depend(mut self, op: DependencyOp) -> Self {
        self.depends.push(op);
        self
    }

    /// Names of all ops of the given kind, in declaration order.
    pub fn depends_of(&self, kind: DependKind) -> Vec<&str> {
        self.depends
            .iter()
            .filter(|op| op.kind == kind)
            .map(|op| op.name.as_str())
            .collect()
    }

    /// Spec rendered for logs and error messages.
    pub fn spec_label(&self) -> String {
        self.spec
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_record() {
        let json = r#"{
            "type": "move_arm",
            "spec": "home",
            "depends": [
                {"kind": "wait", "name": "gripper_open"},
                {"kind": "set", "name": "arm_home"},
                {"kind": "clear", "name": "gripper_open"}
            ]
        }"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.kind, CommandKind::MoveArm);
        assert_eq!(cmd.spec, Some(CommandSpec::Name("home".to_string())));
        assert_eq!(cmd.depends_of(DependKind::Wait), vec!["gripper_open"]);
        assert_eq!(cmd.depends_of(DependKind::Set), vec!["arm_home"]);
        assert_eq!(cmd.depends_of(DependKind::Clear), vec!["gripper_open"]);
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        let cmd: Command = serde_json::from_str(r#"{"type": "bogus"}"#).unwrap();
        assert_eq!(cmd.kind, CommandKind::Other("bogus".to_string()));
        assert_eq!(cmd.kind.to_string(), "bogus");
        assert!(cmd.spec.is_none());
        assert!(cmd.depends.is_empty());
    }

    #[test]
    fn test_numeric_spec() {
        let cmd: Command = serde_json::from_str(r#"{"type": "sleep", "spec": 0.5}"#).unwrap();
        assert_eq!(cmd.spec, Some(CommandSpec::Number(0.5)));
        assert_eq!(cmd.spec_label(), "0.5");
    }

    #[test]
    fn test_kind_serializes_as_tag() {
        let json = serde_json::to_string(&Command::noop()).unwrap();
        assert_eq!(json, r#"{"type":"noop"}"#);
    }
}
