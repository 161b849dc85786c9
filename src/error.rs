//! Error types for command sequencing.

use thiserror::Error;

use crate::command::CommandKind;

/// Errors that can occur while loading or running a command sequence.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// The command list is empty/missing or a parameter is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A symbolic spec has no entry in the position table.
    #[error("unknown position name: {0}")]
    UnknownPositionName(String),

    /// Unrecognised command tag.
    #[error("invalid command type: {0}")]
    InvalidCommandType(String),

    /// Recognised command that has no implementation.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Gripper opening outside the physical limit.
    #[error("gripper opening out of range: {value} m (allowed 0..={max} m)")]
    OutOfRangeTarget { value: f64, max: f64 },

    /// Spec resolved to the wrong shape for the command.
    #[error("spec mismatch: expected {expected}, got {got}")]
    SpecMismatch {
        expected: &'static str,
        got: &'static str,
    },

    /// External motion execution did not finish in time.
    #[error("actuator timeout: {0}")]
    ActuatorTimeout(String),

    /// External motion execution reported failure.
    #[error("actuator failure: {0}")]
    ActuatorFailure(String),

    /// No usable joint-state sample is available.
    #[error("feedback unavailable: {0}")]
    FeedbackUnavailable(String),

    /// A bounded wait ran out of time.
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// The shutdown token fired while waiting.
    #[error("cancelled")]
    Cancelled,

    /// A command failed; wraps the cause with the offending command.
    #[error("command #{index} ({kind}, spec {spec}) failed: {source}")]
    CommandFailed {
        index: usize,
        kind: CommandKind,
        spec: String,
        #[source]
        source: Box<SequencerError>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SequencerError {
    /// Create a Configuration error with a message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an ActuatorFailure error with a message.
    pub fn actuator_failure(msg: impl Into<String>) -> Self {
        Self::ActuatorFailure(msg.into())
    }

    /// Create a FeedbackUnavailable error with a message.
    pub fn feedback_unavailable(msg: impl Into<String>) -> Self {
        Self::FeedbackUnavailable(msg.into())
    }

    /// The underlying cause, looking through `CommandFailed`.
    pub fn root(&self) -> &SequencerError {
        match self {
            Self::CommandFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SequencerError>;
