//! Turns a command's raw spec into a concrete value.

use std::fmt;

use crate::command::CommandSpec;
use crate::error::{Result, SequencerError};
use crate::positions::PositionTable;

/// A resolved spec: a scalar for `sleep`, a vector for motion commands.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedSpec {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl ResolvedSpec {
    fn shape(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Vector(_) => "vector",
        }
    }

    /// Scalar value; a one-element vector counts as a scalar.
    pub fn scalar(&self) -> Result<f64> {
        match self {
            Self::Scalar(v) => Ok(*v),
            Self::Vector(v) if v.len() == 1 => Ok(v[0]),
            other => Err(SequencerError::SpecMismatch {
                expected: "scalar",
                got: other.shape(),
            }),
        }
    }

    pub fn vector(&self) -> Result<&[f64]> {
        match self {
            Self::Vector(v) => Ok(v),
            other => Err(SequencerError::SpecMismatch {
                expected: "vector",
                got: other.shape(),
            }),
        }
    }

    /// Total gripper opening in meters.
    ///
    /// A scalar or one-element entry is the opening itself; a two-element
    /// entry is a left/right jaw pair and is summed.
    pub fn gripper_opening(&self) -> Result<f64> {
        match self {
            Self::Vector(v) if v.len() == 2 => Ok(v[0] + v[1]),
            other => other.scalar(),
        }
    }
}

impl fmt::Display for ResolvedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{}", v),
            Self::Vector(v) => write!(f, "{:?}", v),
        }
    }
}

/// Resolves specs against a position table. No side effects.
#[derive(Clone, Copy, Debug)]
pub struct CommandSpecResolver<'a> {
    positions: &'a PositionTable,
}

impl<'a> CommandSpecResolver<'a> {
    pub fn new(positions: &'a PositionTable) -> Self {
        Self { positions }
    }

    /// Numeric literals (including finite numeric strings) become scalars;
    /// anything else, `"inf"` and `"nan"` included, is looked up by name.
    pub fn resolve(&self, spec: &CommandSpec) -> Result<ResolvedSpec> {
        match spec {
            CommandSpec::Number(v) => Ok(ResolvedSpec::Scalar(*v)),
            CommandSpec::Name(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(ResolvedSpec::Scalar(v)),
                _ => Ok(ResolvedSpec::Vector(self.positions.get(s)?.to_vec())),
            },
        }
    }
}
