//! Latest joint-state feedback, shared between the transport callback and
//! the sequencer.
//!
//! Writers replace the whole sample under a lock, so readers never see a
//! partially-updated vector.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Result, SequencerError};

/// One joint-state message: parallel name and position arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JointStateSample {
    pub names: Vec<String>,
    pub positions: Vec<f64>,
}

impl JointStateSample {
    pub fn new(names: &[&str], positions: &[f64]) -> Self {
        Self {
            names: names.iter().map(|s| s.to_string()).collect(),
            positions: positions.to_vec(),
        }
    }

    pub fn position(&self, joint: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == joint)
            .and_then(|i| self.positions.get(i).copied())
    }
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Sample(Arc<JointStateSample>),
    Malformed(String),
}

#[derive(Debug, Default)]
pub struct FeedbackCell {
    slot: Mutex<Slot>,
}

impl FeedbackCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new sample. A malformed sample replaces the previous one and
    /// is reported to the next reader.
    pub fn update(&self, sample: JointStateSample) {
        let slot = if sample.names.len() != sample.positions.len() {
            let reason = format!(
                "malformed joint state: {} names, {} positions",
                sample.names.len(),
                sample.positions.len()
            );
            tracing::warn!("{}", reason);
            Slot::Malformed(reason)
        } else {
            Slot::Sample(Arc::new(sample))
        };
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = slot;
    }

    /// Record a delivery failure from the transport.
    pub fn mark_unavailable(&self, reason: impl Into<String>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Slot::Malformed(reason.into());
    }

    pub fn latest(&self) -> Result<Arc<JointStateSample>> {
        match &*self.slot.lock().unwrap_or_else(PoisonError::into_inner) {
            Slot::Empty => Err(SequencerError::feedback_unavailable("no joint state received")),
            Slot::Sample(s) => Ok(Arc::clone(s)),
            Slot::Malformed(reason) => Err(SequencerError::feedback_unavailable(reason.clone())),
        }
    }

    /// Positions of the named joints, in the order given.
    pub fn positions_for(&self, joints: &[&str]) -> Result<Vec<f64>> {
        let sample = self.latest()?;
        joints
            .iter()
            .map(|joint| {
                sample.position(joint).ok_or_else(|| {
                    SequencerError::feedback_unavailable(format!("no feedback for joint {}", joint))
                })
            })
            .collect()
    }
}

/// Euclidean distance between two vectors of equal length. Callers check
/// the lengths; extra elements of the longer vector are ignored.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
