//! Named joint-space setpoints.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SequencerError};

/// Mapping from symbolic name to setpoint vector. Read-only during a run.
///
/// In JSON an entry may be an array or a bare number; a bare number is
/// stored as a one-element vector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionTable {
    #[serde(deserialize_with = "deserialize_entries")]
    entries: HashMap<String, Vec<f64>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Entry {
    Scalar(f64),
    Vector(Vec<f64>),
}

fn deserialize_entries<'de, D>(de: D) -> std::result::Result<HashMap<String, Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: HashMap<String, Entry> = HashMap::deserialize(de)?;
    Ok(raw
        .into_iter()
        .map(|(name, entry)| {
            let values = match entry {
                Entry::Scalar(v) => vec![v],
                Entry::Vector(v) => v,
            };
            (name, values)
        })
        .collect())
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, name: &str, values: Vec<f64>) {
        self.entries.insert(name.to_string(), values);
    }

    pub fn with(mut self, name: &str, values: Vec<f64>) -> Self {
        self.insert(name, values);
        self
    }

    /// Look up a setpoint by name.
    pub fn get(&self, name: &str) -> Result<&[f64]> {
        self.entries
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| SequencerError::UnknownPositionName(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Vec<f64>)> for PositionTable {
    fn from_iter<I: IntoIterator<Item = (String, Vec<f64>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let table = PositionTable::new().with("home", vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(table.get("home").unwrap(), &[0.1, 0.2, 0.3, 0.4, 0.5]);
        assert!(matches!(
            table.get("away"),
            Err(SequencerError::UnknownPositionName(name)) if name == "away"
        ));
    }

    #[test]
    fn test_parse_scalars_and_vectors() {
        let table: PositionTable =
            serde_json::from_str(r#"{"open": 0.02, "candle": [2.9, 1.1, -2.5, 1.7, 2.9]}"#).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("open").unwrap(), &[0.02]);
        assert_eq!(table.get("candle").unwrap().len(), 5);
    }
}
