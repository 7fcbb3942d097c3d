//! Angle results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Angles computed for one person in one frame (name -> degrees).
///
/// Angles that could not be evaluated are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AngleResult {
    angles: BTreeMap<String, f64>,
}

impl AngleResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, degrees: f64) {
        self.angles.insert(name.into(), degrees);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.angles.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.angles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.angles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.angles.iter().map(|(n, v)| (n.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for AngleResult {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            angles: iter.into_iter().collect(),
        }
    }
}

/// Running range of one angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    /// Range seeded by a single observation
    pub fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Widen with another observation
    pub fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// max - min
    pub fn rom(&self) -> f64 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_widens_monotonically() {
        let mut range = AngleRange::new(10.0);
        range.update(5.0);
        range.update(7.0);
        range.update(30.0);
        assert_eq!(range.min, 5.0);
        assert_eq!(range.max, 30.0);
        assert_eq!(range.rom(), 25.0);
    }

    #[test]
    fn angle_result_serializes_as_plain_map() {
        let result: AngleResult = [("trunk".to_string(), 12.5)].into_iter().collect();
        assert_eq!(serde_json::to_string(&result).unwrap(), r#"{"trunk":12.5}"#);
    }
}
