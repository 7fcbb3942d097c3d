//! Keypoint data - pose detector output
//!
//! Detector output is index-addressed (`[people][landmarks]`); the angle
//! pipeline works on name-addressed [`KeypointSet`]s built through a
//! [`BodyModel`](crate::BodyModel).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Planar image-space point (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A single defined landmark: position plus detector confidence in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub position: Point2,
    pub score: f64,
}

impl Keypoint {
    pub const fn new(x: f64, y: f64, score: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            score,
        }
    }
}

/// One detected person, indexed by detector landmark index.
///
/// `None` marks a landmark the detector did not produce (NaN coordinates or
/// a missing score).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonKeypoints {
    pub keypoints: Vec<Option<Keypoint>>,
}

impl PersonKeypoints {
    pub fn new(keypoints: Vec<Option<Keypoint>>) -> Self {
        Self { keypoints }
    }

    /// Build from raw detector arrays.
    ///
    /// Without scores every produced landmark is fully trusted (score 1.0).
    pub fn from_arrays(coords: &[Option<[f64; 2]>], scores: Option<&[Option<f64>]>) -> Self {
        let keypoints = coords
            .iter()
            .enumerate()
            .map(|(idx, coord)| {
                let [x, y] = (*coord)?;
                let score = match scores {
                    Some(scores) => scores.get(idx).copied().flatten()?,
                    None => 1.0,
                };
                if !x.is_finite() || !y.is_finite() || !score.is_finite() {
                    return None;
                }
                Some(Keypoint::new(x, y, score))
            })
            .collect();
        Self { keypoints }
    }

    /// Landmark count (defined or not)
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index).and_then(Option::as_ref)
    }

    /// Number of defined landmarks
    pub fn defined_count(&self) -> usize {
        self.keypoints.iter().filter(|k| k.is_some()).count()
    }

    /// Raw coordinate array (undefined -> `None`)
    pub fn coords(&self) -> Vec<Option<[f64; 2]>> {
        self.keypoints
            .iter()
            .map(|k| k.map(|k| [k.position.x, k.position.y]))
            .collect()
    }

    /// Raw score array (undefined -> `None`)
    pub fn scores(&self) -> Vec<Option<f64>> {
        self.keypoints.iter().map(|k| k.map(|k| k.score)).collect()
    }
}

/// All people detected in one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDetections", into = "RawDetections")]
pub struct PoseDetections {
    pub people: Vec<PersonKeypoints>,
}

impl PoseDetections {
    pub fn new(people: Vec<PersonKeypoints>) -> Self {
        Self { people }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from detector arrays `[P][K][2]` and optional `[P][K]` scores
    pub fn from_arrays(
        coords: &[Vec<Option<[f64; 2]>>],
        scores: Option<&[Vec<Option<f64>>]>,
    ) -> Self {
        let people = coords
            .iter()
            .enumerate()
            .map(|(p, person)| {
                let person_scores = scores.map(|s| s.get(p).map(Vec::as_slice).unwrap_or(&[]));
                PersonKeypoints::from_arrays(person, person_scores)
            })
            .collect();
        Self { people }
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}

/// Wire form of detector output, as recorded in replay files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDetections {
    /// `[people][landmarks]` of `[x, y]`, `null` for undefined
    pub keypoints: Vec<Vec<Option<[f64; 2]>>>,
    /// `[people][landmarks]` confidence, `null` for undefined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<Vec<Option<f64>>>>,
}

impl From<RawDetections> for PoseDetections {
    fn from(raw: RawDetections) -> Self {
        PoseDetections::from_arrays(&raw.keypoints, raw.scores.as_deref())
    }
}

impl From<PoseDetections> for RawDetections {
    fn from(detections: PoseDetections) -> Self {
        RawDetections {
            keypoints: detections.people.iter().map(PersonKeypoints::coords).collect(),
            scores: Some(detections.people.iter().map(PersonKeypoints::scores).collect()),
        }
    }
}

/// Name-addressed landmarks for one person in one frame.
///
/// A key present with `None` is a landmark of the active model that is
/// currently undefined; an absent key is not part of the model at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeypointSet {
    landmarks: BTreeMap<String, Option<Keypoint>>,
}

impl KeypointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a landmark
    pub fn insert(&mut self, name: impl Into<String>, keypoint: Option<Keypoint>) {
        self.landmarks.insert(name.into(), keypoint);
    }

    /// Whether the landmark belongs to the set (defined or not)
    pub fn contains(&self, name: &str) -> bool {
        self.landmarks.contains_key(name)
    }

    /// Defined keypoint by name
    pub fn get(&self, name: &str) -> Option<&Keypoint> {
        self.landmarks.get(name).and_then(Option::as_ref)
    }

    /// Defined position by name
    pub fn point(&self, name: &str) -> Option<Point2> {
        self.get(name).map(|k| k.position)
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Iterate over all landmarks in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Keypoint>)> {
        self.landmarks.iter().map(|(n, k)| (n.as_str(), k.as_ref()))
    }

    /// Iterate over defined landmarks only
    pub fn defined(&self) -> impl Iterator<Item = (&str, &Keypoint)> {
        self.landmarks
            .iter()
            .filter_map(|(n, k)| k.as_ref().map(|k| (n.as_str(), k)))
    }

    /// Copy with every landmark scoring below `threshold` marked undefined
    pub fn masked(&self, threshold: f64) -> KeypointSet {
        let landmarks = self
            .landmarks
            .iter()
            .map(|(name, kp)| (name.clone(), kp.filter(|k| k.score >= threshold)))
            .collect();
        KeypointSet { landmarks }
    }
}

impl FromIterator<(String, Option<Keypoint>)> for KeypointSet {
    fn from_iter<I: IntoIterator<Item = (String, Option<Keypoint>)>>(iter: I) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}
