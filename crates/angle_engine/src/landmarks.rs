//! Composite landmark synthesis.
//!
//! `Neck` and `Hip` are midpoints of the shoulder and hip pairs. They are
//! only synthesized for models that do not emit them, and only when an
//! angle being evaluated refers to them.

use contracts::{Keypoint, KeypointSet};
use tracing::trace;

use crate::definitions::AngleDefinition;

/// Landmark derived from a left/right pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeLandmark {
    pub name: &'static str,
    pub left: &'static str,
    pub right: &'static str,
}

pub static COMPOSITE_LANDMARKS: [CompositeLandmark; 2] = [
    CompositeLandmark {
        name: "Neck",
        left: "LShoulder",
        right: "RShoulder",
    },
    CompositeLandmark {
        name: "Hip",
        left: "LHip",
        right: "RHip",
    },
];

impl CompositeLandmark {
    /// Midpoint of both constituents, scored by the weaker of the two.
    ///
    /// `None` if either is undefined or absent.
    pub fn derive(&self, set: &KeypointSet) -> Option<Keypoint> {
        let left = set.get(self.left)?;
        let right = set.get(self.right)?;
        let mid = left.position.midpoint(&right.position);
        Some(Keypoint::new(mid.x, mid.y, left.score.min(right.score)))
    }
}

/// Composites that some definition needs and the set does not provide
pub fn required_composites<'a>(
    set: &KeypointSet,
    definitions: impl IntoIterator<Item = &'a AngleDefinition>,
) -> Vec<&'static CompositeLandmark> {
    let mut needed: Vec<&'static CompositeLandmark> = Vec::new();
    for definition in definitions {
        for composite in &COMPOSITE_LANDMARKS {
            if definition.landmarks.contains(&composite.name)
                && !set.contains(composite.name)
                && !needed.contains(&composite)
            {
                needed.push(composite);
            }
        }
    }
    needed
}

/// Augmented copy of `set` with the needed composites added.
///
/// Primitive landmarks are never modified; a composite whose constituents
/// are not both defined is left out.
pub fn synthesize<'a>(
    set: &KeypointSet,
    definitions: impl IntoIterator<Item = &'a AngleDefinition>,
) -> KeypointSet {
    let mut augmented = set.clone();
    for composite in required_composites(set, definitions) {
        match composite.derive(set) {
            Some(keypoint) => augmented.insert(composite.name, Some(keypoint)),
            None => trace!(landmark = composite.name, "composite landmark skipped"),
        }
    }
    augmented
}
