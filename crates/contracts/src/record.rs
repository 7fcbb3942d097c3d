//! FrameRecord - Session Engine output
//!
//! What one processed frame produced, per tracked person.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{AngleRange, AngleResult, Keypoint};

/// Processed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Session identifier
    pub source_id: String,

    /// Frame sequence number from the source
    pub frame_id: u64,

    /// Frame time (seconds)
    pub timestamp: f64,

    /// Processed people, ascending by slot
    pub people: Vec<PersonFrame>,
}

impl FrameRecord {
    /// Person tracked in the given identity slot
    pub fn person(&self, slot: usize) -> Option<&PersonFrame> {
        self.people.iter().find(|p| p.slot == slot)
    }
}

/// One tracked person in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonFrame {
    /// Identity slot assigned by cross-frame association
    pub slot: usize,

    /// Angles evaluated this frame
    pub angles: AngleResult,

    /// Defined landmarks (name -> keypoint) after confidence masking
    pub keypoints: BTreeMap<String, Keypoint>,

    /// Session-so-far range of each angle present in `angles`
    pub live_rom: BTreeMap<String, AngleRange>,
}
