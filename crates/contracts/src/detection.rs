//! DetectionFrame - Ingestion output
//!
//! One frame of pose-detector output, tagged with the session it belongs to.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ContractError, PoseDetections};

/// Detector output for one frame of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// Session (video / stream) identifier
    pub source_id: String,

    /// Frame sequence number within the session
    pub frame_id: u64,

    /// Frame time in seconds since session start
    pub timestamp: f64,

    /// People detected in this frame
    #[serde(flatten)]
    pub detections: PoseDetections,
}

impl DetectionFrame {
    pub fn new(
        source_id: impl Into<String>,
        frame_id: u64,
        timestamp: f64,
        detections: PoseDetections,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            frame_id,
            timestamp,
            detections,
        }
    }
}

/// Raw decoded image handed to a pose detector
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB8 pixels
    pub data: Bytes,
}

/// Pose detector - opaque collaborator turning images into keypoints.
///
/// Implementations wrap an inference backend; the landmark index layout of
/// the output follows the body model the detector was built for.
pub trait PoseDetector: Send {
    /// Body model name the output is laid out for
    fn model_name(&self) -> &str;

    /// Detect every person in the image
    ///
    /// # Errors
    /// Backend failures
    fn detect(&mut self, image: &ImageFrame) -> Result<PoseDetections, ContractError>;
}
