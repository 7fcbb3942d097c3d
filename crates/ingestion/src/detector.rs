//! Pose detector adapter
//!
//! Turns decoded images into timestamped [`DetectionFrame`]s by running
//! them through a [`PoseDetector`].

use contracts::{BodyModel, DetectionFrame, ImageFrame, PoseDetector};
use tracing::{instrument, trace};

use crate::error::{IngestionError, Result};

/// Wraps a detector for one session; timestamps are `frame_index / fps`
pub struct DetectorAdapter<D: PoseDetector> {
    source_id: String,
    detector: D,
    model: &'static BodyModel,
    fps: f64,
    next_frame: u64,
}

impl<D: PoseDetector> DetectorAdapter<D> {
    /// # Errors
    /// `DetectorFailed` when the detector's body model is unknown or `fps`
    /// is not positive
    pub fn new(source_id: impl Into<String>, detector: D, fps: f64) -> Result<Self> {
        let source_id = source_id.into();
        let model =
            BodyModel::from_name(detector.model_name()).map_err(|e| IngestionError::DetectorFailed {
                source_id: source_id.clone(),
                message: e.to_string(),
            })?;
        if !(fps > 0.0 && fps.is_finite()) {
            return Err(IngestionError::DetectorFailed {
                source_id,
                message: format!("invalid frame rate {fps}"),
            });
        }
        Ok(Self {
            source_id,
            detector,
            model,
            fps,
            next_frame: 0,
        })
    }

    pub fn model(&self) -> &'static BodyModel {
        self.model
    }

    /// Detect people in the next image of the session
    ///
    /// A failed detection still consumes the frame index so later
    /// timestamps stay aligned with the video.
    #[instrument(level = "trace", name = "detector_process", skip_all, fields(source_id = %self.source_id))]
    pub fn process(&mut self, image: &ImageFrame) -> Result<DetectionFrame> {
        let frame_id = self.next_frame;
        self.next_frame += 1;

        let detections = self
            .detector
            .detect(image)
            .map_err(|e| IngestionError::DetectorFailed {
                source_id: self.source_id.clone(),
                message: e.to_string(),
            })?;
        trace!(frame_id, people = detections.len(), "detected");

        Ok(DetectionFrame::new(
            self.source_id.clone(),
            frame_id,
            frame_id as f64 / self.fps,
            detections,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{ContractError, PoseDetections};

    /// Detector reporting one person per image, failing on empty images
    struct FixedDetector;

    impl PoseDetector for FixedDetector {
        fn model_name(&self) -> &str {
            "body"
        }

        fn detect(&mut self, image: &ImageFrame) -> std::result::Result<PoseDetections, ContractError> {
            if image.data.is_empty() {
                return Err(ContractError::Other("empty image".into()));
            }
            Ok(PoseDetections::from_arrays(&[vec![Some([1.0, 1.0]); 17]], None))
        }
    }

    fn image(len: usize) -> ImageFrame {
        ImageFrame {
            width: 1,
            height: 1,
            data: Bytes::from(vec![0u8; len]),
        }
    }

    #[test]
    fn timestamps_follow_frame_index() {
        let mut adapter = DetectorAdapter::new("video", FixedDetector, 25.0).unwrap();
        assert_eq!(adapter.model().name, "COCO_17");

        let first = adapter.process(&image(3)).unwrap();
        let second = adapter.process(&image(3)).unwrap();
        assert_eq!((first.frame_id, first.timestamp), (0, 0.0));
        assert_eq!((second.frame_id, second.timestamp), (1, 0.04));
        assert_eq!(second.detections.len(), 1);
    }

    #[test]
    fn failed_detection_consumes_index() {
        let mut adapter = DetectorAdapter::new("video", FixedDetector, 10.0).unwrap();
        assert!(adapter.process(&image(0)).is_err());
        assert_eq!(adapter.process(&image(3)).unwrap().frame_id, 1);
    }

    #[test]
    fn rejects_bad_fps() {
        assert!(DetectorAdapter::new("video", FixedDetector, 0.0).is_err());
    }
}
