//! Body models - flat landmark tables
//!
//! Each model maps anatomical landmark names to the detector index that
//! produces them. Composite landmarks a model does not emit (`Neck`, `Hip`
//! for COCO layouts) are simply absent and get synthesized downstream.

use crate::{ContractError, KeypointSet, PersonKeypoints};

/// Named landmark layout of a pose model
#[derive(Debug, PartialEq, Eq)]
pub struct BodyModel {
    /// Canonical name
    pub name: &'static str,
    /// Accepted alternative names
    pub aliases: &'static [&'static str],
    /// (landmark name, detector index)
    pub landmarks: &'static [(&'static str, usize)],
}

const HALPE_26: BodyModel = BodyModel {
    name: "HALPE_26",
    aliases: &["BODY_WITH_FEET"],
    landmarks: &[
        ("Nose", 0),
        ("LShoulder", 5),
        ("RShoulder", 6),
        ("LElbow", 7),
        ("RElbow", 8),
        ("LWrist", 9),
        ("RWrist", 10),
        ("LHip", 11),
        ("RHip", 12),
        ("LKnee", 13),
        ("RKnee", 14),
        ("LAnkle", 15),
        ("RAnkle", 16),
        ("Head", 17),
        ("Neck", 18),
        ("Hip", 19),
        ("LBigToe", 20),
        ("RBigToe", 21),
        ("LSmallToe", 22),
        ("RSmallToe", 23),
        ("LHeel", 24),
        ("RHeel", 25),
    ],
};

const COCO_17: BodyModel = BodyModel {
    name: "COCO_17",
    aliases: &["BODY"],
    landmarks: &[
        ("Nose", 0),
        ("LShoulder", 5),
        ("RShoulder", 6),
        ("LElbow", 7),
        ("RElbow", 8),
        ("LWrist", 9),
        ("RWrist", 10),
        ("LHip", 11),
        ("RHip", 12),
        ("LKnee", 13),
        ("RKnee", 14),
        ("LAnkle", 15),
        ("RAnkle", 16),
    ],
};

const COCO_133: BodyModel = BodyModel {
    name: "COCO_133",
    aliases: &["WHOLE_BODY"],
    landmarks: &[
        ("Nose", 0),
        ("LShoulder", 5),
        ("RShoulder", 6),
        ("LElbow", 7),
        ("RElbow", 8),
        ("LWrist", 9),
        ("RWrist", 10),
        ("LHip", 11),
        ("RHip", 12),
        ("LKnee", 13),
        ("RKnee", 14),
        ("LAnkle", 15),
        ("RAnkle", 16),
        ("LBigToe", 17),
        ("LSmallToe", 18),
        ("LHeel", 19),
        ("RBigToe", 20),
        ("RSmallToe", 21),
        ("RHeel", 22),
    ],
};

const COCO_133_WRIST: BodyModel = BodyModel {
    name: "COCO_133_WRIST",
    aliases: &["WHOLE_BODY_WRIST"],
    landmarks: &[
        ("Nose", 0),
        ("LShoulder", 5),
        ("RShoulder", 6),
        ("LElbow", 7),
        ("RElbow", 8),
        ("LWrist", 9),
        ("RWrist", 10),
        ("LHip", 11),
        ("RHip", 12),
        ("LKnee", 13),
        ("RKnee", 14),
        ("LAnkle", 15),
        ("RAnkle", 16),
        ("LBigToe", 17),
        ("LSmallToe", 18),
        ("LHeel", 19),
        ("RBigToe", 20),
        ("RSmallToe", 21),
        ("RHeel", 22),
        // index finger MCP of each hand block
        ("LIndex", 96),
        ("RIndex", 117),
    ],
};

static MODELS: [BodyModel; 4] = [HALPE_26, COCO_17, COCO_133, COCO_133_WRIST];

impl BodyModel {
    /// All registered models
    pub fn all() -> &'static [BodyModel] {
        &MODELS
    }

    /// Case-insensitive lookup by canonical name or alias
    ///
    /// # Errors
    /// `UnknownModel` when no model matches
    pub fn from_name(name: &str) -> Result<&'static BodyModel, ContractError> {
        let wanted = name.trim();
        MODELS
            .iter()
            .find(|m| {
                m.name.eq_ignore_ascii_case(wanted)
                    || m.aliases.iter().any(|a| a.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| ContractError::UnknownModel {
                name: name.to_string(),
            })
    }

    /// Detector index of a landmark
    pub fn index_of(&self, landmark: &str) -> Option<usize> {
        self.landmarks
            .iter()
            .find(|(n, _)| *n == landmark)
            .map(|(_, idx)| *idx)
    }

    pub fn landmark_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.landmarks.iter().map(|(n, _)| *n)
    }

    /// Number of detector outputs the model expects per person
    pub fn detector_width(&self) -> usize {
        self.landmarks.iter().map(|(_, i)| i + 1).max().unwrap_or(0)
    }

    /// Name every landmark of one detected person.
    ///
    /// Indices beyond the detector output become undefined landmarks.
    pub fn keypoint_set(&self, person: &PersonKeypoints) -> KeypointSet {
        self.landmarks
            .iter()
            .map(|(name, idx)| (name.to_string(), person.get(*idx).copied()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Keypoint;

    #[test]
    fn lookup_is_case_insensitive_and_accepts_aliases() {
        assert_eq!(BodyModel::from_name("halpe_26").unwrap().name, "HALPE_26");
        assert_eq!(
            BodyModel::from_name("body_with_feet").unwrap().name,
            "HALPE_26"
        );
        assert_eq!(BodyModel::from_name("Body").unwrap().name, "COCO_17");
        assert_eq!(
            BodyModel::from_name("whole_body_wrist").unwrap().name,
            "COCO_133_WRIST"
        );
    }

    #[test]
    fn unknown_model_is_an_error() {
        let err = BodyModel::from_name("openpose_25").unwrap_err();
        assert!(matches!(err, ContractError::UnknownModel { .. }));
    }

    #[test]
    fn coco_has_no_composites_or_feet() {
        let coco = BodyModel::from_name("COCO_17").unwrap();
        assert!(coco.index_of("Neck").is_none());
        assert!(coco.index_of("Hip").is_none());
        assert!(coco.index_of("LBigToe").is_none());
        assert_eq!(coco.detector_width(), 17);
    }

    #[test]
    fn keypoint_set_maps_indices_to_names() {
        let coco = BodyModel::from_name("COCO_17").unwrap();
        let mut raw = vec![None; 17];
        raw[13] = Some(Keypoint::new(3.0, 4.0, 0.9));
        let set = coco.keypoint_set(&PersonKeypoints::new(raw));
        assert_eq!(set.len(), coco.landmarks.len());
        assert_eq!(set.point("LKnee").map(|p| p.x), Some(3.0));
        assert!(set.contains("RKnee"));
        assert!(set.get("RKnee").is_none());
        assert!(!set.contains("Neck"));
    }

    #[test]
    fn short_detector_output_leaves_landmarks_undefined() {
        let halpe = BodyModel::from_name("HALPE_26").unwrap();
        let set = halpe.keypoint_set(&PersonKeypoints::new(vec![Some(Keypoint::new(
            1.0, 1.0, 1.0,
        ))]));
        assert!(set.get("Nose").is_some());
        assert!(set.contains("RHeel"));
        assert!(set.get("RHeel").is_none());
    }
}
