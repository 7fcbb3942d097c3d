//! Angle definition table.
//!
//! The landmark count selects the formula: 2 = segment vs. horizontal,
//! 3 = angle at the middle landmark, 4 = angle between two segments.

use contracts::ContractError;
use serde::Serialize;

/// Clinical convention an angle is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleFamily {
    Flexion,
    Dorsiflexion,
    Horizontal,
}

/// Symmetric range a calibrated angle is folded into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapRange {
    /// ±90°, fold by 180°
    Quarter,
    /// ±180°, fold by 360°
    Half,
}

/// Evaluation recipe for one named angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleDefinition {
    pub name: &'static str,
    pub landmarks: &'static [&'static str],
    pub family: AngleFamily,
    pub offset_degrees: f64,
    pub sign: i8,
}

impl AngleDefinition {
    /// Segment angles are measured against the horizontal axis
    pub fn is_segment(&self) -> bool {
        self.landmarks.len() == 2
    }

    pub fn wrap_range(&self) -> WrapRange {
        match self.name {
            "pelvis" | "shoulders" => WrapRange::Quarter,
            _ => WrapRange::Half,
        }
    }
}

const fn def(
    name: &'static str,
    landmarks: &'static [&'static str],
    family: AngleFamily,
    offset_degrees: f64,
    sign: i8,
) -> AngleDefinition {
    AngleDefinition {
        name,
        landmarks,
        family,
        offset_degrees,
        sign,
    }
}

use AngleFamily::{Dorsiflexion, Flexion, Horizontal};

static ANGLE_DEFINITIONS: [AngleDefinition; 28] = [
    // joint angles
    def("right ankle", &["RKnee", "RAnkle", "RBigToe", "RHeel"], Dorsiflexion, 90.0, 1),
    def("left ankle", &["LKnee", "LAnkle", "LBigToe", "LHeel"], Dorsiflexion, 90.0, 1),
    def("right knee", &["RAnkle", "RKnee", "RHip"], Flexion, -180.0, 1),
    def("left knee", &["LAnkle", "LKnee", "LHip"], Flexion, -180.0, 1),
    def("right hip", &["RKnee", "RHip", "Hip", "Neck"], Flexion, 0.0, -1),
    def("left hip", &["LKnee", "LHip", "Hip", "Neck"], Flexion, 0.0, -1),
    def("right shoulder", &["RElbow", "RShoulder", "Hip", "Neck"], Flexion, 0.0, -1),
    def("left shoulder", &["LElbow", "LShoulder", "Hip", "Neck"], Flexion, 0.0, -1),
    def("right elbow", &["RWrist", "RElbow", "RShoulder"], Flexion, 180.0, -1),
    def("left elbow", &["LWrist", "LElbow", "LShoulder"], Flexion, 180.0, -1),
    def("right wrist", &["RElbow", "RWrist", "RIndex"], Flexion, -180.0, 1),
    def("left wrist", &["LElbow", "LWrist", "LIndex"], Flexion, -180.0, 1),
    // segment angles
    def("right foot", &["RBigToe", "RHeel"], Horizontal, 0.0, -1),
    def("left foot", &["LBigToe", "LHeel"], Horizontal, 0.0, -1),
    def("right shank", &["RAnkle", "RKnee"], Horizontal, 0.0, -1),
    def("left shank", &["LAnkle", "LKnee"], Horizontal, 0.0, -1),
    def("right thigh", &["RKnee", "RHip"], Horizontal, 0.0, -1),
    def("left thigh", &["LKnee", "LHip"], Horizontal, 0.0, -1),
    def("pelvis", &["LHip", "RHip"], Horizontal, 0.0, -1),
    def("trunk", &["Neck", "Hip"], Horizontal, 0.0, -1),
    def("shoulders", &["LShoulder", "RShoulder"], Horizontal, 0.0, -1),
    def("head", &["Head", "Neck"], Horizontal, 0.0, -1),
    def("right arm", &["RElbow", "RShoulder"], Horizontal, 0.0, -1),
    def("left arm", &["LElbow", "LShoulder"], Horizontal, 0.0, -1),
    def("right forearm", &["RWrist", "RElbow"], Horizontal, 0.0, -1),
    def("left forearm", &["LWrist", "LElbow"], Horizontal, 0.0, -1),
    def("right hand", &["RIndex", "RWrist"], Horizontal, 0.0, -1),
    def("left hand", &["LIndex", "LWrist"], Horizontal, 0.0, -1),
];

/// Every supported angle, joints first
pub fn all() -> &'static [AngleDefinition] {
    &ANGLE_DEFINITIONS
}

/// Case-insensitive lookup
///
/// # Errors
/// `UnknownAngle` when the name is not in the table
pub fn lookup(name: &str) -> Result<&'static AngleDefinition, ContractError> {
    let wanted = name.trim();
    ANGLE_DEFINITIONS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| ContractError::unknown_angle(name))
}

pub fn joint_angles() -> impl Iterator<Item = &'static AngleDefinition> {
    ANGLE_DEFINITIONS.iter().filter(|d| !d.is_segment())
}

pub fn segment_angles() -> impl Iterator<Item = &'static AngleDefinition> {
    ANGLE_DEFINITIONS.iter().filter(|d| d.is_segment())
}
