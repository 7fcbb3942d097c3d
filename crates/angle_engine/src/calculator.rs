//! Per-frame angle calculator.

use contracts::{AngleResult, ContractError, KeypointSet, Point2};
use tracing::{debug, instrument, trace};

use crate::definitions::{self, AngleDefinition};
use crate::geometry;
use crate::landmarks;

/// Angle that could not be evaluated this frame
#[derive(Debug)]
pub struct SkippedAngle {
    pub name: String,
    pub error: ContractError,
}

impl SkippedAngle {
    /// Metric label for the skip reason
    pub fn reason(&self) -> &'static str {
        match self.error {
            ContractError::UnknownAngle { .. } => "unknown_angle",
            ContractError::MissingLandmark { .. } => "missing_landmark",
            ContractError::DegenerateGeometry { .. } => "degenerate_geometry",
            _ => "other",
        }
    }
}

/// Output of one calculation
#[derive(Debug, Default)]
pub struct AngleCalculation {
    /// Successfully evaluated angles, keyed by canonical name
    pub angles: AngleResult,
    /// Confidence-masked landmarks including synthesized composites
    pub keypoints: KeypointSet,
    pub skipped: Vec<SkippedAngle>,
}

/// Evaluates a fixed list of requested angles, frame after frame.
///
/// Names are resolved once; unknown names are kept so every frame reports
/// them as skipped.
#[derive(Debug, Clone)]
pub struct AngleCalculator {
    requested: Vec<Result<&'static AngleDefinition, String>>,
    confidence_threshold: f64,
}

impl AngleCalculator {
    pub fn new<S: AsRef<str>>(angle_names: &[S], confidence_threshold: f64) -> Self {
        let requested = angle_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                definitions::lookup(name).map_err(|_| name.to_string())
            })
            .collect::<Vec<_>>();

        for unknown in requested.iter().filter_map(|r| r.as_ref().err()) {
            debug!(angle = %unknown, "requested angle is not defined");
        }

        Self {
            requested,
            confidence_threshold,
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Resolved definitions in request order
    pub fn definitions(&self) -> impl Iterator<Item = &'static AngleDefinition> + '_ {
        self.requested.iter().filter_map(|r| r.as_ref().ok().copied())
    }

    /// Requested names missing from the definition table
    pub fn unknown_angles(&self) -> impl Iterator<Item = &str> {
        self.requested
            .iter()
            .filter_map(|r| r.as_ref().err().map(String::as_str))
    }

    /// Mask, synthesize, then evaluate every requested angle.
    ///
    /// Failures are local: the angle is left out and reported in `skipped`.
    #[instrument(level = "trace", name = "angle_calculate", skip_all, fields(landmarks = set.len()))]
    pub fn calculate(&self, set: &KeypointSet) -> AngleCalculation {
        let masked = set.masked(self.confidence_threshold);
        let keypoints = landmarks::synthesize(&masked, self.definitions());

        let mut angles = AngleResult::new();
        let mut skipped = Vec::new();

        for requested in &self.requested {
            let outcome = match requested {
                Ok(definition) => evaluate_in(definition, &keypoints)
                    .map(|degrees| (definition.name, degrees))
                    .map_err(|error| SkippedAngle {
                        name: definition.name.to_string(),
                        error,
                    }),
                Err(name) => Err(SkippedAngle {
                    name: name.clone(),
                    error: ContractError::unknown_angle(name.as_str()),
                }),
            };

            match outcome {
                Ok((name, degrees)) => angles.insert(name, degrees),
                Err(skip) => {
                    trace!(angle = %skip.name, reason = skip.reason(), "angle skipped");
                    observability::record_angle_skipped(&skip.name, skip.reason());
                    skipped.push(skip);
                }
            }
        }

        AngleCalculation {
            angles,
            keypoints,
            skipped,
        }
    }
}

/// Gather the definition's points from `keypoints` and evaluate
fn evaluate_in(
    definition: &AngleDefinition,
    keypoints: &KeypointSet,
) -> Result<f64, ContractError> {
    let points = definition
        .landmarks
        .iter()
        .map(|landmark| {
            keypoints
                .point(landmark)
                .ok_or_else(|| ContractError::missing_landmark(definition.name, *landmark))
        })
        .collect::<Result<Vec<Point2>, _>>()?;
    geometry::evaluate(definition, &points)
}

/// One-shot calculation: `(keypoints, angle names, threshold) -> angles`
pub fn calculate<S: AsRef<str>>(
    set: &KeypointSet,
    angle_names: &[S],
    confidence_threshold: f64,
) -> AngleResult {
    AngleCalculator::new(angle_names, confidence_threshold)
        .calculate(set)
        .angles
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BodyModel, Keypoint, PersonKeypoints};

    const EPS: f64 = 1e-9;

    /// Standing subject, HALPE layout minus Neck/Hip so they get synthesized
    fn standing() -> KeypointSet {
        let mut set = KeypointSet::new();
        let mut put = |name: &str, x: f64, y: f64| {
            set.insert(name, Some(Keypoint::new(x, y, 0.9)));
        };
        put("LShoulder", 60.0, 100.0);
        put("RShoulder", 40.0, 100.0);
        put("LElbow", 62.0, 150.0);
        put("RElbow", 38.0, 150.0);
        put("LWrist", 62.0, 200.0);
        put("RWrist", 38.0, 200.0);
        put("LHip", 55.0, 200.0);
        put("RHip", 45.0, 200.0);
        put("LKnee", 55.0, 300.0);
        put("RKnee", 45.0, 300.0);
        put("LAnkle", 55.0, 400.0);
        put("RAnkle", 45.0, 400.0);
        set
    }

    #[test]
    fn unknown_angle_is_left_out() {
        let result = calculate(&standing(), &["left knee", "not an angle", "trunk"], 0.3);
        assert_eq!(result.len(), 2);
        assert!(result.contains("left knee"));
        assert!(result.contains("trunk"));
    }

    #[test]
    fn standing_subject_has_straight_knees_and_upright_trunk() {
        let result = calculate(&standing(), &["left knee", "right knee", "trunk"], 0.3);
        assert!(result.get("left knee").unwrap().abs() < EPS);
        assert!(result.get("right knee").unwrap().abs() < EPS);
        assert!((result.get("trunk").unwrap() - 90.0).abs() < EPS);
    }

    #[test]
    fn low_confidence_landmark_masks_dependent_angles() {
        let mut set = standing();
        set.insert("RShoulder", Some(Keypoint::new(40.0, 100.0, 0.1)));
        let calc = AngleCalculator::new(&["trunk", "left knee", "right elbow"], 0.3);
        let out = calc.calculate(&set);

        assert!(!out.angles.contains("trunk"));
        assert!(!out.angles.contains("right elbow"));
        assert!(out.angles.contains("left knee"));
        assert!(!out.keypoints.contains("Neck"));
        assert!(out
            .skipped
            .iter()
            .all(|s| s.reason() == "missing_landmark"));
    }

    #[test]
    fn landmark_absent_from_model_is_skipped() {
        let result = calculate(&standing(), &["left ankle", "left knee"], 0.3);
        assert_eq!(result.names().collect::<Vec<_>>(), vec!["left knee"]);
    }

    #[test]
    fn coincident_points_report_degenerate_geometry() {
        let mut set = standing();
        set.insert("LKnee", Some(Keypoint::new(55.0, 400.0, 0.9)));
        let out = AngleCalculator::new(&["left knee"], 0.3).calculate(&set);
        assert!(out.angles.is_empty());
        assert_eq!(out.skipped[0].reason(), "degenerate_geometry");
    }

    #[test]
    fn result_keys_are_canonical_names() {
        let result = calculate(&standing(), &["Left Knee"], 0.3);
        assert!(result.contains("left knee"));
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut set = standing();
        set.insert("LKnee", Some(Keypoint::new(55.0, 300.0, 0.3)));
        let result = calculate(&set, &["left knee"], 0.3);
        assert!(result.contains("left knee"));
    }

    #[test]
    fn unknown_names_are_reported() {
        let calc = AngleCalculator::new(&["trunk", "tail"], 0.3);
        assert_eq!(calc.unknown_angles().collect::<Vec<_>>(), vec!["tail"]);
        assert_eq!(calc.definitions().count(), 1);
    }

    #[test]
    fn works_on_model_keypoint_sets() {
        let model = BodyModel::from_name("COCO_17").unwrap();
        let mut raw = vec![None; 17];
        for (name, x, y) in [
            ("LShoulder", 60.0, 100.0),
            ("RShoulder", 40.0, 100.0),
            ("LHip", 55.0, 200.0),
            ("RHip", 45.0, 200.0),
        ] {
            raw[model.index_of(name).unwrap()] = Some(Keypoint::new(x, y, 0.8));
        }
        let set = model.keypoint_set(&PersonKeypoints::new(raw));
        let result = calculate(&set, &["trunk", "pelvis", "shoulders"], 0.3);
        assert!((result.get("trunk").unwrap() - 90.0).abs() < EPS);
        assert!(result.get("pelvis").unwrap().abs() < EPS);
        assert!(result.get("shoulders").unwrap().abs() < EPS);
    }
}
