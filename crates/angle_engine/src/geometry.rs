//! Geometric angle evaluation.

use contracts::{ContractError, Point2};
use nalgebra::Vector2;

use crate::definitions::{self, AngleDefinition, WrapRange};

/// Vectors shorter than this are treated as zero-length
const MIN_VECTOR_NORM: f64 = 1e-9;

fn vector(p: &Point2) -> Vector2<f64> {
    Vector2::new(p.x, p.y)
}

/// Signed angle in degrees described by 2, 3 or 4 points, in (-180, 180].
///
/// - 2 points: `p0 - p1` against the horizontal axis
/// - 3 points: `p0 - p1` against `p2 - p1` (vertex `p1`)
/// - 4 points: `p1 - p0` against `p3 - p2`
///
/// `None` for any other point count or a zero-length vector.
pub fn raw_angle(points: &[Point2]) -> Option<f64> {
    let (u, v) = match points {
        [a, b] => (vector(a) - vector(b), Vector2::x()),
        [a, b, c] => (vector(a) - vector(b), vector(c) - vector(b)),
        [a, b, c, d] => (vector(b) - vector(a), vector(d) - vector(c)),
        _ => return None,
    };
    if u.norm() < MIN_VECTOR_NORM || v.norm() < MIN_VECTOR_NORM {
        return None;
    }
    let radians = u.y.atan2(u.x) - v.y.atan2(v.x);
    Some(normalize(radians.to_degrees()))
}

/// Fold any angle into (-180, 180]
fn normalize(degrees: f64) -> f64 {
    let folded = degrees % 360.0;
    if folded > 180.0 {
        folded - 360.0
    } else if folded <= -180.0 {
        folded + 360.0
    } else {
        folded
    }
}

/// Single-step wrap of a calibrated angle into its symmetric range
pub fn wrap(range: WrapRange, degrees: f64) -> f64 {
    let (limit, turn) = match range {
        WrapRange::Quarter => (90.0, 180.0),
        WrapRange::Half => (180.0, 360.0),
    };
    if degrees > limit {
        degrees - turn
    } else if degrees < -limit {
        degrees + turn
    } else {
        degrees
    }
}

/// Calibrated angle: `(raw + offset) * sign`, then wrapped
///
/// # Errors
/// `DegenerateGeometry` for coincident points or a wrong point count
pub fn evaluate(definition: &AngleDefinition, points: &[Point2]) -> Result<f64, ContractError> {
    let raw = raw_angle(points).ok_or_else(|| ContractError::DegenerateGeometry {
        angle: definition.name.to_string(),
    })?;
    let calibrated = (raw + definition.offset_degrees) * f64::from(definition.sign);
    Ok(wrap(definition.wrap_range(), calibrated))
}

/// Look up `name` and evaluate it
///
/// # Errors
/// `UnknownAngle` or `DegenerateGeometry`
pub fn evaluate_named(name: &str, points: &[Point2]) -> Result<f64, ContractError> {
    evaluate(definitions::lookup(name)?, points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn collinear_vertex_between_is_straight() {
        let cases = [
            [p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)],
            [p(2.0, 0.0), p(1.0, 0.0), p(0.0, 0.0)],
            [p(0.0, 0.0), p(1.0, 1.0), p(3.0, 3.0)],
            [p(5.0, -2.0), p(5.0, 3.0), p(5.0, 40.0)],
        ];
        for points in cases {
            assert_close(raw_angle(&points).unwrap(), 180.0);
        }
    }

    #[test]
    fn vertex_on_endpoint_is_undefined() {
        assert!(raw_angle(&[p(1.0, 1.0), p(1.0, 1.0), p(2.0, 0.0)]).is_none());
        assert!(raw_angle(&[p(0.0, 0.0), p(1.0, 1.0), p(1.0, 1.0)]).is_none());
        assert!(raw_angle(&[p(3.0, 3.0), p(3.0, 3.0)]).is_none());
    }

    #[test]
    fn point_count_outside_two_to_four_is_undefined() {
        assert!(raw_angle(&[]).is_none());
        assert!(raw_angle(&[p(0.0, 0.0)]).is_none());
        assert!(raw_angle(&[p(0.0, 0.0); 5]).is_none());
    }

    #[test]
    fn segment_against_horizontal() {
        // y grows downward: p0 below-right of p1
        assert_close(raw_angle(&[p(1.0, 1.0), p(0.0, 0.0)]).unwrap(), 45.0);
        assert_close(raw_angle(&[p(0.0, 0.0), p(0.0, 10.0)]).unwrap(), -90.0);
        assert_close(raw_angle(&[p(-1.0, 0.0), p(0.0, 0.0)]).unwrap(), 180.0);
    }

    #[test]
    fn right_angle_at_vertex() {
        assert_close(
            raw_angle(&[p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0)]).unwrap(),
            -90.0,
        );
        assert_close(
            raw_angle(&[p(0.0, 1.0), p(0.0, 0.0), p(1.0, 0.0)]).unwrap(),
            90.0,
        );
    }

    #[test]
    fn four_points_use_independent_segments() {
        let angle = raw_angle(&[p(0.0, 0.0), p(1.0, 0.0), p(5.0, 5.0), p(5.0, 6.0)]).unwrap();
        assert_close(angle, -90.0);
    }

    #[test]
    fn wrap_quarter_range() {
        assert_close(wrap(WrapRange::Quarter, 95.0), -85.0);
        assert_close(wrap(WrapRange::Quarter, -95.0), 85.0);
        assert_close(wrap(WrapRange::Quarter, 90.0), 90.0);
    }

    #[test]
    fn wrap_half_range() {
        assert_close(wrap(WrapRange::Half, 185.0), -175.0);
        assert_close(wrap(WrapRange::Half, -185.0), 175.0);
        assert_close(wrap(WrapRange::Half, 95.0), 95.0);
    }

    #[test]
    fn wrap_is_applied_once() {
        assert_close(wrap(WrapRange::Quarter, 275.0), 95.0);
    }

    #[test]
    fn straight_knee_is_zero_flexion() {
        let knee = evaluate_named(
            "left knee",
            &[p(0.0, 100.0), p(0.0, 50.0), p(0.0, 0.0)],
        )
        .unwrap();
        assert_close(knee, 0.0);
    }

    #[test]
    fn bent_knee_reports_flexion() {
        // ankle straight back from the knee: 90 degree bend
        let knee = evaluate_named(
            "right knee",
            &[p(-50.0, 50.0), p(0.0, 50.0), p(0.0, 0.0)],
        )
        .unwrap();
        assert_close(knee.abs(), 90.0);
    }

    #[test]
    fn upright_trunk_is_ninety() {
        let trunk = evaluate_named("trunk", &[p(0.0, 0.0), p(0.0, 100.0)]).unwrap();
        assert_close(trunk, 90.0);
    }

    #[test]
    fn level_pelvis_stays_in_quarter_range() {
        // LHip to the right of RHip in image space
        let pelvis = evaluate_named("pelvis", &[p(10.0, 0.0), p(0.0, 0.0)]).unwrap();
        assert_close(pelvis, 0.0);
        let mirrored = evaluate_named("pelvis", &[p(0.0, 0.0), p(10.0, 0.0)]).unwrap();
        assert_close(mirrored, 0.0);
    }

    #[test]
    fn evaluate_reports_degenerate_and_unknown() {
        let err = evaluate_named("trunk", &[p(1.0, 1.0), p(1.0, 1.0)]).unwrap_err();
        assert!(matches!(err, ContractError::DegenerateGeometry { .. }));
        let err = evaluate_named("tail", &[p(0.0, 0.0), p(1.0, 1.0)]).unwrap_err();
        assert!(matches!(err, ContractError::UnknownAngle { .. }));
    }
}
