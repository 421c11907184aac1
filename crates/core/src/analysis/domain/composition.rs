//! Framing metrics of a face box relative to the frame: rule-of-thirds
//! points, the vertical centre line, and relative face size.

use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Which half (or which thirds point) of the frame a face sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalSide {
    Left,
    Right,
}

/// Raster dimensions; all metrics depend on nothing else about a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameGeometry {
    pub width: f64,
    pub height: f64,
}

impl FrameGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl From<&Frame> for FrameGeometry {
    fn from(frame: &Frame) -> Self {
        Self::new(frame.width() as f64, frame.height() as f64)
    }
}

pub fn frame_center(frame: FrameGeometry) -> (f64, f64) {
    (frame.width / 2.0, frame.height / 2.0)
}

/// Intersections of the 3×3 grid, ordered upper-left, upper-right,
/// lower-left, lower-right.
pub fn thirds_points(frame: FrameGeometry) -> [(f64, f64); 4] {
    let (x1, x2) = (frame.width / 3.0, frame.width * 2.0 / 3.0);
    let (y1, y2) = (frame.height / 3.0, frame.height * 2.0 / 3.0);
    [(x1, y1), (x2, y1), (x1, y2), (x2, y2)]
}

/// Side whose upper thirds point falls inside the box; left wins when a
/// wide box covers both.
pub fn third_alignment(face: &BoundingBox, frame: FrameGeometry) -> Option<HorizontalSide> {
    let [upper_left, upper_right, _, _] = thirds_points(frame);
    if face.contains(upper_left) {
        Some(HorizontalSide::Left)
    } else if face.contains(upper_right) {
        Some(HorizontalSide::Right)
    } else {
        None
    }
}

/// `Right`/`Left` when both vertical edges are strictly on that side of the
/// centre line, `None` when the box straddles or touches it.
pub fn horizontal_center_alignment(
    face: &BoundingBox,
    frame: FrameGeometry,
) -> Option<HorizontalSide> {
    side_of_center(face, frame_center(frame).0)
}

/// Distance from the centre line to the box's far edge; `None` exactly
/// when [`horizontal_center_alignment`] is `None`.
pub fn horizontal_center_distance(face: &BoundingBox, frame: FrameGeometry) -> Option<f64> {
    let midpoint = frame_center(frame).0;
    side_of_center(face, midpoint).map(|side| match side {
        HorizontalSide::Right => face.right - midpoint,
        HorizontalSide::Left => midpoint - face.left,
    })
}

fn side_of_center(face: &BoundingBox, midpoint: f64) -> Option<HorizontalSide> {
    if face.left > midpoint && face.right > midpoint {
        Some(HorizontalSide::Right)
    } else if face.left < midpoint && face.right < midpoint {
        Some(HorizontalSide::Left)
    } else {
        None
    }
}

/// Face area as a percentage of the frame, rounded to 2 decimals.
///
/// Area is approximated as `width²`: the box height is deliberately
/// ignored so the figure stays comparable across detectors whose boxes
/// differ in vertical extent.
pub fn face_size_ratio(face: &BoundingBox, frame: FrameGeometry) -> f64 {
    let ratio = face.width().powi(2) / (frame.height * frame.width) * 100.0;
    (ratio * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn frame(width: f64, height: f64) -> FrameGeometry {
        FrameGeometry::new(width, height)
    }

    fn face(top: f64, right: f64, bottom: f64, left: f64) -> BoundingBox {
        BoundingBox::new(top, right, bottom, left)
    }

    #[test]
    fn test_frame_center() {
        assert_eq!(frame_center(frame(200.0, 100.0)), (100.0, 50.0));
    }

    #[test]
    fn test_geometry_from_frame() {
        let f = Frame::new(vec![0u8; 6 * 4 * 3], 6, 4, 3, 1);
        assert_eq!(FrameGeometry::from(&f), frame(6.0, 4.0));
    }

    #[test]
    fn test_thirds_points_order() {
        let pts = thirds_points(frame(300.0, 90.0));
        assert_eq!(pts[0], (100.0, 30.0));
        assert_eq!(pts[1], (200.0, 30.0));
        assert_eq!(pts[2], (100.0, 60.0));
        assert_eq!(pts[3], (200.0, 60.0));
    }

    #[rstest]
    #[case::covers_left_point(face(20.0, 120.0, 40.0, 80.0), Some(HorizontalSide::Left))]
    #[case::covers_right_point(face(20.0, 220.0, 40.0, 180.0), Some(HorizontalSide::Right))]
    #[case::covers_both_prefers_left(face(0.0, 250.0, 90.0, 50.0), Some(HorizontalSide::Left))]
    #[case::below_thirds_line(face(40.0, 120.0, 80.0, 80.0), None)]
    #[case::between_points(face(20.0, 190.0, 40.0, 110.0), None)]
    fn test_third_alignment(#[case] b: BoundingBox, #[case] expected: Option<HorizontalSide>) {
        assert_eq!(third_alignment(&b, frame(300.0, 90.0)), expected);
    }

    #[test]
    fn test_right_of_center_alignment_and_distance() {
        let b = face(0.0, 150.0, 50.0, 110.0);
        let f = frame(200.0, 100.0);
        assert_eq!(horizontal_center_alignment(&b, f), Some(HorizontalSide::Right));
        assert_relative_eq!(horizontal_center_distance(&b, f).unwrap(), 50.0);
    }

    #[test]
    fn test_left_of_center_uses_left_edge() {
        let b = face(0.0, 90.0, 50.0, 30.0);
        let f = frame(200.0, 100.0);
        assert_eq!(horizontal_center_alignment(&b, f), Some(HorizontalSide::Left));
        assert_relative_eq!(horizontal_center_distance(&b, f).unwrap(), 70.0);
    }

    #[rstest]
    #[case::straddles(face(0.0, 120.0, 50.0, 80.0))]
    #[case::left_edge_on_midline(face(0.0, 150.0, 50.0, 100.0))]
    #[case::right_edge_on_midline(face(0.0, 100.0, 50.0, 40.0))]
    fn test_straddle_gives_no_alignment_or_distance(#[case] b: BoundingBox) {
        let f = frame(200.0, 100.0);
        assert_eq!(horizontal_center_alignment(&b, f), None);
        assert_eq!(horizontal_center_distance(&b, f), None);
    }

    #[test]
    fn test_alignment_and_distance_agree_across_positions() {
        let f = frame(201.0, 100.0);
        for left in 0..190 {
            for width in [1.0, 5.0, 10.5, 60.0] {
                let l = left as f64;
                let b = face(0.0, l + width, 10.0, l);
                assert_eq!(
                    horizontal_center_alignment(&b, f).is_none(),
                    horizontal_center_distance(&b, f).is_none(),
                    "disagreement for box {b:?}"
                );
            }
        }
    }

    #[test]
    fn test_face_size_ratio_uses_width_squared() {
        // 40² / (200 * 100) * 100 = 8
        let b = face(0.0, 50.0, 100.0, 10.0);
        assert_relative_eq!(face_size_ratio(&b, frame(200.0, 100.0)), 8.0);
    }

    #[test]
    fn test_face_size_ratio_rounds_to_two_decimals() {
        // 10² / (300 * 70) * 100 = 0.47619...
        let b = face(0.0, 10.0, 10.0, 0.0);
        assert_relative_eq!(face_size_ratio(&b, frame(300.0, 70.0)), 0.48);
    }
}
