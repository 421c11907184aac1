use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{BOTTOM_LIP, TOP_LIP};

/// 2D landmark point `(x, y)` in pixel coordinates.
pub type Point = (f64, f64);

/// Named facial feature → ordered contour points.
///
/// Only the lip contours are consumed by the pipeline; any other features
/// the landmarker reports are carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    features: BTreeMap<String, Vec<Point>>,
}

impl LandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, name: &str, points: Vec<Point>) -> Self {
        self.features.insert(name.to_string(), points);
        self
    }

    pub fn feature(&self, name: &str) -> Option<&[Point]> {
        self.features.get(name).map(|v| v.as_slice())
    }

    /// `(top_lip, bottom_lip)` when both contours are present.
    pub fn lips(&self) -> Option<(&[Point], &[Point])> {
        Some((self.feature(TOP_LIP)?, self.feature(BOTTOM_LIP)?))
    }
}

/// Everything the detector reports for one face in one frame.
///
/// Box, embedding and landmarks travel together so they cannot drift out
/// of positional alignment when a face list is filtered or reordered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub bounding_box: BoundingBox,
    pub embedding: Vec<f64>,
    #[serde(default)]
    pub landmarks: LandmarkSet,
}

impl FaceObservation {
    pub fn new(bounding_box: BoundingBox, embedding: Vec<f64>, landmarks: LandmarkSet) -> Self {
        Self {
            bounding_box,
            embedding,
            landmarks,
        }
    }
}
