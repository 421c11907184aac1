//! Open/closed mouth from lip contour geometry.
//!
//! Each lip is a 12-point contour: outer points 0-6 left to right, inner
//! points 7-11 running back right to left, so index `i` on the outer
//! contour faces index `12 - i` on the inner one. The inner contours of
//! the two lips face each other as top `i` / bottom `18 - i`.

use thiserror::Error;

use crate::detection::domain::face_observation::{LandmarkSet, Point};
use crate::shared::constants::{DEFAULT_MOUTH_OPEN_RATIO, LIP_POINT_COUNT};

#[derive(Error, Debug, PartialEq)]
pub enum LipLandmarkError {
    #[error("lip contour has {0} points, expected {LIP_POINT_COUNT}")]
    ShortContour(usize),
    #[error("landmarks have no top_lip/bottom_lip contours")]
    MissingLips,
}

const LIP_THICKNESS_INDICES: [usize; 3] = [2, 3, 4];
const INNER_TOP_INDICES: [usize; 3] = [8, 9, 10];

fn distance(a: Point, b: Point) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn check_contour(lip: &[Point]) -> Result<(), LipLandmarkError> {
    if lip.len() < LIP_POINT_COUNT {
        return Err(LipLandmarkError::ShortContour(lip.len()));
    }
    Ok(())
}

/// Mean outer-to-inner thickness over the middle three points of a lip.
pub fn lip_height(lip: &[Point]) -> Result<f64, LipLandmarkError> {
    check_contour(lip)?;
    let total: f64 = LIP_THICKNESS_INDICES
        .iter()
        .map(|&i| distance(lip[i], lip[LIP_POINT_COUNT - i]))
        .sum();
    Ok(total / LIP_THICKNESS_INDICES.len() as f64)
}

/// Mean gap between the inner contours of the two lips.
pub fn mouth_height(top_lip: &[Point], bottom_lip: &[Point]) -> Result<f64, LipLandmarkError> {
    check_contour(top_lip)?;
    check_contour(bottom_lip)?;
    let total: f64 = INNER_TOP_INDICES
        .iter()
        .map(|&i| distance(top_lip[i], bottom_lip[18 - i]))
        .sum();
    Ok(total / INNER_TOP_INDICES.len() as f64)
}

/// Open when the lip gap exceeds `ratio` times the thinner lip's height.
pub fn is_mouth_open(
    top_lip: &[Point],
    bottom_lip: &[Point],
    ratio: f64,
) -> Result<bool, LipLandmarkError> {
    let thinner = lip_height(top_lip)?.min(lip_height(bottom_lip)?);
    Ok(mouth_height(top_lip, bottom_lip)? > thinner * ratio)
}

/// Decides the mouth state of one face with a configurable ratio.
#[derive(Clone, Copy, Debug)]
pub struct MouthStateAnalyzer {
    open_ratio: f64,
}

impl MouthStateAnalyzer {
    pub fn new(open_ratio: f64) -> Self {
        Self { open_ratio }
    }

    pub fn open_ratio(&self) -> f64 {
        self.open_ratio
    }

    pub fn is_open(&self, landmarks: &LandmarkSet) -> Result<bool, LipLandmarkError> {
        let (top, bottom) = landmarks.lips().ok_or(LipLandmarkError::MissingLips)?;
        is_mouth_open(top, bottom, self.open_ratio)
    }
}

impl Default for MouthStateAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MOUTH_OPEN_RATIO)
    }
}
