use serde::{Deserialize, Serialize};

/// Axis-aligned face box in pixel coordinates, edges in detector order
/// `(top, right, bottom, left)`.
///
/// Expected to satisfy `top < bottom` and `left < right`; detector output
/// is trusted rather than re-validated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl BoundingBox {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, (x, y): (f64, f64)) -> bool {
        self.left <= x && x <= self.right && self.top <= y && y <= self.bottom
    }
}

impl From<(f64, f64, f64, f64)> for BoundingBox {
    fn from((top, right, bottom, left): (f64, f64, f64, f64)) -> Self {
        Self::new(top, right, bottom, left)
    }
}
