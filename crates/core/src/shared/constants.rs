/// A second face wider than this fraction of the first face's width means
/// no single face dominates the frame.
pub const PRIMARY_WIDTH_RATIO: f64 = 0.75;

/// Default mouth gap, as a fraction of the thinner lip, above which a mouth
/// counts as open.
pub const DEFAULT_MOUTH_OPEN_RATIO: f64 = 0.8;

/// Points per lip contour: outer 0-6, inner 7-11 running back toward 0.
pub const LIP_POINT_COUNT: usize = 12;

pub const TOP_LIP: &str = "top_lip";
pub const BOTTOM_LIP: &str = "bottom_lip";

/// Empirical merge cut-off for identity clustering, in embedding units.
pub const DEFAULT_CLUSTER_DISTANCE_THRESHOLD: f64 = 5.0;

/// Luma at or above this value on any pixel makes a frame non-blank.
pub const BLANK_LUMA_THRESHOLD: f64 = 16.0;

pub const FRAME_EXTENSION: &str = "jpg";
