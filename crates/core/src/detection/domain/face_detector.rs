use crate::detection::domain::face_observation::FaceObservation;
use crate::shared::frame::Frame;

/// Domain interface for the face detector, embedder and landmarker.
///
/// Observations come back in detector order; that order is significant
/// because primary-character selection treats the first face as the
/// candidate. Implementations may be stateful, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>>;
}
