use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_observation::FaceObservation;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DetectionFileError {
    #[error("failed to read detections from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed detections in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("detections key {0:?} is not a frame index")]
    BadFrameKey(String),
}

/// Replays detector output recorded ahead of time, keyed by frame index.
///
/// Lets the feature pipeline run against a detector/landmarker pass done
/// elsewhere. Frames absent from the recording have no faces.
pub struct ReplayFaceDetector {
    detections: Arc<HashMap<usize, Vec<FaceObservation>>>,
}

impl ReplayFaceDetector {
    pub fn new(detections: Arc<HashMap<usize, Vec<FaceObservation>>>) -> Self {
        Self { detections }
    }

    /// Loads a JSON object mapping frame index (as a string key) to the
    /// ordered list of observations for that frame.
    pub fn from_json_file(path: &Path) -> Result<Self, DetectionFileError> {
        let text = fs::read_to_string(path).map_err(|source| DetectionFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: HashMap<String, Vec<FaceObservation>> =
            serde_json::from_str(&text).map_err(|source| DetectionFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut detections = HashMap::with_capacity(raw.len());
        for (key, faces) in raw {
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| DetectionFileError::BadFrameKey(key.clone()))?;
            detections.insert(index, faces);
        }
        log::info!(
            "Loaded recorded detections for {} frames from {}",
            detections.len(),
            path.display()
        );
        Ok(Self::new(Arc::new(detections)))
    }

    pub fn frame_count(&self) -> usize {
        self.detections.len()
    }
}

impl FaceDetector for ReplayFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
        Ok(self
            .detections
            .get(&frame.index())
            .cloned()
            .unwrap_or_default())
    }
}
