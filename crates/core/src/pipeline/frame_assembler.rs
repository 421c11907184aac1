use crate::analysis::domain::composition::{
    face_size_ratio, horizontal_center_alignment, horizontal_center_distance, FrameGeometry,
};
use crate::analysis::domain::frame_stats::FrameStats;
use crate::analysis::domain::mouth_state::MouthStateAnalyzer;
use crate::analysis::domain::primary_character::primary_character_flag;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_observation::FaceObservation;
use crate::pipeline::frame_feature_record::{FaceFeatures, FrameFeatureRecord, PrimaryCharacter};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::DEFAULT_MOUTH_OPEN_RATIO;
use crate::shared::frame::Frame;

/// Tunables for per-frame assembly.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionConfig {
    pub mouth_open_ratio: f64,
    pub compute_frame_stats: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mouth_open_ratio: DEFAULT_MOUTH_OPEN_RATIO,
            compute_frame_stats: true,
        }
    }
}

/// Wall-clock cost of one frame, per stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub load_ms: f64,
    pub analyze_ms: f64,
}

/// Result of the map phase for one frame.
///
/// `primary_embedding` is set exactly when the record has a primary
/// character; it is what the clustering pass consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutcome {
    pub record: FrameFeatureRecord,
    pub primary_embedding: Option<Vec<f64>>,
    /// Whether the frame itself was loaded (detector may still have failed).
    pub loaded: bool,
    pub error: Option<String>,
    pub timings: StageTimings,
}

impl FrameOutcome {
    pub fn failed(frame_index: usize, loaded: bool, stats: Option<FrameStats>, error: String) -> Self {
        Self {
            record: FrameFeatureRecord::unavailable(frame_index, stats),
            primary_embedding: None,
            loaded,
            error: Some(error),
            timings: StageTimings::default(),
        }
    }
}

/// Turns detector output for one frame into a feature record.
#[derive(Clone, Debug)]
pub struct FrameAssembler {
    mouth: MouthStateAnalyzer,
    compute_frame_stats: bool,
}

impl FrameAssembler {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            mouth: MouthStateAnalyzer::new(config.mouth_open_ratio),
            compute_frame_stats: config.compute_frame_stats,
        }
    }

    /// Runs the detector on `frame` and assembles the record. A detector
    /// error yields an unavailable record instead of propagating.
    pub fn process(&self, frame: &Frame, detector: &mut dyn FaceDetector) -> FrameOutcome {
        let stats = self.stats(frame);
        match detector.detect(frame) {
            Ok(faces) => self.assemble(frame, faces, stats),
            Err(e) => {
                log::warn!("Detector failed on frame {}: {e}", frame.index());
                FrameOutcome::failed(frame.index(), true, stats, e.to_string())
            }
        }
    }

    pub fn assemble(
        &self,
        frame: &Frame,
        faces: Vec<FaceObservation>,
        stats: Option<FrameStats>,
    ) -> FrameOutcome {
        let geometry = FrameGeometry::from(frame);
        let face_locations: Vec<BoundingBox> = faces.iter().map(|f| f.bounding_box).collect();
        let face_sizes = face_locations
            .iter()
            .map(|b| face_size_ratio(b, geometry))
            .collect();
        let flag = primary_character_flag(&face_locations);
        let face_embeddings: Vec<Vec<f64>> = faces.iter().map(|f| f.embedding.clone()).collect();

        let (primary, primary_embedding) = match faces.into_iter().next() {
            Some(first) if flag == 1 => {
                let features = self.describe_primary(frame.index(), &first, geometry);
                (Some(features), Some(first.embedding))
            }
            _ => (None, None),
        };

        log::debug!(
            "Frame {}: {} faces, primary={flag}",
            frame.index(),
            face_locations.len()
        );

        FrameOutcome {
            record: FrameFeatureRecord {
                frame_index: frame.index(),
                faces: Some(FaceFeatures {
                    face_count: face_locations.len(),
                    face_locations,
                    face_sizes,
                    face_embeddings,
                    primary_character_flag: flag,
                    primary,
                }),
                stats,
                identity_cluster: None,
            },
            primary_embedding,
            loaded: true,
            error: None,
            timings: StageTimings::default(),
        }
    }

    fn describe_primary(
        &self,
        frame_index: usize,
        face: &FaceObservation,
        geometry: FrameGeometry,
    ) -> PrimaryCharacter {
        let mouth_open = self.mouth.is_open(&face.landmarks).unwrap_or_else(|e| {
            log::debug!("Frame {frame_index}: mouth treated as closed ({e})");
            false
        });
        PrimaryCharacter {
            center_alignment: horizontal_center_alignment(&face.bounding_box, geometry),
            center_distance: horizontal_center_distance(&face.bounding_box, geometry),
            mouth_open,
        }
    }

    fn stats(&self, frame: &Frame) -> Option<FrameStats> {
        if self.compute_frame_stats {
            FrameStats::compute(frame)
        } else {
            None
        }
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}
