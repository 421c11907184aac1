use serde::Serialize;

use crate::analysis::domain::composition::HorizontalSide;
use crate::analysis::domain::frame_stats::FrameStats;
use crate::shared::bounding_box::BoundingBox;

/// Composition of the dominant face; only present when the frame has a
/// primary character.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrimaryCharacter {
    /// `None` when the face straddles the vertical centre line.
    pub center_alignment: Option<HorizontalSide>,
    /// `None` exactly when `center_alignment` is `None`.
    pub center_distance: Option<f64>,
    /// `false` when the landmarker gave no usable lip contours.
    pub mouth_open: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceFeatures {
    pub face_count: usize,
    pub face_locations: Vec<BoundingBox>,
    /// Percent of frame area per face, same order as `face_locations`.
    pub face_sizes: Vec<f64>,
    /// Identity embedding per face, same order as `face_locations`.
    pub face_embeddings: Vec<Vec<f64>>,
    pub primary_character_flag: u8,
    pub primary: Option<PrimaryCharacter>,
}

/// One row of the feature table. Never mutated after assembly except for
/// the identity label written by the clustering pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameFeatureRecord {
    pub frame_index: usize,
    /// `None` when the frame could not be loaded or the detector failed.
    pub faces: Option<FaceFeatures>,
    pub stats: Option<FrameStats>,
    pub identity_cluster: Option<usize>,
}

impl FrameFeatureRecord {
    pub fn unavailable(frame_index: usize, stats: Option<FrameStats>) -> Self {
        Self {
            frame_index,
            faces: None,
            stats,
            identity_cluster: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.faces.is_some()
    }

    pub fn has_primary_character(&self) -> bool {
        self.faces
            .as_ref()
            .is_some_and(|f| f.primary_character_flag == 1)
    }
}

/// Feature records of one film, ordered by frame index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureTable {
    pub film: String,
    pub records: Vec<FrameFeatureRecord>,
}

impl FeatureTable {
    pub fn new(film: impl Into<String>, mut records: Vec<FrameFeatureRecord>) -> Self {
        records.sort_by_key(|r| r.frame_index);
        Self {
            film: film.into(),
            records,
        }
    }

    pub fn get(&self, frame_index: usize) -> Option<&FrameFeatureRecord> {
        self.records
            .binary_search_by_key(&frame_index, |r| r.frame_index)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn unavailable_frames(&self) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| !r.is_available())
            .map(|r| r.frame_index)
            .collect()
    }

    /// Number of distinct identity labels.
    pub fn identity_count(&self) -> usize {
        let mut labels: Vec<usize> = self
            .records
            .iter()
            .filter_map(|r| r.identity_cluster)
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(frame_index: usize, flag: u8, cluster: Option<usize>) -> FrameFeatureRecord {
        FrameFeatureRecord {
            frame_index,
            faces: Some(FaceFeatures {
                face_count: 1,
                face_locations: vec![BoundingBox::new(0.0, 10.0, 10.0, 0.0)],
                face_sizes: vec![1.0],
                face_embeddings: vec![vec![0.5, 0.5]],
                primary_character_flag: flag,
                primary: None,
            }),
            stats: None,
            identity_cluster: cluster,
        }
    }

    #[test]
    fn test_table_sorts_records_by_frame_index() {
        let table = FeatureTable::new(
            "film",
            vec![
                FrameFeatureRecord::unavailable(3, None),
                available(1, 1, Some(0)),
                available(2, 0, None),
            ],
        );
        let order: Vec<usize> = table.records.iter().map(|r| r.frame_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(table.get(2).unwrap().frame_index, 2);
        assert!(table.get(9).is_none());
    }

    #[test]
    fn test_unavailable_frames_and_identity_count() {
        let table = FeatureTable::new(
            "film",
            vec![
                available(1, 1, Some(0)),
                FrameFeatureRecord::unavailable(2, None),
                available(3, 1, Some(1)),
                available(4, 1, Some(0)),
            ],
        );
        assert_eq!(table.unavailable_frames(), vec![2]);
        assert_eq!(table.identity_count(), 2);
    }

    #[test]
    fn test_unavailable_record_has_no_primary() {
        let record = FrameFeatureRecord::unavailable(5, None);
        assert!(!record.is_available());
        assert!(!record.has_primary_character());
        assert!(available(1, 1, None).has_primary_character());
        assert!(!available(1, 0, None).has_primary_character());
    }

    #[test]
    fn test_unavailable_record_serializes_null_faces() {
        let json = serde_json::to_value(FrameFeatureRecord::unavailable(5, None)).unwrap();
        assert_eq!(json["frame_index"], 5);
        assert!(json["faces"].is_null());
        assert!(json["identity_cluster"].is_null());
    }

    #[test]
    fn test_face_embeddings_serialize_per_face() {
        let json = serde_json::to_value(available(1, 1, Some(0))).unwrap();
        assert_eq!(json["faces"]["face_embeddings"][0][1], 0.5);
    }
}
