use std::time::Instant;

use thiserror::Error;

use crate::clustering::domain::identity_clusterer::{expand_labels, ClusterError, IdentityClusterer};
use crate::detection::domain::face_detector::FaceDetector;
use crate::frames::domain::frame_store::FrameStore;
use crate::pipeline::extraction_logger::ExtractionLogger;
use crate::pipeline::frame_assembler::{ExtractionConfig, FrameAssembler};
use crate::pipeline::frame_feature_record::FeatureTable;
use crate::pipeline::frame_mapper::{elapsed_ms, FrameMapper};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("no frames selected")]
    NoFrames,
    #[error("none of the {requested} requested frames could be loaded")]
    NothingLoaded { requested: usize },
    #[error("identity clustering failed: {0}")]
    Clustering(#[from] ClusterError),
}

/// Extracts the per-frame face feature table of one film.
///
/// Two phases: the mapper assembles one record per frame, then the
/// clusterer labels the primary-face embeddings of the whole batch. The
/// reduce phase starts only once every frame has an outcome.
pub struct ExtractFeaturesUseCase {
    store: Box<dyn FrameStore>,
    detector: Box<dyn FaceDetector>,
    clusterer: Box<dyn IdentityClusterer>,
    mapper: Box<dyn FrameMapper>,
    logger: Box<dyn ExtractionLogger>,
    assembler: FrameAssembler,
}

impl ExtractFeaturesUseCase {
    pub fn new(
        store: Box<dyn FrameStore>,
        detector: Box<dyn FaceDetector>,
        clusterer: Box<dyn IdentityClusterer>,
        mapper: Box<dyn FrameMapper>,
        logger: Box<dyn ExtractionLogger>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            store,
            detector,
            clusterer,
            mapper,
            logger,
            assembler: FrameAssembler::new(config),
        }
    }

    /// Duplicate indices are processed once; the table is ordered by index.
    pub fn execute(
        &mut self,
        film: &str,
        frame_indices: &[usize],
    ) -> Result<FeatureTable, ExtractionError> {
        let mut indices = frame_indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        if indices.is_empty() {
            return Err(ExtractionError::NoFrames);
        }

        self.logger
            .info(&format!("Extracting {} frames of '{film}'", indices.len()));

        let outcomes = self.mapper.map(
            film,
            &indices,
            self.store.as_mut(),
            self.detector.as_mut(),
            &self.assembler,
            self.logger.as_mut(),
        );

        if !outcomes.iter().any(|o| o.loaded) {
            self.logger.summary();
            return Err(ExtractionError::NothingLoaded {
                requested: indices.len(),
            });
        }

        let primary_flags: Vec<bool> = outcomes
            .iter()
            .map(|o| o.primary_embedding.is_some())
            .collect();
        let mut records = Vec::with_capacity(outcomes.len());
        let mut embeddings = Vec::new();
        for outcome in outcomes {
            if let Some(embedding) = outcome.primary_embedding {
                embeddings.push(embedding);
            }
            records.push(outcome.record);
        }

        let start = Instant::now();
        let labels = self.clusterer.cluster(&embeddings)?;
        self.logger.timing("cluster", elapsed_ms(start));

        let expanded = expand_labels(&labels, &primary_flags)?;
        for (record, label) in records.iter_mut().zip(expanded) {
            record.identity_cluster = label;
        }

        let table = FeatureTable::new(film, records);
        self.logger.info(&format!(
            "{} primary-character frames, {} identities, {} unavailable frames",
            embeddings.len(),
            table.identity_count(),
            table.unavailable_frames().len()
        ));
        self.logger.summary();

        Ok(table)
    }
}
