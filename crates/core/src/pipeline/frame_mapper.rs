use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::frames::domain::frame_store::FrameStore;
use crate::pipeline::extraction_logger::ExtractionLogger;
use crate::pipeline::frame_assembler::{FrameAssembler, FrameOutcome};
use crate::shared::frame::Frame;

/// Map phase of extraction: one [`FrameOutcome`] per requested frame index,
/// returned sorted by frame index.
///
/// Failures stay per-frame; an implementation never aborts the batch.
pub trait FrameMapper: Send {
    fn map(
        &self,
        film: &str,
        frame_indices: &[usize],
        store: &mut dyn FrameStore,
        detector: &mut dyn FaceDetector,
        assembler: &FrameAssembler,
        logger: &mut dyn ExtractionLogger,
    ) -> Vec<FrameOutcome>;
}

/// Processes frames one after another on the calling thread.
pub struct SequentialFrameMapper;

impl FrameMapper for SequentialFrameMapper {
    fn map(
        &self,
        film: &str,
        frame_indices: &[usize],
        store: &mut dyn FrameStore,
        detector: &mut dyn FaceDetector,
        assembler: &FrameAssembler,
        logger: &mut dyn ExtractionLogger,
    ) -> Vec<FrameOutcome> {
        let total = frame_indices.len();
        let mut outcomes = Vec::with_capacity(total);
        for &index in frame_indices {
            let loaded = load_frame(store, film, index);
            let outcome = analyze_loaded(loaded, index, detector, assembler);
            report_outcome(logger, &outcome, outcomes.len() + 1, total);
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|o| o.record.frame_index);
        outcomes
    }
}

/// A frame fetched from the store, or the reason it could not be.
pub(crate) type LoadedFrame = (Result<Frame, String>, f64);

pub(crate) fn load_frame(store: &mut dyn FrameStore, film: &str, index: usize) -> LoadedFrame {
    let start = Instant::now();
    let result = store.load(film, index).map_err(|e| e.to_string());
    (result, elapsed_ms(start))
}

pub(crate) fn analyze_loaded(
    (loaded, load_ms): LoadedFrame,
    index: usize,
    detector: &mut dyn FaceDetector,
    assembler: &FrameAssembler,
) -> FrameOutcome {
    let frame = match loaded {
        Ok(frame) => frame,
        Err(message) => {
            log::warn!("Could not load frame {index}: {message}");
            let mut outcome = FrameOutcome::failed(index, false, None, message);
            outcome.timings.load_ms = load_ms;
            return outcome;
        }
    };
    let start = Instant::now();
    let mut outcome = assembler.process(&frame, detector);
    outcome.timings.load_ms = load_ms;
    outcome.timings.analyze_ms = elapsed_ms(start);
    outcome
}

pub(crate) fn report_outcome(
    logger: &mut dyn ExtractionLogger,
    outcome: &FrameOutcome,
    current: usize,
    total: usize,
) {
    logger.timing("load", outcome.timings.load_ms);
    if outcome.loaded {
        logger.timing("analyze", outcome.timings.analyze_ms);
    }
    if let Some(message) = &outcome.error {
        logger.frame_failed(outcome.record.frame_index, message);
    }
    logger.progress(current, total);
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
