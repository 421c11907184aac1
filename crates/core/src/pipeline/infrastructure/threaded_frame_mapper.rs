use std::collections::BTreeSet;

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::face_detector::FaceDetector;
use crate::frames::domain::frame_store::FrameStore;
use crate::pipeline::extraction_logger::ExtractionLogger;
use crate::pipeline::frame_assembler::{FrameAssembler, FrameOutcome};
use crate::pipeline::frame_mapper::{
    analyze_loaded, load_frame, report_outcome, FrameMapper, LoadedFrame,
};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// Maps frames with dedicated threads for loading and detection.
///
/// Layout: `loader → detect → main [report/collect]`
///
/// Frame decoding overlaps with detection. Outcomes may arrive out of
/// order and are re-sorted by frame index before returning.
pub struct ThreadedFrameMapper {
    channel_capacity: usize,
}

impl ThreadedFrameMapper {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for ThreadedFrameMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameMapper for ThreadedFrameMapper {
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
        let cap = self.channel_capacity;

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<(usize, LoadedFrame)>(cap);
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded::<FrameOutcome>(cap);

        let mut outcomes = std::thread::scope(|scope| {
            let loader = scope.spawn(move || run_loader(store, film, frame_indices, frame_tx));
            let detect =
                scope.spawn(move || run_detector(detector, assembler, frame_rx, outcome_tx));

            let mut collected = Vec::with_capacity(total);
            for outcome in outcome_rx {
                report_outcome(logger, &outcome, collected.len() + 1, total);
                collected.push(outcome);
            }

            if loader.join().is_err() {
                log::error!("Frame loader thread panicked");
            }
            if detect.join().is_err() {
                log::error!("Detect thread panicked");
            }
            collected
        });

        fill_missing(&mut outcomes, frame_indices, logger);
        outcomes.sort_by_key(|o| o.record.frame_index);
        outcomes
    }
}

fn run_loader(
    store: &mut dyn FrameStore,
    film: &str,
    frame_indices: &[usize],
    frame_tx: Sender<(usize, LoadedFrame)>,
) {
    for &index in frame_indices {
        let loaded = load_frame(store, film, index);
        if frame_tx.send((index, loaded)).is_err() {
            break;
        }
    }
}

fn run_detector(
    detector: &mut dyn FaceDetector,
    assembler: &FrameAssembler,
    frame_rx: Receiver<(usize, LoadedFrame)>,
    outcome_tx: Sender<FrameOutcome>,
) {
    for (index, loaded) in frame_rx {
        let outcome = analyze_loaded(loaded, index, detector, assembler);
        if outcome_tx.send(outcome).is_err() {
            break;
        }
    }
}

/// Marks every requested index with no outcome as unavailable, so a dead
/// worker never shortens the table.
fn fill_missing(
    outcomes: &mut Vec<FrameOutcome>,
    frame_indices: &[usize],
    logger: &mut dyn ExtractionLogger,
) {
    let seen: BTreeSet<usize> = outcomes.iter().map(|o| o.record.frame_index).collect();
    for &index in frame_indices {
        if !seen.contains(&index) {
            let message = "worker stopped before frame was processed".to_string();
            logger.frame_failed(index, &message);
            outcomes.push(FrameOutcome::failed(index, false, None, message));
        }
    }
}
