use crate::shared::frame::Frame;

/// Source of sampled film frames, addressed by film id and 1-based index.
///
/// Decoding and sampling belong to the extraction service that fills the
/// store; the pipeline only asks for one frame at a time.
pub trait FrameStore: Send {
    fn load(&mut self, film: &str, frame_index: usize)
        -> Result<Frame, Box<dyn std::error::Error>>;
}
