use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::shared::constants::BLANK_LUMA_THRESHOLD;
use crate::shared::frame::Frame;

/// Rec.601 luma weights for R, G, B.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Whole-frame colour statistics reported next to the face features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// Mean luma, 0-255.
    pub brightness: f64,
    /// Standard deviation of luma.
    pub contrast: f64,
    /// No pixel reaches [`BLANK_LUMA_THRESHOLD`] (fade-to-black, slates).
    pub blank: bool,
    /// Width over the height left once letterbox bars are trimmed.
    pub true_aspect_ratio: f64,
}

impl FrameStats {
    /// `None` for frames that are not 3-channel or have no pixels.
    pub fn compute(frame: &Frame) -> Option<Self> {
        if frame.channels() != 3 || frame.data().is_empty() {
            return None;
        }
        let pixels = frame.as_ndarray();
        let n = (frame.width() as usize * frame.height() as usize) as f64;

        let flat = pixels
            .to_shape((frame.width() as usize * frame.height() as usize, 3))
            .ok()?;
        let channel_means: Vec<f64> = flat
            .axis_iter(Axis(1))
            .map(|c| c.iter().map(|&v| v as f64).sum::<f64>() / n)
            .collect();

        let luma: Vec<f64> = flat
            .axis_iter(Axis(0))
            .map(|px| {
                px.iter()
                    .zip(LUMA_WEIGHTS)
                    .map(|(&v, w)| v as f64 * w)
                    .sum::<f64>()
            })
            .collect();
        let brightness = luma.iter().sum::<f64>() / n;
        let variance = luma.iter().map(|l| (l - brightness).powi(2)).sum::<f64>() / n;
        let blank = luma.iter().all(|&l| l < BLANK_LUMA_THRESHOLD);
        let true_aspect_ratio = true_aspect_ratio(&luma, frame.width(), frame.height());

        Some(Self {
            red: channel_means[0].round() as u8,
            green: channel_means[1].round() as u8,
            blue: channel_means[2].round() as u8,
            brightness,
            contrast: variance.sqrt(),
            blank,
            true_aspect_ratio,
        })
    }
}

/// Rows at the top and bottom whose luma stays below the blank threshold
/// count as letterbox bars. A frame that is dark throughout keeps its full
/// height.
fn true_aspect_ratio(luma: &[f64], width: u32, height: u32) -> f64 {
    let is_bar = |row: &[f64]| row.iter().all(|&l| l < BLANK_LUMA_THRESHOLD);
    let rows: Vec<&[f64]> = luma.chunks(width as usize).collect();
    let Some(first) = rows.iter().position(|r| !is_bar(r)) else {
        return width as f64 / height as f64;
    };
    let last = rows.iter().rposition(|r| !is_bar(r)).unwrap_or(first);
    width as f64 / (last - first + 1) as f64
}
