use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::frames::domain::frame_store::FrameStore;
use crate::shared::constants::FRAME_EXTENSION;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum FrameStoreError {
    #[error("frame indices start at 1, got 0")]
    ZeroIndex,
    #[error("frame file not found: {0}")]
    Missing(PathBuf),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Reads frames laid out by the extraction service:
/// `<root>/<film>/<film>_frame_<n>.jpg`.
///
/// Every image is converted to RGB8 on load.
pub struct ImageDirFrameStore {
    root: PathBuf,
}

impl ImageDirFrameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn frame_path(&self, film: &str, frame_index: usize) -> PathBuf {
        self.root
            .join(film)
            .join(format!("{film}_frame_{frame_index}.{FRAME_EXTENSION}"))
    }

    /// Highest `n` such that frames `1..=n` all exist for `film`.
    pub fn count_frames(&self, film: &str) -> usize {
        let mut n = 0;
        while self.frame_path(film, n + 1).is_file() {
            n += 1;
        }
        n
    }

    fn decode(path: &Path, frame_index: usize) -> Result<Frame, FrameStoreError> {
        let img = image::open(path)
            .map_err(|source| FrameStoreError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgb8();
        let (width, height) = img.dimensions();
        Ok(Frame::new(img.into_raw(), width, height, 3, frame_index))
    }
}

impl FrameStore for ImageDirFrameStore {
    fn load(
        &mut self,
        film: &str,
        frame_index: usize,
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        if frame_index == 0 {
            return Err(FrameStoreError::ZeroIndex.into());
        }
        let path = self.frame_path(film, frame_index);
        if !path.is_file() {
            return Err(FrameStoreError::Missing(path).into());
        }
        log::debug!("Loading frame {frame_index} from {}", path.display());
        Ok(Self::decode(&path, frame_index)?)
    }
}
