use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ClusterError {
    #[error("embedding {index} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("embedding {0} contains a non-finite value")]
    NonFinite(usize),
    #[error("distance threshold must be positive and finite, got {0}")]
    InvalidThreshold(f64),
    #[error("{labels} labels for {primaries} primary frames")]
    LabelCountMismatch { labels: usize, primaries: usize },
}

/// Groups primary-face embeddings into character identities.
///
/// Returns one label per embedding, in input order. Label values only
/// carry meaning through equality; the partition must be reproducible
/// for identical input.
pub trait IdentityClusterer: Send {
    fn cluster(&self, embeddings: &[Vec<f64>]) -> Result<Vec<usize>, ClusterError>;
}

/// Spreads per-primary labels back over every frame: frames without a
/// primary character get `None`, the rest consume labels in order.
pub fn expand_labels(
    labels: &[usize],
    primary_flags: &[bool],
) -> Result<Vec<Option<usize>>, ClusterError> {
    let primaries = primary_flags.iter().filter(|&&f| f).count();
    if primaries != labels.len() {
        return Err(ClusterError::LabelCountMismatch {
            labels: labels.len(),
            primaries,
        });
    }
    let mut next = labels.iter().copied();
    Ok(primary_flags
        .iter()
        .map(|&flag| if flag { next.next() } else { None })
        .collect())
}
