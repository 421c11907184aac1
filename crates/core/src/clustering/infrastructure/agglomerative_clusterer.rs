//! Hierarchical agglomerative clustering of face embeddings.
//!
//! The dendrogram is built with the nearest-neighbour chain algorithm
//! (O(n²) time and memory) using Lance–Williams distance updates, then cut
//! at the distance threshold: every merge strictly below it is applied.
//! All supported linkages are reducible, so the chain yields the same
//! dendrogram as the naive closest-pair loop.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::clustering::domain::identity_clusterer::{ClusterError, IdentityClusterer};
use crate::clustering::infrastructure::union_find;
use crate::shared::constants::DEFAULT_CLUSTER_DISTANCE_THRESHOLD;

/// Inter-cluster distance used when merging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Linkage {
    /// Minimum variance increase, scaled so singletons merge at their
    /// Euclidean distance.
    #[default]
    Ward,
    Complete,
    Average,
    Single,
}

impl FromStr for Linkage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ward" => Ok(Self::Ward),
            "complete" => Ok(Self::Complete),
            "average" => Ok(Self::Average),
            "single" => Ok(Self::Single),
            other => Err(format!(
                "unknown linkage '{other}', expected ward, complete, average or single"
            )),
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ward => "ward",
            Self::Complete => "complete",
            Self::Average => "average",
            Self::Single => "single",
        };
        f.write_str(name)
    }
}

impl Linkage {
    /// Distance from cluster `k` to the union of `i` and `j`.
    fn update(self, d_ki: f64, d_kj: f64, d_ij: f64, n_i: f64, n_j: f64, n_k: f64) -> f64 {
        match self {
            Self::Single => d_ki.min(d_kj),
            Self::Complete => d_ki.max(d_kj),
            Self::Average => (n_i * d_ki + n_j * d_kj) / (n_i + n_j),
            Self::Ward => {
                let sq = ((n_i + n_k) * d_ki * d_ki + (n_j + n_k) * d_kj * d_kj
                    - n_k * d_ij * d_ij)
                    / (n_i + n_j + n_k);
                sq.max(0.0).sqrt()
            }
        }
    }
}

/// One dendrogram step: slot `absorbed` joined slot `into` at `height`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Merge {
    absorbed: usize,
    into: usize,
    height: f64,
}

pub struct AgglomerativeClusterer {
    distance_threshold: f64,
    linkage: Linkage,
}

impl AgglomerativeClusterer {
    pub fn new(distance_threshold: f64, linkage: Linkage) -> Result<Self, ClusterError> {
        if !(distance_threshold.is_finite() && distance_threshold > 0.0) {
            return Err(ClusterError::InvalidThreshold(distance_threshold));
        }
        Ok(Self {
            distance_threshold,
            linkage,
        })
    }

    pub fn distance_threshold(&self) -> f64 {
        self.distance_threshold
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }
}

impl Default for AgglomerativeClusterer {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_CLUSTER_DISTANCE_THRESHOLD,
            linkage: Linkage::default(),
        }
    }
}

impl IdentityClusterer for AgglomerativeClusterer {
    fn cluster(&self, embeddings: &[Vec<f64>]) -> Result<Vec<usize>, ClusterError> {
        let points = to_matrix(embeddings)?;
        let n = points.nrows();
        if n < 2 {
            return Ok(vec![0; n]);
        }

        let mut dist = pairwise_euclidean(&points);
        let merges = nn_chain(&mut dist, self.linkage);

        let mut parent: Vec<usize> = (0..n).collect();
        let mut applied = 0;
        for m in merges.iter().filter(|m| m.height < self.distance_threshold) {
            union_find::union(&mut parent, m.absorbed, m.into);
            applied += 1;
        }
        let labels = union_find::labels_by_first_appearance(&mut parent);
        log::debug!(
            "Clustered {n} embeddings ({} linkage, threshold {}): {applied} merges applied, {} identities",
            self.linkage,
            self.distance_threshold,
            n - applied
        );
        Ok(labels)
    }
}

fn to_matrix(embeddings: &[Vec<f64>]) -> Result<Array2<f64>, ClusterError> {
    let dims = embeddings.first().map_or(0, Vec::len);
    let mut points = Array2::<f64>::zeros((embeddings.len(), dims));
    for (index, (e, mut row)) in embeddings.iter().zip(points.rows_mut()).enumerate() {
        if e.len() != dims {
            return Err(ClusterError::DimensionMismatch {
                index,
                expected: dims,
                found: e.len(),
            });
        }
        if e.iter().any(|v| !v.is_finite()) {
            return Err(ClusterError::NonFinite(index));
        }
        row.iter_mut().zip(e).for_each(|(dst, src)| *dst = *src);
    }
    Ok(points)
}

fn pairwise_euclidean(points: &Array2<f64>) -> Array2<f64> {
    let n = points.nrows();
    let mut dist = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let diff = &points.row(i) - &points.row(j);
            let d = diff.dot(&diff).sqrt();
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }
    dist
}

/// Builds the full dendrogram. `dist` is updated in place: after a merge the
/// surviving slot holds the distances of the joined cluster.
fn nn_chain(dist: &mut Array2<f64>, linkage: Linkage) -> Vec<Merge> {
    let n = dist.nrows();
    let mut size = vec![1.0f64; n];
    let mut active = vec![true; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    while merges.len() + 1 < n {
        if chain.is_empty() {
            let Some(start) = active.iter().position(|&a| a) else {
                break;
            };
            chain.push(start);
        }

        let tip = chain[chain.len() - 1];
        let prev = chain.len().checked_sub(2).map(|i| chain[i]);

        // Ties keep the previous chain element so reciprocal pairs are found.
        let (mut nearest, mut nearest_d) = match prev {
            Some(p) => (Some(p), dist[[tip, p]]),
            None => (None, f64::INFINITY),
        };
        for k in 0..n {
            if k != tip && active[k] && dist[[tip, k]] < nearest_d {
                nearest = Some(k);
                nearest_d = dist[[tip, k]];
            }
        }
        let Some(nearest) = nearest else {
            break;
        };

        if Some(nearest) == prev {
            chain.truncate(chain.len() - 2);
            merge_slots(dist, &mut size, &mut active, tip, nearest, linkage);
            merges.push(Merge {
                absorbed: tip,
                into: nearest,
                height: nearest_d,
            });
        } else {
            chain.push(nearest);
        }
    }
    merges
}

fn merge_slots(
    dist: &mut Array2<f64>,
    size: &mut [f64],
    active: &mut [bool],
    absorbed: usize,
    into: usize,
    linkage: Linkage,
) {
    let d_ij = dist[[absorbed, into]];
    for k in 0..dist.nrows() {
        if !active[k] || k == absorbed || k == into {
            continue;
        }
        let d = linkage.update(
            dist[[k, absorbed]],
            dist[[k, into]],
            d_ij,
            size[absorbed],
            size[into],
            size[k],
        );
        dist[[k, into]] = d;
        dist[[into, k]] = d;
    }
    active[absorbed] = false;
    size[into] += size[absorbed];
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::{BTreeSet, HashMap};

    fn clusterer(threshold: f64, linkage: Linkage) -> AgglomerativeClusterer {
        AgglomerativeClusterer::new(threshold, linkage).unwrap()
    }

    /// Partition as a set of sets of input positions, independent of label values.
    fn partition(labels: &[usize]) -> BTreeSet<BTreeSet<usize>> {
        let mut groups: HashMap<usize, BTreeSet<usize>> = HashMap::new();
        for (i, &l) in labels.iter().enumerate() {
            groups.entry(l).or_default().insert(i);
        }
        groups.into_values().collect()
    }

    fn set(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    /// Deterministic pseudo-random points in clumps.
    fn scattered_points(n: usize, dims: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut state = seed;
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 11) as f64) / ((1u64 << 53) as f64)
        };
        (0..n)
            .map(|i| {
                let centre = (i % 4) as f64 * 6.0;
                (0..dims).map(|_| centre + next() * 4.0).collect()
            })
            .collect()
    }

    /// Closest-pair-first reference clustering, stopping at the threshold.
    fn naive_labels(points: &[Vec<f64>], threshold: f64, linkage: Linkage) -> Vec<usize> {
        let matrix = to_matrix(points).unwrap();
        let mut dist = pairwise_euclidean(&matrix);
        let n = points.len();
        let mut size = vec![1.0; n];
        let mut active = vec![true; n];
        let mut parent: Vec<usize> = (0..n).collect();
        loop {
            let mut best: Option<(usize, usize, f64)> = None;
            for i in 0..n {
                for j in (i + 1)..n {
                    if active[i] && active[j] && best.map_or(true, |b| dist[[i, j]] < b.2) {
                        best = Some((i, j, dist[[i, j]]));
                    }
                }
            }
            match best {
                Some((i, j, d)) if d < threshold => {
                    merge_slots(&mut dist, &mut size, &mut active, i, j, linkage);
                    union_find::union(&mut parent, i, j);
                }
                _ => break,
            }
        }
        union_find::labels_by_first_appearance(&mut parent)
    }

    #[test]
    fn test_three_similar_two_distinct() {
        let embeddings = vec![
            vec![0.0, 0.0, 0.0, 0.0],
            vec![10.0, 0.0, 0.0, 0.0],
            vec![0.1, 0.0, 0.0, 0.0],
            vec![0.0, 10.0, 0.0, 0.0],
            vec![0.0, 0.1, 0.0, 0.0],
        ];
        let labels = AgglomerativeClusterer::default().cluster(&embeddings).unwrap();
        assert_eq!(
            partition(&labels),
            BTreeSet::from([set(&[0, 2, 4]), set(&[1]), set(&[3])])
        );
    }

    #[test]
    fn test_labels_numbered_by_first_appearance() {
        let embeddings = vec![vec![50.0], vec![0.0], vec![50.5], vec![0.2]];
        let labels = AgglomerativeClusterer::default().cluster(&embeddings).unwrap();
        assert_eq!(labels, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_empty_input() {
        assert!(AgglomerativeClusterer::default().cluster(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_embedding_is_one_cluster() {
        let labels = AgglomerativeClusterer::default()
            .cluster(&[vec![1.0, 2.0]])
            .unwrap();
        assert_eq!(labels, vec![0]);
    }

    #[test]
    fn test_pair_exactly_at_threshold_stays_apart() {
        let embeddings = vec![vec![0.0, 0.0], vec![3.0, 4.0]];
        let labels = clusterer(5.0, Linkage::Ward).cluster(&embeddings).unwrap();
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn test_pair_just_below_threshold_merges() {
        let embeddings = vec![vec![0.0, 0.0], vec![3.0, 3.99]];
        let labels = clusterer(5.0, Linkage::Ward).cluster(&embeddings).unwrap();
        assert_eq!(labels, vec![0, 0]);
    }

    #[rstest]
    #[case::single(Linkage::Single, vec![0, 0, 0])]
    #[case::complete(Linkage::Complete, vec![0, 0, 1])]
    #[case::average(Linkage::Average, vec![0, 0, 1])]
    #[case::ward(Linkage::Ward, vec![0, 0, 1])]
    fn test_linkage_controls_chaining(#[case] linkage: Linkage, #[case] expected: Vec<usize>) {
        let embeddings = vec![vec![0.0], vec![4.0], vec![8.5]];
        assert_eq!(clusterer(5.0, linkage).cluster(&embeddings).unwrap(), expected);
    }

    #[rstest]
    #[case(Linkage::Ward)]
    #[case(Linkage::Complete)]
    #[case(Linkage::Average)]
    #[case(Linkage::Single)]
    fn test_matches_closest_pair_reference(#[case] linkage: Linkage) {
        let points = scattered_points(40, 3, 7);
        let fast = clusterer(5.0, linkage).cluster(&points).unwrap();
        let reference = naive_labels(&points, 5.0, linkage);
        assert_eq!(partition(&fast), partition(&reference));
    }

    #[test]
    fn test_repeat_runs_give_same_partition() {
        let points = scattered_points(30, 8, 99);
        let c = AgglomerativeClusterer::default();
        let first = c.cluster(&points).unwrap();
        let second = c.cluster(&points).unwrap();
        assert_eq!(partition(&first), partition(&second));
    }

    #[test]
    fn test_ward_height_for_singletons_is_euclidean() {
        let mut dist = pairwise_euclidean(&to_matrix(&[vec![0.0, 0.0], vec![6.0, 8.0]]).unwrap());
        let merges = nn_chain(&mut dist, Linkage::Ward);
        assert_eq!(merges.len(), 1);
        assert!((merges[0].height - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let err = AgglomerativeClusterer::default()
            .cluster(&[vec![0.0, 1.0], vec![0.0]])
            .unwrap_err();
        assert_eq!(
            err,
            ClusterError::DimensionMismatch {
                index: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_non_finite_is_error() {
        let err = AgglomerativeClusterer::default()
            .cluster(&[vec![0.0], vec![f64::NAN]])
            .unwrap_err();
        assert_eq!(err, ClusterError::NonFinite(1));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::INFINITY)]
    fn test_invalid_threshold_rejected(#[case] threshold: f64) {
        assert!(AgglomerativeClusterer::new(threshold, Linkage::Ward).is_err());
    }

    #[test]
    fn test_linkage_parses_case_insensitively() {
        assert_eq!("Ward".parse::<Linkage>().unwrap(), Linkage::Ward);
        assert_eq!("single".parse::<Linkage>().unwrap(), Linkage::Single);
        assert!("centroid".parse::<Linkage>().is_err());
        assert_eq!(Linkage::Average.to_string(), "average");
    }
}
