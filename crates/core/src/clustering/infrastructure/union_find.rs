//! Disjoint-set forest used to cut a dendrogram into flat clusters.

/// Find root of element `i` with path halving for amortized near-O(1).
pub fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Merge the sets containing `a` and `b`.
pub fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

/// Dense labels `0..k`, numbered by first appearance in element order.
pub fn labels_by_first_appearance(parent: &mut [usize]) -> Vec<usize> {
    let n = parent.len();
    let mut root_label: Vec<Option<usize>> = vec![None; n];
    let mut next = 0;
    (0..n)
        .map(|i| {
            let root = find(parent, i);
            *root_label[root].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}
