pub mod agglomerative_clusterer;
mod union_find;
