pub mod identity_clusterer;
