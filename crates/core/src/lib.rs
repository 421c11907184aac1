pub mod analysis;
pub mod clustering;
pub mod detection;
pub mod frames;
pub mod pipeline;
pub mod shared;
