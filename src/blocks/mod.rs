//! Page segmentation into ink blocks and their textual features.

pub mod features;
pub mod generator;
pub mod text;

pub use features::{filter_unwanted_blocks, split_merged_rows, BlockFeatureExtractor};
pub use generator::BlockGenerator;
