pub mod blocks;
pub mod classify;
pub mod core;
pub mod export;
pub mod extract;
pub mod layout;
pub mod lines;
pub mod pipeline;
pub mod render;

pub use core::model::{Block, DocumentTables, ExtractedTable, Label};
pub use extract::TableExtractor;
