//! The two table extraction strategies behind one capability trait.

pub mod block_based;
pub mod line_based;
pub mod summary;

use std::path::Path;

use anyhow::Result;

use crate::core::model::{ExtractedTable, PageDebug, PageImage, PageStatus};

pub use block_based::BlockTableExtractor;
pub use line_based::LineTableExtractor;

/// What one page produced.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub status: PageStatus,
    pub tables: Vec<ExtractedTable>,
    pub debug: Option<PageDebug>,
}

impl PageExtraction {
    pub fn empty(status: PageStatus) -> Self {
        Self {
            status,
            tables: Vec::new(),
            debug: None,
        }
    }

    pub fn with_debug(mut self, debug: PageDebug) -> Self {
        self.debug = Some(debug);
        self
    }
}

/// Recovers the tables of one rasterized page.
pub trait TableExtractor {
    fn name(&self) -> &'static str;

    fn extract_page(&self, pdf_path: &Path, page: &PageImage) -> Result<PageExtraction>;
}
