use std::path::Path;

use tracing::warn;

use super::text::{apply_text, clean_text, normalize_encoding};
use crate::core::config::BlockSettings;
use crate::core::geometry::BBox;
use crate::core::model::{Block, PageImage};
use crate::render::TextExtractor;

/// Reads the text under every block and derives the textual features.
#[derive(Debug, Clone)]
pub struct BlockFeatureExtractor<T> {
    extractor: T,
    settings: BlockSettings,
}

impl<T: TextExtractor> BlockFeatureExtractor<T> {
    pub fn new(extractor: T, settings: BlockSettings) -> Self {
        Self {
            extractor,
            settings,
        }
    }

    /// Text window of a block in points, padded on the right and bottom.
    pub fn text_window(&self, page: &PageImage, block: &Block) -> BBox {
        let x = block.left as f32 * page.horizontal_ratio;
        let y = block.top as f32 * page.vertical_ratio;
        let width = block.width as f32 * page.horizontal_ratio + self.settings.window_padding;
        let height = block.height as f32 * page.vertical_ratio + self.settings.window_padding;
        BBox::new(x, y, x + width, y + height)
    }

    pub fn extract(&self, pdf_path: &Path, page: &PageImage, blocks: Vec<Block>) -> Vec<Block> {
        blocks
            .into_iter()
            .map(|mut block| {
                let window = self.text_window(page, &block);
                let raw = match self.extractor.text_in_region(pdf_path, page.page_idx, &window) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(
                            document = %pdf_path.display(),
                            page = page.page_idx + 1,
                            block = block.pos,
                            error = %e,
                            "text extraction failed, block left empty"
                        );
                        String::new()
                    }
                };
                apply_text(&mut block, clean_text(&normalize_encoding(&raw)));
                block
            })
            .collect()
    }

    /// Feature extraction followed by both block post-processors.
    pub fn extract_and_tidy(
        &self,
        pdf_path: &Path,
        page: &PageImage,
        blocks: Vec<Block>,
    ) -> Vec<Block> {
        let blocks = self.extract(pdf_path, page, blocks);
        let blocks = filter_unwanted_blocks(blocks, self.settings.footer_fraction);
        split_merged_rows(blocks)
    }
}

/// Drops blocks without text and blocks in the footer band.
///
/// The footer band starts at `footer_fraction` of the lowest block top on the page.
pub fn filter_unwanted_blocks(blocks: Vec<Block>, footer_fraction: f32) -> Vec<Block> {
    let Some(max_top) = blocks.iter().map(|b| b.top).max() else {
        return blocks;
    };
    let footer = max_top as f32 * footer_fraction;
    blocks
        .into_iter()
        .filter(|b| b.text_length > 0 && (b.top as f32) < footer)
        .collect()
}

/// Splits blocks whose text spans several lines into one block per line, each taking an
/// equal slice of the parent's height. The first slice keeps the parent's `pos`.
pub fn split_merged_rows(blocks: Vec<Block>) -> Vec<Block> {
    let mut next_pos = blocks.iter().map(|b| b.pos).max().unwrap_or(0) + 1;
    let mut out = Vec::with_capacity(blocks.len());

    for block in blocks {
        if !block.possible_row_merger {
            out.push(block);
            continue;
        }
        let lines: Vec<&str> = block.text.split('\n').collect();
        let slice = block.height / lines.len() as i32;
        let mut first = true;
        for (i, line) in lines.iter().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut child = block.clone();
            if !first {
                child.pos = next_pos;
                next_pos += 1;
            }
            first = false;
            child.set_bounds(block.left, block.top + i as i32 * slice, block.width, slice);
            child.area = (block.width.max(0) * slice.max(0)) as u32;
            apply_text(&mut child, line.to_string());
            child.possible_row_merger = false;
            out.push(child);
        }
    }
    out
}
