use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, Mask};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::core::config::BlockSettings;
use crate::core::model::Block;

/// Smears nearby ink into islands and enumerates each island as a [`Block`].
#[derive(Debug, Clone)]
pub struct BlockGenerator {
    settings: BlockSettings,
}

#[derive(Default)]
struct ComponentStats {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    count: u64,
    sum_x: u64,
    sum_y: u64,
}

impl BlockGenerator {
    pub fn new(settings: BlockSettings) -> Self {
        Self { settings }
    }

    /// Ink as foreground (255) on a zero background.
    pub fn binarize(&self, image: &GrayImage) -> GrayImage {
        let threshold = self.settings.ink_threshold;
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            if image.get_pixel(x, y)[0] < threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }

    /// Binarised image after the configured number of rectangular dilations.
    pub fn smear(&self, image: &GrayImage) -> GrayImage {
        let (w, h) = (self.settings.kernel_width, self.settings.kernel_height);
        let kernel = GrayImage::from_pixel(w, h, Luma([255u8]));
        let mask = Mask::from_image(&kernel, (w / 2) as u8, (h / 2) as u8);

        let mut smeared = self.binarize(image);
        for _ in 0..self.settings.dilation_iterations {
            smeared = grayscale_dilate(&smeared, &mask);
        }
        smeared
    }

    pub fn generate(&self, image: &GrayImage) -> Vec<Block> {
        let smeared = self.smear(image);
        let labels = connected_components(&smeared, Connectivity::Eight, Luma([0u8]));

        let mut stats: BTreeMap<u32, ComponentStats> = BTreeMap::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            let entry = stats.entry(label).or_insert_with(|| ComponentStats {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                ..Default::default()
            });
            entry.min_x = entry.min_x.min(x);
            entry.min_y = entry.min_y.min(y);
            entry.max_x = entry.max_x.max(x);
            entry.max_y = entry.max_y.max(y);
            entry.count += 1;
            entry.sum_x += x as u64;
            entry.sum_y += y as u64;
        }

        let blocks: Vec<Block> = stats
            .into_iter()
            .map(|(label, s)| {
                let mut block = Block::new(
                    label as usize,
                    s.min_x as i32,
                    s.min_y as i32,
                    (s.max_x - s.min_x + 1) as i32,
                    (s.max_y - s.min_y + 1) as i32,
                );
                block.area = s.count as u32;
                block.centroid_x = s.sum_x as f32 / s.count as f32;
                block.centroid_y = s.sum_y as f32 / s.count as f32;
                block
            })
            .collect();

        debug!(count = blocks.len(), "generated blocks");
        blocks
    }

    pub fn is_blank(&self, blocks: &[Block]) -> bool {
        blocks.len() <= self.settings.blank_page_blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use pretty_assertions::assert_eq;

    fn generator() -> BlockGenerator {
        BlockGenerator::new(BlockSettings::default())
    }

    #[test]
    fn nearby_words_merge_distant_cells_do_not() {
        let mut image = GrayImage::from_pixel(600, 200, Luma([255]));
        // two words 12px apart form one cell, a third word 150px away is its own cell
        draw_filled_rect_mut(&mut image, Rect::at(50, 50).of_size(60, 12), Luma([0]));
        draw_filled_rect_mut(&mut image, Rect::at(122, 50).of_size(60, 12), Luma([0]));
        draw_filled_rect_mut(&mut image, Rect::at(330, 50).of_size(60, 12), Luma([0]));

        let mut blocks = generator().generate(&image);
        blocks.sort_by_key(|b| b.left);

        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].left < 50 && blocks[0].right > 182);
        assert!(blocks[1].left < 330 && blocks[1].right > 390);
        assert!(blocks.iter().all(|b| b.pos >= 1));
    }

    #[test]
    fn sparse_page_is_blank() {
        let mut image = GrayImage::from_pixel(300, 300, Luma([255]));
        draw_filled_rect_mut(&mut image, Rect::at(10, 10).of_size(20, 10), Luma([0]));
        let engine = generator();
        let blocks = engine.generate(&image);
        assert_eq!(blocks.len(), 1);
        assert!(engine.is_blank(&blocks));
    }

    #[test]
    fn smear_grows_ink_wider_than_tall() {
        let mut image = GrayImage::from_pixel(200, 200, Luma([255]));
        image.put_pixel(100, 100, Luma([0]));
        let smeared = generator().smear(&image);
        assert_eq!(smeared.get_pixel(85, 100)[0], 255);
        assert_eq!(smeared.get_pixel(115, 100)[0], 255);
        assert_eq!(smeared.get_pixel(100, 110)[0], 0);
    }
}
