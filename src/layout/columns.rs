use std::collections::{BTreeMap, BTreeSet};

use image::GrayImage;
use tracing::debug;

use crate::core::config::LayoutSettings;
use crate::core::model::Block;

/// Right edges of the blocks in the fullest rows. These are the column end candidates.
pub fn candidate_rights(blocks: &[Block], members: &[usize]) -> Vec<i32> {
    let mut per_row: BTreeMap<usize, Vec<i32>> = BTreeMap::new();
    for &i in members {
        if let Some(row) = blocks[i].row_index {
            per_row.entry(row).or_default().push(blocks[i].right);
        }
    }
    let fullest = per_row.values().map(Vec::len).max().unwrap_or(0);
    let rights: BTreeSet<i32> = per_row
        .into_values()
        .filter(|rights| rights.len() == fullest)
        .flatten()
        .collect();
    rights.into_iter().collect()
}

/// Checks column candidates of one table against the page raster and the blocks.
pub struct ColumnFilter<'a> {
    image: &'a GrayImage,
    blocks: &'a [Block],
    members: &'a [usize],
    settings: &'a LayoutSettings,
    v_start: i32,
    v_end: i32,
}

impl<'a> ColumnFilter<'a> {
    pub fn new(
        image: &'a GrayImage,
        blocks: &'a [Block],
        members: &'a [usize],
        settings: &'a LayoutSettings,
    ) -> Self {
        let v_start = members.iter().map(|&i| blocks[i].top).min().unwrap_or(0);
        let v_end = members.iter().map(|&i| blocks[i].bottom).max().unwrap_or(0);
        Self {
            image,
            blocks,
            members,
            settings,
            v_start,
            v_end,
        }
    }

    /// Non-background pixels in pixel column `x` over the table's vertical span.
    fn dark_pixels(&self, x: i32) -> usize {
        if x < 0 || x as u32 >= self.image.width() {
            return 0;
        }
        let start = self.v_start.max(0) as u32;
        let end = (self.v_end.max(0) as u32).min(self.image.height());
        (start..end)
            .filter(|&y| self.image.get_pixel(x as u32, y)[0] < self.settings.background)
            .count()
    }

    fn has_block_starting_in(&self, low: i32, high: i32) -> bool {
        self.members.iter().any(|&i| {
            let b = &self.blocks[i];
            b.row_index.is_some() && low <= b.left && b.left <= high
        })
    }

    /// Keeps candidates that cross no drawn rule, sit past the label column and close
    /// a column some row-assigned block actually starts in.
    pub fn filter(&self, candidates: &[i32]) -> Vec<i32> {
        let sorted: BTreeSet<i32> = candidates.iter().copied().collect();
        let dark_limit = (self.v_end - self.v_start) as f32 * self.settings.dark_pixel_ratio;
        let mut previous = self.settings.column_origin;
        let mut kept = Vec::new();
        for x in sorted {
            if self.dark_pixels(x) as f32 >= dark_limit {
                continue;
            }
            if x <= self.settings.min_column_position {
                continue;
            }
            if !self.has_block_starting_in(previous, x - self.settings.column_gap) {
                continue;
            }
            kept.push(x);
            previous = x;
        }
        kept
    }
}

/// First column boundary followed by the accepted candidates.
pub fn column_boundaries(filter: &ColumnFilter<'_>, start: i32, candidates: &[i32]) -> Vec<i32> {
    std::iter::once(start).chain(filter.filter(candidates)).collect()
}

/// Smallest right edge of every row that has more than one block starting in `[low, high]`.
fn overlapping_rights(blocks: &[Block], members: &[usize], low: i32, high: i32) -> BTreeSet<i32> {
    let mut per_row: BTreeMap<usize, Vec<i32>> = BTreeMap::new();
    for &i in members {
        let b = &blocks[i];
        if let Some(row) = b.row_index {
            if low <= b.left && b.left <= high {
                per_row.entry(row).or_default().push(b.right);
            }
        }
    }
    per_row
        .into_values()
        .filter(|rights| rights.len() > 1)
        .filter_map(|rights| rights.into_iter().min())
        .collect()
}

/// Splits every column band (except the label column) in which some row has two or
/// more blocks, by inserting that row's smallest right edge as a new boundary.
///
/// A split is kept only when the refiltered list grows, and the number of rounds is
/// bounded by the distinct right edges in the table.
pub fn split_overlapping(filter: &ColumnFilter<'_>, mut cols: Vec<i32>) -> Vec<i32> {
    let distinct_rights: BTreeSet<i32> = filter
        .members
        .iter()
        .map(|&i| filter.blocks[i].right)
        .collect();
    for _ in 0..=distinct_rights.len() {
        let mut grown = None;
        for band in 1..cols.len().saturating_sub(1) {
            let inserted =
                overlapping_rights(filter.blocks, filter.members, cols[band], cols[band + 1]);
            if inserted.is_empty() {
                continue;
            }
            let mut candidates = cols[1..].to_vec();
            candidates.extend(inserted);
            let next = column_boundaries(filter, cols[0], &candidates);
            if next.len() > cols.len() {
                grown = Some(next);
                break;
            }
        }
        match grown {
            Some(next) => {
                debug!(before = cols.len(), after = next.len(), "split overlapping column");
                cols = next;
            }
            None => break,
        }
    }
    cols
}

/// Puts each member into the band its left edge falls in. Bands include both ends and
/// the later band wins on a shared boundary.
pub fn assign_columns(blocks: &mut [Block], members: &[usize], cols: &[i32]) {
    for &i in members {
        let block = &mut blocks[i];
        for (col, band) in cols.windows(2).enumerate() {
            if band[0] <= block.left && block.left <= band[1] {
                block.col_index = Some(col);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_line_segment_mut;
    use pretty_assertions::assert_eq;

    fn placed(pos: usize, left: i32, right: i32, top: i32, row: usize) -> Block {
        let mut b = Block::new(pos, left, top, right - left, 30);
        b.row_index = Some(row);
        b
    }

    #[test]
    fn candidates_come_from_the_fullest_rows() {
        let blocks = vec![
            placed(1, 150, 300, 100, 0),
            placed(2, 320, 400, 100, 0),
            placed(3, 420, 500, 100, 0),
            placed(4, 150, 300, 150, 1),
            placed(5, 420, 510, 150, 1),
        ];
        assert_eq!(candidate_rights(&blocks, &[0, 1, 2, 3, 4]), vec![300, 400, 500]);
    }

    #[test]
    fn rejects_candidates_crossing_a_drawn_rule() {
        let mut image = GrayImage::from_pixel(1000, 400, Luma([255]));
        draw_line_segment_mut(&mut image, (500.0, 0.0), (500.0, 399.0), Luma([0]));
        let blocks = vec![
            placed(1, 150, 310, 100, 0),
            placed(2, 320, 400, 100, 0),
            placed(3, 420, 500, 100, 0),
            placed(4, 520, 600, 100, 0),
        ];
        let members = [0, 1, 2, 3];
        let settings = LayoutSettings::default();
        let filter = ColumnFilter::new(&image, &blocks, &members, &settings);

        assert_eq!(filter.filter(&[310, 400, 500, 600]), vec![310, 400, 600]);
    }

    #[test]
    fn light_grey_rule_still_counts_as_dark() {
        let mut image = GrayImage::from_pixel(1000, 400, Luma([255]));
        // anti-aliased rendering leaves pale grey rather than black
        draw_line_segment_mut(&mut image, (500.0, 0.0), (500.0, 399.0), Luma([230]));
        let blocks = vec![
            placed(1, 150, 310, 100, 0),
            placed(2, 320, 400, 100, 0),
            placed(3, 420, 500, 100, 0),
            placed(4, 520, 600, 100, 0),
        ];
        let members = [0, 1, 2, 3];
        let settings = LayoutSettings::default();
        let filter = ColumnFilter::new(&image, &blocks, &members, &settings);

        assert_eq!(filter.filter(&[310, 400, 500, 600]), vec![310, 400, 600]);
    }

    #[test]
    fn candidate_needs_a_block_starting_before_it() {
        let image = GrayImage::from_pixel(1000, 400, Luma([255]));
        let blocks = vec![placed(1, 150, 310, 100, 0), placed(2, 320, 700, 100, 0)];
        let members = [0, 1];
        let settings = LayoutSettings::default();
        let filter = ColumnFilter::new(&image, &blocks, &members, &settings);

        // nothing starts between 400 and 695
        assert_eq!(filter.filter(&[310, 400, 700]), vec![310, 400]);
    }
}
