//! Row and column reconstruction for labelled, table-segmented blocks.

pub mod columns;
pub mod rows;

use std::collections::BTreeMap;

use image::GrayImage;
use tracing::debug;

use crate::core::config::LayoutSettings;
use crate::core::model::{Block, TableGrid};

use columns::ColumnFilter;

pub struct RowColumnReconstructor {
    settings: LayoutSettings,
}

impl RowColumnReconstructor {
    pub fn new(settings: LayoutSettings) -> Self {
        Self { settings }
    }

    /// Assigns `row_index` and `col_index` to the blocks of every table group.
    ///
    /// Indices from a previous run are cleared first, so running twice gives the same result.
    pub fn reconstruct(&self, image: &GrayImage, blocks: &mut [Block]) -> Vec<TableGrid> {
        for block in blocks.iter_mut() {
            block.row_index = None;
            block.col_index = None;
        }

        let mut groups: BTreeMap<Option<usize>, Vec<usize>> = BTreeMap::new();
        for (i, block) in blocks.iter().enumerate() {
            groups.entry(block.table).or_default().push(i);
        }

        let mut grids = Vec::with_capacity(groups.len());
        for (table, members) in groups {
            let row_bounds = rows::row_boundaries(blocks, &members);
            if rows::assign_rows(blocks, &members) == 0 {
                debug!(?table, "no rows in table group");
                continue;
            }

            let filter = ColumnFilter::new(image, blocks, &members, &self.settings);
            let Some(h_start) = members.iter().map(|&i| blocks[i].left).min() else {
                continue;
            };
            let candidates = columns::candidate_rights(blocks, &members);
            let cols = columns::column_boundaries(&filter, h_start, &candidates);
            let cols = columns::split_overlapping(&filter, cols);
            columns::assign_columns(blocks, &members, &cols);
            debug!(?table, rows = row_bounds.len(), columns = cols.len(), "reconstructed grid");

            grids.push(TableGrid {
                table,
                rows: row_bounds,
                columns: cols,
            });
        }
        grids
    }
}
