use crate::core::model::{Block, Label};

/// Sorted, distinct row boundaries of one table group.
///
/// The header band (or the group's top when there are no headers) opens the table;
/// every number bottom and every unlabelled bottom closes a row.
pub fn row_boundaries(blocks: &[Block], members: &[usize]) -> Vec<i32> {
    let group = || members.iter().map(|&i| &blocks[i]);
    let mut bounds = Vec::new();

    let header_top = group().filter(|b| b.is(Label::Header)).map(|b| b.top).min();
    let header_bottom = group().filter(|b| b.is(Label::Header)).map(|b| b.bottom).max();
    match (header_top, header_bottom) {
        (Some(top), Some(bottom)) => bounds.extend([top, bottom]),
        _ => bounds.extend(group().map(|b| b.top).min()),
    }
    bounds.extend(
        group()
            .filter(|b| b.is(Label::NumberValues) || b.is_unlabeled())
            .map(|b| b.bottom),
    );

    bounds.sort_unstable();
    bounds.dedup();
    bounds
}

/// Puts every non-title member into the band its top falls in; returns how many were placed.
pub fn assign_rows(blocks: &mut [Block], members: &[usize]) -> usize {
    let bounds = row_boundaries(blocks, members);
    let mut placed = 0;
    for &i in members {
        let block = &mut blocks[i];
        if block.is(Label::Title) {
            continue;
        }
        for (row, band) in bounds.windows(2).enumerate() {
            if band[0] <= block.top && block.top <= band[1] {
                block.row_index = Some(row);
            }
        }
        if block.row_index.is_some() {
            placed += 1;
        }
    }
    placed
}
