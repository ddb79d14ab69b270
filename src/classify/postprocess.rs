use std::collections::BTreeSet;

use tracing::debug;

use super::rules::is_keyword_header;
use crate::blocks::text::apply_text;
use crate::core::config::ClassifierSettings;
use crate::core::model::{Block, Label};

/// Result of a merge pass: surviving blocks and the `pos` of every block folded into another.
#[derive(Debug, Clone, Default)]
pub struct Merged {
    pub blocks: Vec<Block>,
    pub absorbed: BTreeSet<usize>,
}

/// Splits the page into table groups at large gaps between titles.
///
/// A separator needs at least one number strictly above and below it. Bands include both
/// ends; a block on a shared boundary belongs to the later band. Table indices start at 1.
pub fn segment_tables(mut blocks: Vec<Block>) -> Vec<Block> {
    let (Some(begin), Some(end)) = (
        blocks.iter().map(|b| b.top).min(),
        blocks.iter().map(|b| b.bottom).max(),
    ) else {
        return blocks;
    };

    let mut title_tops: Vec<i32> = blocks
        .iter()
        .filter(|b| b.is(Label::Title))
        .map(|b| b.top)
        .collect();
    title_tops.sort_unstable();

    let gaps: Vec<(i32, i32)> = title_tops
        .windows(2)
        .map(|w| (w[1], w[1] - w[0]))
        .collect();
    let mut bounds = vec![begin];
    if !gaps.is_empty() {
        let mean = gaps.iter().map(|g| g.1 as f64).sum::<f64>() / gaps.len() as f64;
        for (top, gap) in gaps {
            if (gap as f64) <= mean {
                continue;
            }
            let above = blocks
                .iter()
                .any(|b| b.is(Label::NumberValues) && b.top < top);
            let below = blocks
                .iter()
                .any(|b| b.is(Label::NumberValues) && b.top > top);
            if above && below {
                bounds.push(top);
            }
        }
    }
    bounds.push(end);

    for block in &mut blocks {
        block.table = None;
        for (i, band) in bounds.windows(2).enumerate() {
            if band[0] <= block.top && block.top <= band[1] {
                block.table = Some(i + 1);
            }
        }
    }
    debug!(tables = bounds.len() - 1, "segmented tables");
    blocks
}

fn merge_order(blocks: &[Block]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..blocks.len()).collect();
    order.sort_by_key(|&i| (blocks[i].top, blocks[i].left, blocks[i].pos));
    order
}

/// Folds header fragments stacked under one another into a single header block.
pub fn combine_headers(blocks: Vec<Block>, already: &BTreeSet<usize>) -> Merged {
    let mut absorbed = BTreeSet::new();
    let mut emitted = BTreeSet::new();
    let mut out = Vec::with_capacity(blocks.len());

    for i in merge_order(&blocks) {
        let row = &blocks[i];
        if absorbed.contains(&row.pos) {
            continue;
        }
        let mut merged = row.clone();
        if row.is(Label::Header) {
            let mut nearby: Vec<&Block> = blocks
                .iter()
                .filter(|b| {
                    b.pos != row.pos
                        && b.is(Label::Header)
                        && b.table == row.table
                        && row.left - row.width <= b.left
                        && b.left <= row.right
                        && !absorbed.contains(&b.pos)
                        && !emitted.contains(&b.pos)
                        && !already.contains(&b.pos)
                })
                .collect();
            nearby.sort_by_key(|b| b.top);
            if !nearby.is_empty() {
                let text = std::iter::once(row.text.as_str())
                    .chain(nearby.iter().map(|b| b.text.as_str()))
                    .collect::<Vec<_>>()
                    .join(" ")
                    .replace('\n', " ");
                let width = nearby.iter().map(|b| b.width).fold(row.width, i32::max);
                let height = row.height + nearby.iter().map(|b| b.height).sum::<i32>();
                let left = nearby.iter().map(|b| b.left).fold(row.left, i32::min);
                merged.set_bounds(left, row.top, width, height);
                apply_text(&mut merged, text);
                absorbed.extend(nearby.iter().map(|b| b.pos));
            }
        }
        emitted.insert(merged.pos);
        out.push(merged);
    }

    out.retain(|b| !absorbed.contains(&b.pos));
    Merged {
        blocks: out,
        absorbed,
    }
}

/// Unlabels headers whose top lies more than `z` standard deviations from the table's
/// header mean. Keyword headers are kept.
pub fn remove_false_headers(mut blocks: Vec<Block>, settings: &ClassifierSettings) -> Vec<Block> {
    let tables: BTreeSet<Option<usize>> = blocks.iter().map(|b| b.table).collect();
    let mut demote = BTreeSet::new();

    for table in tables {
        let tops: Vec<(usize, f64)> = blocks
            .iter()
            .filter(|b| b.table == table && b.is(Label::Header))
            .map(|b| (b.pos, b.top as f64))
            .collect();
        if tops.len() < 2 {
            continue;
        }
        let n = tops.len() as f64;
        let mean = tops.iter().map(|t| t.1).sum::<f64>() / n;
        let std = (tops.iter().map(|t| (t.1 - mean).powi(2)).sum::<f64>() / n).sqrt();
        if std == 0.0 {
            continue;
        }
        for (pos, top) in tops {
            if ((top - mean) / std).abs() > settings.false_header_z as f64 {
                demote.insert(pos);
            }
        }
    }

    for block in blocks.iter_mut() {
        if demote.contains(&block.pos) && !is_keyword_header(block, settings) {
            debug!(pos = block.pos, top = block.top, "unlabelled outlier header");
            block.label = None;
        }
    }
    blocks
}

fn combinable(block: &Block) -> bool {
    !block.is(Label::Header) && !block.is(Label::NumberValues)
}

/// Joins text runs that were cut into several blocks on the same line.
pub fn combine_horizontal(blocks: Vec<Block>, tolerance: i32, already: &BTreeSet<usize>) -> Merged {
    let mut absorbed = BTreeSet::new();
    let mut emitted = BTreeSet::new();
    let mut out = Vec::with_capacity(blocks.len());

    for i in merge_order(&blocks) {
        let row = &blocks[i];
        if absorbed.contains(&row.pos) {
            continue;
        }
        let mut merged = row.clone();
        if combinable(row) {
            let nearby: Vec<&Block> = blocks
                .iter()
                .filter(|b| {
                    b.pos != row.pos
                        && combinable(b)
                        && row.left - tolerance <= b.left
                        && b.left <= row.right + tolerance
                        && (b.top - row.top).abs() <= tolerance
                        && !absorbed.contains(&b.pos)
                        && !emitted.contains(&b.pos)
                        && !already.contains(&b.pos)
                })
                .collect();
            if !nearby.is_empty() {
                let text = std::iter::once(row.text.as_str())
                    .chain(nearby.iter().map(|b| b.text.as_str()))
                    .collect::<Vec<_>>()
                    .join(" ");
                let width = row.width + nearby.iter().map(|b| b.width).sum::<i32>();
                merged.set_bounds(row.left, row.top, width, row.height);
                apply_text(&mut merged, text);
                absorbed.extend(nearby.iter().map(|b| b.pos));
            }
        }
        emitted.insert(merged.pos);
        out.push(merged);
    }

    out.retain(|b| !absorbed.contains(&b.pos));
    Merged {
        blocks: out,
        absorbed,
    }
}
