use std::sync::LazyLock;

use regex::Regex;

use crate::core::config::ClassifierSettings;
use crate::core::model::{Block, Label};

static CELL_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]*\sRs\s[0-9,NniIlL]*$").expect("valid cell summary regex")
});

/// Label assignments produced by one pass, keyed by block `pos`.
pub type Assignments = Vec<(usize, Label)>;

/// A classification pass. Reads an immutable snapshot of the page and proposes labels.
pub type Rule = fn(&[Block], &ClassifierSettings) -> Assignments;

/// The fixed rule order.
pub const RULES: [(&str, Rule); 6] = [
    ("number_values", number_values),
    ("header", header),
    ("grouping", grouping),
    ("title", title),
    ("probable_headers", probable_headers),
    ("cell_summary", cell_summary),
];

/// Headers named by a fiscal keyword; no later pass may relabel them.
pub fn is_keyword_header(block: &Block, settings: &ClassifierSettings) -> bool {
    settings
        .header_keywords
        .iter()
        .any(|k| block.text.contains(k.as_str()))
}

fn numbers(blocks: &[Block]) -> impl Iterator<Item = &Block> {
    blocks.iter().filter(|b| b.is(Label::NumberValues))
}

fn within(value: i32, low: i32, high: i32) -> bool {
    low <= value && value <= high
}

pub fn number_values(blocks: &[Block], _: &ClassifierSettings) -> Assignments {
    blocks
        .iter()
        .filter(|b| (b.comma_separated_numbers_present && !b.is_text) || b.text == "...")
        .map(|b| (b.pos, Label::NumberValues))
        .collect()
}

/// Column headings: at least two numbers stacked under the right edge and none beside it.
pub fn header(blocks: &[Block], settings: &ClassifierSettings) -> Assignments {
    let tol = settings.alignment_tolerance;
    blocks
        .iter()
        .filter(|b| {
            if is_keyword_header(b, settings) {
                return true;
            }
            if b.is(Label::NumberValues) || b.width >= settings.header_max_width {
                return false;
            }
            let below = numbers(blocks)
                .filter(|n| within(n.right, b.right - tol, b.right + tol) && n.top > b.top)
                .count();
            let beside = numbers(blocks)
                .any(|n| within(n.top, b.top - tol, b.top + tol) && n.right > b.right);
            below > 1 && !beside
        })
        .map(|b| (b.pos, Label::Header))
        .collect()
}

/// Row labels: an unlabelled block with a number to its right on the same top or bottom line.
pub fn grouping(blocks: &[Block], settings: &ClassifierSettings) -> Assignments {
    let tol = settings.alignment_tolerance;
    blocks
        .iter()
        .filter(|b| b.is_unlabeled())
        .filter(|b| {
            numbers(blocks).any(|n| {
                n.left > b.left
                    && (within(n.top, b.top - tol, b.top + tol)
                        || within(n.bottom, b.bottom - tol, b.bottom + tol))
            })
        })
        .map(|b| (b.pos, Label::Grouping))
        .collect()
}

fn is_upper(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}

pub fn title(blocks: &[Block], settings: &ClassifierSettings) -> Assignments {
    let (band_low, band_high) = settings.title_band;
    blocks
        .iter()
        .filter(|b| {
            if b.is(Label::Header) && is_keyword_header(b, settings) {
                return false;
            }
            let in_band = b.is_text && b.centroid_x > band_low && b.centroid_x < band_high;
            let heading = b.is_text
                && is_upper(&b.text)
                && settings.title_phrases.iter().any(|p| b.text.contains(p.as_str()));
            let lowered = b.text.to_lowercase();
            let marker = settings
                .title_keywords_any_case
                .iter()
                .any(|k| lowered.contains(&k.to_lowercase()))
                || settings
                    .title_keywords
                    .iter()
                    .any(|k| b.text.contains(k.as_str()));
            marker || (b.is_unlabeled() && (in_band || heading))
        })
        .map(|b| (b.pos, Label::Title))
        .collect()
}

/// Unlabelled blocks touching a header on any side.
///
/// Each side is a band next to the header edge; the block must also overlap the header
/// along the other axis.
pub fn probable_headers(blocks: &[Block], settings: &ClassifierSettings) -> Assignments {
    let (tol, near, far) = (
        settings.alignment_tolerance,
        settings.near_tolerance,
        settings.far_tolerance,
    );
    let headers: Vec<&Block> = blocks.iter().filter(|b| b.is(Label::Header)).collect();
    blocks
        .iter()
        .filter(|b| b.is_unlabeled())
        .filter(|b| {
            headers.iter().any(|h| {
                let rows_overlap = h.top <= b.bottom + tol && h.bottom >= b.top - tol;
                let cols_overlap = h.left <= b.right + near && h.right >= b.left - near;
                let right = within(h.left, b.right - tol, b.right + near);
                let left = within(h.right, b.left - near, b.left + tol);
                let above = within(h.bottom, b.top - far, b.top + tol);
                let below = within(h.top, b.bottom - tol, b.bottom + near);
                ((right || left) && rows_overlap) || ((above || below) && cols_overlap)
            })
        })
        .map(|b| (b.pos, Label::Header))
        .collect()
}

pub fn cell_summary(blocks: &[Block], settings: &ClassifierSettings) -> Assignments {
    blocks
        .iter()
        .filter(|b| b.is_text && CELL_SUMMARY.is_match(&b.text))
        .filter(|b| !(b.is(Label::Header) && is_keyword_header(b, settings)))
        .map(|b| (b.pos, Label::CellSummary))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::text::apply_text;
    use pretty_assertions::assert_eq;

    fn block(pos: usize, left: i32, top: i32, width: i32, text: &str) -> Block {
        let mut b = Block::new(pos, left, top, width, 20);
        apply_text(&mut b, text.to_string());
        b
    }

    fn labelled(mut b: Block, label: Label) -> Block {
        b.label = Some(label);
        b
    }

    #[test]
    fn numbers_need_digits_without_words() {
        let blocks = vec![
            block(1, 0, 0, 50, "1,234"),
            block(2, 0, 0, 50, "..."),
            block(3, 0, 0, 50, "Rs 1,234"),
        ];
        let settings = ClassifierSettings::default();
        assert_eq!(
            number_values(&blocks, &settings),
            vec![(1, Label::NumberValues), (2, Label::NumberValues)]
        );
    }

    #[test]
    fn row_label_is_not_a_header() {
        let settings = ClassifierSettings::default();
        let blocks = vec![
            block(1, 500, 50, 100, "2015-16"),
            // label left of a numeric row, also sitting above numbers with the same right edge
            block(2, 500, 100, 100, "Salaries"),
            labelled(block(3, 700, 100, 100, "1,000"), Label::NumberValues),
            labelled(block(4, 500, 150, 100, "2,000"), Label::NumberValues),
            labelled(block(5, 500, 200, 100, "3,000"), Label::NumberValues),
        ];
        let assigned: Vec<usize> = header(&blocks, &settings).iter().map(|a| a.0).collect();
        assert_eq!(assigned, vec![1]);
    }

    #[test]
    fn title_markers_override_but_keyword_headers_stay() {
        let settings = ClassifierSettings::default();
        let blocks = vec![
            labelled(block(1, 0, 0, 100, "Grant No"), Label::Grouping),
            labelled(block(2, 0, 0, 100, "DEMAND NO. 12"), Label::Grouping),
            labelled(block(3, 0, 0, 100, "Budget for Demand No 4"), Label::Header),
            block(4, 0, 0, 100, "REVENUE EXPENDITURE"),
        ];
        let assigned: Vec<usize> = title(&blocks, &settings).iter().map(|a| a.0).collect();
        assert_eq!(assigned, vec![2, 4]);
    }

    #[test]
    fn fragments_next_to_headers_are_promoted() {
        let settings = ClassifierSettings::default();
        let blocks = vec![
            labelled(block(1, 500, 100, 100, "Budget"), Label::Header),
            block(2, 500, 125, 100, "2015-16"),
            block(3, 605, 100, 50, "Rs"),
            block(4, 500, 400, 100, "Far away"),
            // level with the header band but far to the right
            block(5, 1500, 125, 100, "Elsewhere"),
        ];
        let assigned: Vec<usize> = probable_headers(&blocks, &settings)
            .iter()
            .map(|a| a.0)
            .collect();
        assert_eq!(assigned, vec![2, 3]);
    }

    #[test]
    fn summary_pattern() {
        let settings = ClassifierSettings::default();
        let blocks = vec![block(1, 0, 0, 10, "Total Rs 12,345"), block(2, 0, 0, 10, "Total 12")];
        assert_eq!(cell_summary(&blocks, &settings), vec![(1, Label::CellSummary)]);
    }
}
