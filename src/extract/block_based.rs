use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::summary::summarize;
use super::{PageExtraction, TableExtractor};
use crate::blocks::{BlockFeatureExtractor, BlockGenerator};
use crate::classify::{BlockClassifier, GroupingScorer};
use crate::core::config::{OutputSettings, Settings};
use crate::core::error::ExtractError;
use crate::core::model::{
    Block, ExtractedTable, Label, PageDebug, PageImage, PageStatus, TableGrid,
};
use crate::layout::RowColumnReconstructor;
use crate::render::TextExtractor;

/// Segments the page into blocks, labels them and rebuilds each table group's grid.
pub struct BlockTableExtractor<T> {
    generator: BlockGenerator,
    features: BlockFeatureExtractor<T>,
    classifier: BlockClassifier,
    reconstructor: RowColumnReconstructor,
    output: OutputSettings,
}

impl<T: TextExtractor> BlockTableExtractor<T> {
    pub fn new(text: T, settings: &Settings) -> Self {
        Self {
            generator: BlockGenerator::new(settings.blocks.clone()),
            features: BlockFeatureExtractor::new(text, settings.blocks.clone()),
            classifier: BlockClassifier::new(settings.classifier.clone()),
            reconstructor: RowColumnReconstructor::new(settings.layout.clone()),
            output: settings.output.clone(),
        }
    }

    /// Enables the learned grouping pass with the given scorer.
    pub fn with_scorer(mut self, scorer: Box<dyn GroupingScorer>) -> Self {
        self.classifier = self.classifier.with_scorer(scorer);
        self
    }

    /// Labelled blocks with row and column indices plus the grid of every table group,
    /// or `None` for a blank page.
    pub fn label_page(
        &self,
        pdf_path: &Path,
        page: &PageImage,
    ) -> Option<(Vec<Block>, Vec<TableGrid>)> {
        let blocks = self.generator.generate(&page.pixels);
        if self.generator.is_blank(&blocks) {
            return None;
        }
        let blocks = self.features.extract_and_tidy(pdf_path, page, blocks);
        let classified = self.classifier.classify(blocks);
        debug!(
            page = page.page_idx + 1,
            absorbed = classified.absorbed.len(),
            "classified blocks"
        );

        let mut blocks = classified.blocks;
        let grids = self.reconstructor.reconstruct(&page.pixels, &mut blocks);
        Some((blocks, grids))
    }
}

impl<T: TextExtractor> TableExtractor for BlockTableExtractor<T> {
    fn name(&self) -> &'static str {
        "blocks"
    }

    fn extract_page(&self, pdf_path: &Path, page: &PageImage) -> Result<PageExtraction> {
        let Some((blocks, grids)) = self.label_page(pdf_path, page) else {
            info!(document = %pdf_path.display(), page = page.page_idx + 1, "blank page");
            return Ok(PageExtraction::empty(PageStatus::Blank));
        };

        let mut groups: BTreeMap<usize, Vec<&Block>> = BTreeMap::new();
        for block in &blocks {
            groups.entry(block.table.unwrap_or(1)).or_default().push(block);
        }

        let mut tables = Vec::new();
        for (table, members) in groups {
            if members.iter().all(|b| b.row_index.is_none()) {
                continue;
            }
            match build_table(page.page_idx, table, &members, &self.output) {
                Ok(extracted) => tables.push(extracted),
                Err(e) => warn!(
                    document = %pdf_path.display(),
                    page = page.page_idx + 1,
                    table,
                    error = %e,
                    "skipping table"
                ),
            }
        }

        let status = if tables.is_empty() {
            PageStatus::NoTable
        } else {
            PageStatus::Extracted {
                tables: tables.len(),
            }
        };
        let debug = PageDebug {
            width: page.width(),
            height: page.height(),
            blocks,
            grids,
            lines_image: None,
        };
        Ok(PageExtraction {
            status,
            tables,
            debug: Some(debug),
        })
    }
}

/// Lays the placed blocks of one table group out row by row.
///
/// Every row has one cell per column; the first block in a cell wins and empty cells
/// hold a single space. A group without header blocks gets the configured default
/// headers.
pub fn build_table(
    page_idx: usize,
    table: usize,
    members: &[&Block],
    output: &OutputSettings,
) -> Result<ExtractedTable, ExtractError> {
    let mut placed: Vec<&Block> = members
        .iter()
        .copied()
        .filter(|b| b.row_index.is_some() && b.col_index.is_some())
        .collect();
    let columns = placed
        .iter()
        .filter_map(|b| b.col_index)
        .max()
        .map(|c| c + 1)
        .ok_or_else(|| ExtractError::Structure {
            table,
            reason: "no block falls inside a column".to_string(),
        })?;
    placed.sort_by_key(|b| (b.top, b.left));

    let mut grid: BTreeMap<usize, Vec<Option<&Block>>> = BTreeMap::new();
    for block in placed {
        let (Some(row), Some(col)) = (block.row_index, block.col_index) else {
            continue;
        };
        let cells = grid.entry(row).or_insert_with(|| vec![None; columns]);
        if cells[col].is_none() {
            cells[col] = Some(block);
        }
    }
    let rows: Vec<Vec<String>> = grid
        .into_values()
        .map(|cells| {
            cells
                .into_iter()
                .map(|cell| cell.map_or_else(|| " ".to_string(), |b| b.text.clone()))
                .collect()
        })
        .collect();

    let header = if members.iter().any(|b| b.is(Label::Header)) {
        None
    } else {
        let has_numbers = members.iter().any(|b| b.is(Label::NumberValues));
        Some(default_header(columns, has_numbers, &output.default_headers))
    };

    let mut titles: Vec<&Block> = members
        .iter()
        .copied()
        .filter(|b| b.is(Label::Title))
        .collect();
    titles.sort_by_key(|b| (b.top, b.left));
    let titles: Vec<String> = titles.iter().map(|b| b.text.clone()).collect();

    let mut extracted = ExtractedTable {
        page_idx,
        table_idx: table,
        title: titles.first().cloned(),
        header,
        rows,
        summary: Some(summarize(page_idx, table, &titles)),
    };
    let filename = format!("{}.csv", extracted.file_stem());
    if let Some(summary) = extracted.summary.as_mut() {
        summary.filename = Some(filename);
    }
    Ok(extracted)
}

/// Default headings right-aligned over the numeric columns, or after two blank cells
/// when the table has no numbers.
fn default_header(columns: usize, has_numbers: bool, headers: &[String]) -> Vec<String> {
    let blanks = if has_numbers {
        columns.saturating_sub(headers.len())
    } else {
        2
    };
    std::iter::repeat(String::new())
        .take(blanks)
        .chain(headers.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::text::apply_text;
    use crate::core::geometry::BBox;
    use image::{GrayImage, Luma};
    use pretty_assertions::assert_eq;

    fn placed(label: Label, row: usize, col: usize, text: &str) -> Block {
        let mut b = Block::new(row * 10 + col, 100 * col as i32, 50 * row as i32, 80, 30);
        apply_text(&mut b, text.to_string());
        b.label = Some(label);
        b.table = Some(1);
        b.row_index = Some(row);
        b.col_index = Some(col);
        b
    }

    #[test]
    fn fills_missing_cells_and_adds_default_headers() -> Result<()> {
        let blocks = vec![
            placed(Label::Grouping, 0, 0, "Salaries"),
            placed(Label::NumberValues, 0, 1, "1,000"),
            placed(Label::NumberValues, 0, 5, "1,200"),
            placed(Label::Grouping, 1, 0, "Wages"),
            placed(Label::NumberValues, 1, 2, "300"),
        ];
        let members: Vec<&Block> = blocks.iter().collect();
        let output = OutputSettings::default();

        let table = build_table(0, 1, &members, &output)?;

        assert_eq!(
            table.rows,
            vec![
                vec!["Salaries", "1,000", " ", " ", " ", "1,200"],
                vec!["Wages", " ", "300", " ", " ", " "],
            ]
        );
        let header = table.header.unwrap_or_default();
        assert_eq!(header.len(), 6);
        assert_eq!(header[..2], ["", ""]);
        assert_eq!(header[2], "Actuals, 2013-2014 Rs");
        Ok(())
    }

    #[test]
    fn titles_name_the_table() -> Result<()> {
        let mut title = Block::new(99, 0, 0, 400, 30);
        apply_text(&mut title, "DEMAND NO. 4 Police".to_string());
        title.label = Some(Label::Title);
        title.table = Some(2);
        let heading = placed(Label::Header, 0, 1, "Budget");
        let number = placed(Label::NumberValues, 1, 1, "40");
        let members = vec![&title, &heading, &number];

        let table = build_table(3, 2, &members, &OutputSettings::default())?;

        assert_eq!(table.header, None);
        assert_eq!(table.title.as_deref(), Some("DEMAND NO. 4 Police"));
        let summary = table.summary.unwrap_or_default();
        assert_eq!(summary.demand_no.as_deref(), Some("4"));
        assert_eq!(
            summary.filename.as_deref(),
            Some("page_004_table_02_demand_no_4_police.csv")
        );
        Ok(())
    }

    #[test]
    fn group_without_columns_is_a_structure_error() {
        let mut stray = Block::new(1, 0, 0, 10, 10);
        stray.row_index = Some(0);
        let err = build_table(0, 1, &[&stray], &OutputSettings::default()).unwrap_err();
        assert!(matches!(err, ExtractError::Structure { table: 1, .. }));
    }

    struct NoText;

    impl TextExtractor for NoText {
        fn text_in_region(&self, _: &Path, _: usize, _: &BBox) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn white_page_is_blank() -> Result<()> {
        let extractor = BlockTableExtractor::new(NoText, &Settings::default());
        let page = PageImage::new(0, GrayImage::from_pixel(400, 300, Luma([255])), 200.0, 150.0);
        let result = extractor.extract_page(Path::new("budget.pdf"), &page)?;
        assert_eq!(result.status, PageStatus::Blank);
        assert!(result.tables.is_empty());
        Ok(())
    }
}
