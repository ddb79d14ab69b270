use std::path::Path;

use anyhow::Result;
use image::GrayImage;
use tracing::{debug, info, warn};

use super::{PageExtraction, TableExtractor};
use crate::core::config::LineSettings;
use crate::core::error::ExtractError;
use crate::core::geometry::BBox;
use crate::core::model::{ExtractedTable, PageDebug, PageImage, PageStatus};
use crate::lines::{column_separators, ContourTableFinder, LineDetector, TableBoundaryResolver};
use crate::render::GridExtractor;

/// Table region and column hints found on one orientation of a page.
struct Located {
    region: Option<BBox>,
    columns: Option<Vec<f32>>,
    augmented: GrayImage,
}

/// Finds the table from its ruled lines and hands the region to a grid extractor.
pub struct LineTableExtractor<G> {
    grid: G,
    settings: LineSettings,
    detector: LineDetector,
    identify_columns: bool,
    check_page_rotation: bool,
    is_header: bool,
}

impl<G: GridExtractor> LineTableExtractor<G> {
    pub fn new(grid: G, settings: LineSettings) -> Self {
        Self {
            grid,
            detector: LineDetector::new(settings.clone()),
            settings,
            identify_columns: false,
            check_page_rotation: false,
            is_header: false,
        }
    }

    /// Passes the x of every vertical rule to the grid extractor as column hints.
    pub fn identify_columns(mut self, enabled: bool) -> Self {
        self.identify_columns = enabled;
        self
    }

    /// Retries a page once, turned 90°, when the first pass yields no data.
    pub fn check_page_rotation(mut self, enabled: bool) -> Self {
        self.check_page_rotation = enabled;
        self
    }

    /// Treats the topmost rule as the bottom of a page header band.
    pub fn with_header(mut self, enabled: bool) -> Self {
        self.is_header = enabled;
        self
    }

    fn locate(&self, page: &PageImage) -> Located {
        let segments = self.detector.detect(&page.pixels);
        let mut augmented = page.pixels.clone();

        let resolver = TableBoundaryResolver::new(&self.settings);
        if let Some(limits) = resolver.resolve(&page.pixels, &segments, self.is_header) {
            resolver.draw_borders(&mut augmented, &segments, &limits);
        }

        let finder = ContourTableFinder::new(self.settings.buffer, self.settings.ink_threshold);
        let region = finder.find(&augmented, page.horizontal_ratio, page.vertical_ratio);
        let columns = if self.identify_columns && region.is_some() {
            Some(column_separators(
                &segments,
                self.settings.buffer,
                page.horizontal_ratio,
            ))
            .filter(|c| !c.is_empty())
        } else {
            None
        };
        debug!(
            page = page.page_idx + 1,
            segments = segments.len(),
            found = region.is_some(),
            "located table"
        );

        Located {
            region,
            columns,
            augmented,
        }
    }

    fn attempt(&self, pdf_path: &Path, page: &PageImage) -> Result<(Vec<Vec<String>>, Located)> {
        let located = self.locate(page);
        let Some(region) = located.region else {
            info!(
                document = %pdf_path.display(),
                page = page.page_idx + 1,
                "no table detected"
            );
            return Ok((Vec::new(), located));
        };

        let grid = match self.grid.extract_grid(
            pdf_path,
            page.page_idx,
            &region,
            located.columns.as_deref(),
        ) {
            Ok(grid) => clean_grid(grid),
            Err(e) if is_tool_failure(&e) => {
                warn!(
                    document = %pdf_path.display(),
                    page = page.page_idx + 1,
                    error = %e,
                    "grid extraction failed, page has no data"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        Ok((grid, located))
    }
}

impl<G: GridExtractor> TableExtractor for LineTableExtractor<G> {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn extract_page(&self, pdf_path: &Path, page: &PageImage) -> Result<PageExtraction> {
        let (mut grid, mut located) = self.attempt(pdf_path, page)?;
        if grid.is_empty() && self.check_page_rotation {
            info!(
                document = %pdf_path.display(),
                page = page.page_idx + 1,
                "no data, retrying with the page rotated"
            );
            (grid, located) = self.attempt(pdf_path, &page.rotated_clockwise())?;
        }

        let debug = PageDebug {
            width: located.augmented.width(),
            height: located.augmented.height(),
            blocks: Vec::new(),
            grids: Vec::new(),
            lines_image: Some(located.augmented),
        };
        if grid.is_empty() {
            return Ok(PageExtraction::empty(PageStatus::NoTable).with_debug(debug));
        }

        Ok(PageExtraction {
            status: PageStatus::Extracted { tables: 1 },
            tables: vec![ExtractedTable {
                page_idx: page.page_idx,
                table_idx: 1,
                title: None,
                header: None,
                rows: grid,
                summary: None,
            }],
            debug: Some(debug),
        })
    }
}

fn is_tool_failure(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<ExtractError>(),
        Some(ExtractError::ToolFailed { .. })
    )
}

/// Drops rows that are blank and, when every row has the same width, columns blank in
/// every row.
pub fn clean_grid(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = rows
        .into_iter()
        .filter(|row| !row.concat().trim().is_empty())
        .collect();
    let Some(width) = rows.first().map(Vec::len) else {
        return rows;
    };
    if rows.iter().all(|row| row.len() == width) {
        let keep: Vec<bool> = (0..width)
            .map(|col| rows.iter().any(|row| !row[col].trim().is_empty()))
            .collect();
        for row in &mut rows {
            let mut col = 0;
            row.retain(|_| {
                col += 1;
                keep[col - 1]
            });
        }
    }
    rows
}
