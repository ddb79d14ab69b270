use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classify::LogisticGroupingModel;
use crate::core::config::Settings;
use crate::core::model::{DocumentTables, PageReport, PageStatus};
use crate::export::{CsvExporter, Exporter, HtmlDebugExporter, JsonExporter};
use crate::extract::summary::forward_fill;
use crate::extract::{BlockTableExtractor, LineTableExtractor, TableExtractor};
use crate::render::{PdfRasterizer, PdfReader, PdfTextExtractor, Rasterizer, TabulaGridExtractor};

/// Which engine recovers the tables of a document family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Ruled tables: line geometry locates the table, an external tool reads the cells.
    Lines,
    /// Borderless tables: blocks are labelled and laid out into rows and columns.
    #[default]
    Blocks,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub dpi: u32,
    pub strategy: Strategy,
    pub identify_columns: bool,
    pub check_page_rotation: bool,
    pub is_header: bool,
    /// 1-based page to start from.
    pub first_page: usize,
    pub settings: Settings,
    pub grouping_model: Option<PathBuf>,
    pub debug: bool,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output: PathBuf, dpi: u32) -> Self {
        Self {
            input,
            output,
            dpi,
            strategy: Strategy::default(),
            identify_columns: false,
            check_page_rotation: false,
            is_header: false,
            first_page: 1,
            settings: Settings::default(),
            grouping_model: None,
            debug: false,
        }
    }

    fn delimiter(&self) -> char {
        match self.strategy {
            Strategy::Lines => self.settings.output.line_delimiter,
            Strategy::Blocks => self.settings.output.block_delimiter,
        }
    }
}

pub fn build_extractor(config: &PipelineConfig) -> Result<Box<dyn TableExtractor>> {
    let extractor: Box<dyn TableExtractor> = match config.strategy {
        Strategy::Lines => Box::new(
            LineTableExtractor::new(
                TabulaGridExtractor::new().with_program(&config.settings.lines.grid_command),
                config.settings.lines.clone(),
            )
                .identify_columns(config.identify_columns)
                .check_page_rotation(config.check_page_rotation)
                .with_header(config.is_header),
        ),
        Strategy::Blocks => {
            let mut extractor =
                BlockTableExtractor::new(PdfTextExtractor::new(), &config.settings);
            if let Some(path) = &config.grouping_model {
                let model = LogisticGroupingModel::load(path)?;
                extractor = extractor.with_scorer(Box::new(model));
            }
            Box::new(extractor)
        }
    };
    Ok(extractor)
}

pub fn build_document(config: &PipelineConfig) -> Result<DocumentTables> {
    let pdf_reader = PdfReader::new(config.input.clone())?;
    let page_count = pdf_reader
        .page_count()
        .with_context(|| format!("failed to count pages of {}", config.input.display()))?;

    let rasterizer =
        PdfRasterizer::new(config.output.join("pages"), config.dpi).keep_images(config.debug);
    let extractor = build_extractor(config)?;
    let first = config.first_page.max(1) - 1;

    info!(
        document = %config.input.display(),
        pages = page_count,
        strategy = extractor.name(),
        "extracting tables"
    );
    Ok(run_pages(
        &config.input,
        first..page_count,
        &rasterizer,
        extractor.as_ref(),
    ))
}

/// Runs every page on its own; a failing page is reported and the rest still run.
pub fn run_pages(
    pdf_path: &Path,
    pages: Range<usize>,
    rasterizer: &dyn Rasterizer,
    extractor: &dyn TableExtractor,
) -> DocumentTables {
    let mut reports = Vec::with_capacity(pages.len());
    let mut tables = Vec::new();

    for page_idx in pages {
        let result = rasterizer
            .rasterize(pdf_path, page_idx)
            .and_then(|page| extractor.extract_page(pdf_path, &page));
        match result {
            Ok(extraction) => {
                info!(
                    document = %pdf_path.display(),
                    page = page_idx + 1,
                    tables = extraction.tables.len(),
                    "page done"
                );
                tables.extend(extraction.tables);
                reports.push(PageReport {
                    page_idx,
                    status: extraction.status,
                    debug: extraction.debug,
                });
            }
            Err(e) => {
                warn!(
                    document = %pdf_path.display(),
                    page = page_idx + 1,
                    error = %format!("{e:#}"),
                    "page failed"
                );
                reports.push(PageReport {
                    page_idx,
                    status: PageStatus::Failed {
                        reason: format!("{e:#}"),
                    },
                    debug: None,
                });
            }
        }
    }

    forward_fill(&mut tables);
    DocumentTables {
        source: pdf_path.to_path_buf(),
        pages: reports,
        tables,
    }
}

pub fn export_document(document: &DocumentTables, config: &PipelineConfig) -> Result<()> {
    let csv_exporter = CsvExporter::new(config.output.clone(), config.delimiter());
    csv_exporter.export(document)?;

    let json_exporter = JsonExporter::new(config.output.clone());
    json_exporter.export(document)?;

    if config.debug {
        let html_exporter = HtmlDebugExporter::new(config.output.join("debug"));
        html_exporter.export(document)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use image::{GrayImage, Luma};

    use crate::core::model::{ExtractedTable, PageImage};
    use crate::extract::PageExtraction;

    struct WhitePages {
        broken: usize,
    }

    impl Rasterizer for WhitePages {
        fn rasterize(&self, _: &Path, page_idx: usize) -> Result<PageImage> {
            if page_idx == self.broken {
                anyhow::bail!("pdftoppm exited with 99");
            }
            let pixels = GrayImage::from_pixel(100, 100, Luma([255]));
            Ok(PageImage::new(page_idx, pixels, 50.0, 50.0))
        }
    }

    struct OneTablePerPage;

    impl TableExtractor for OneTablePerPage {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn extract_page(&self, _: &Path, page: &PageImage) -> Result<PageExtraction> {
            Ok(PageExtraction {
                status: PageStatus::Extracted { tables: 1 },
                tables: vec![ExtractedTable {
                    page_idx: page.page_idx,
                    table_idx: 1,
                    title: None,
                    header: None,
                    rows: vec![vec!["Total".to_string(), "10".to_string()]],
                    summary: None,
                }],
                debug: None,
            })
        }
    }

    #[test]
    fn failing_page_does_not_stop_the_document() {
        let document = run_pages(
            Path::new("budget.pdf"),
            0..3,
            &WhitePages { broken: 1 },
            &OneTablePerPage,
        );

        assert_eq!(document.tables.len(), 2);
        assert!(matches!(
            &document.pages[1].status,
            PageStatus::Failed { reason } if reason.contains("exited with 99")
        ));
        assert_eq!(document.pages[2].status, PageStatus::Extracted { tables: 1 });
    }

    #[test]
    fn export_document_writes_outputs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = PipelineConfig::new(
            PathBuf::from("budget.pdf"),
            dir.path().to_path_buf(),
            300,
        );
        config.debug = true;
        config.strategy = Strategy::Lines;

        let document = run_pages(
            &config.input,
            0..1,
            &WhitePages { broken: 9 },
            &OneTablePerPage,
        );
        export_document(&document, &config)?;

        assert_eq!(
            fs::read_to_string(dir.path().join("page_001_table_01.csv"))?,
            "Total,10\n"
        );
        assert!(dir.path().join("tables.json").exists());
        assert!(dir.path().join("debug").is_dir());
        Ok(())
    }
}
