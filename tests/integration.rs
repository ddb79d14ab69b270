use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use pretty_assertions::assert_eq;

use tabstruct::core::config::Settings;
use tabstruct::core::geometry::BBox;
use tabstruct::core::model::{Label, PageImage, PageStatus};
use tabstruct::extract::{BlockTableExtractor, LineTableExtractor, TableExtractor};
use tabstruct::pipeline::{build_document, export_document, run_pages, PipelineConfig, Strategy};
use tabstruct::render::{tool_available, GridExtractor, Rasterizer, TextExtractor};

/// A word printed on the synthetic page: its ink rectangle and the text behind it.
struct Word {
    x: i32,
    y: i32,
    width: u32,
    text: &'static str,
}

const fn word(x: i32, y: i32, width: u32, text: &'static str) -> Word {
    Word { x, y, width, text }
}

/// A budget page with a title, two keyword headers, three labelled rows and a page number.
const BUDGET_PAGE: [Word; 13] = [
    word(100, 40, 400, "DEMAND NO. 7 POLICE"),
    word(560, 120, 80, "Actuals"),
    word(760, 120, 80, "Budget"),
    word(160, 200, 200, "Salaries"),
    word(560, 200, 80, "1,000"),
    word(760, 200, 80, "2,000"),
    word(160, 260, 200, "Wages"),
    word(560, 260, 80, "250"),
    word(760, 260, 80, "300"),
    word(160, 320, 200, "Total"),
    word(560, 320, 80, "1,250"),
    word(760, 320, 80, "2,300"),
    word(560, 740, 40, "12"),
];

/// Stands in for pdftoppm: draws every word as a solid bar. Points equal pixels.
struct DrawnPages<'a> {
    words: &'a [Word],
}

impl Rasterizer for DrawnPages<'_> {
    fn rasterize(&self, _: &Path, page_idx: usize) -> Result<PageImage> {
        let mut pixels = GrayImage::from_pixel(1200, 800, Luma([255]));
        for w in self.words {
            draw_filled_rect_mut(&mut pixels, Rect::at(w.x, w.y).of_size(w.width, 20), Luma([0]));
        }
        Ok(PageImage::new(page_idx, pixels, 1200.0, 800.0))
    }
}

/// Stands in for pdftotext: returns the word whose bar centre lies in the region.
struct WordLookup<'a> {
    words: &'a [Word],
}

impl TextExtractor for WordLookup<'_> {
    fn text_in_region(&self, _: &Path, _: usize, region: &BBox) -> Result<String> {
        Ok(self
            .words
            .iter()
            .filter(|w| region.contains(w.x as f32 + w.width as f32 / 2.0, w.y as f32 + 10.0))
            .map(|w| w.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[test]
fn block_strategy_rebuilds_a_borderless_table() -> Result<()> {
    let settings = Settings::default();
    let extractor = BlockTableExtractor::new(WordLookup { words: &BUDGET_PAGE }, &settings);
    let rasterizer = DrawnPages { words: &BUDGET_PAGE };

    let document = run_pages(Path::new("police.pdf"), 0..1, &rasterizer, &extractor);

    assert_eq!(document.pages[0].status, PageStatus::Extracted { tables: 1 });
    let table = &document.tables[0];
    assert_eq!(table.header, None);
    // single periods are leader noise and are stripped with the rest
    assert_eq!(table.title.as_deref(), Some("DEMAND NO 7 POLICE"));
    assert_eq!(
        table.rows,
        vec![
            vec![" ", "Actuals", "Budget"],
            vec!["Salaries", "1,000", "2,000"],
            vec!["Wages", "250", "300"],
            vec!["Total", "1,250", "2,300"],
        ]
    );
    let summary = table.summary.clone().unwrap_or_default();
    assert_eq!(summary.demand_no.as_deref(), Some("7"));

    let debug = document.pages[0].debug.clone().unwrap_or_default();
    let grid = &debug.grids[0];
    assert_eq!((grid.table, grid.rows.len(), grid.columns.len()), (Some(1), 5, 4));

    let blocks = debug.blocks;
    let label_of = |text: &str| blocks.iter().find(|b| b.text == text).and_then(|b| b.label);
    assert_eq!(label_of("Budget"), Some(Label::Header));
    assert_eq!(label_of("Wages"), Some(Label::Grouping));
    assert_eq!(label_of("DEMAND NO 7 POLICE"), Some(Label::Title));
    // the page number sits in the footer band
    assert!(blocks.iter().all(|b| b.text != "12"));
    Ok(())
}

#[test]
fn block_tables_export_with_semicolons_and_an_index() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = PipelineConfig::new(PathBuf::from("police.pdf"), dir.path().to_path_buf(), 300);
    config.strategy = Strategy::Blocks;
    config.debug = true;

    let extractor = BlockTableExtractor::new(WordLookup { words: &BUDGET_PAGE }, &config.settings);
    let document = run_pages(
        &config.input,
        0..1,
        &DrawnPages { words: &BUDGET_PAGE },
        &extractor,
    );
    export_document(&document, &config)?;

    let csv = fs::read_to_string(dir.path().join("page_001_table_01_demand_no_7_police.csv"))?;
    assert_eq!(csv.lines().nth(1), Some("Salaries;1,000;2,000"));

    let index: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("tables.json"))?)?;
    assert_eq!(index["tables"][0]["summary"]["demand_no"], "7");
    assert!(dir.path().join("debug/page_001.html").exists());
    assert!(dir.path().join("debug/page_001_blocks.json").exists());
    Ok(())
}

#[test]
fn nearly_blank_page_short_circuits() -> Result<()> {
    let words = [word(100, 100, 50, "Note"), word(600, 700, 30, "3")];
    let extractor = BlockTableExtractor::new(WordLookup { words: &words }, &Settings::default());
    let page = DrawnPages { words: &words }.rasterize(Path::new("x.pdf"), 4)?;

    let result = extractor.extract_page(Path::new("x.pdf"), &page)?;

    assert_eq!(result.status, PageStatus::Blank);
    assert!(result.debug.is_none());
    Ok(())
}

/// A page holding one heavy ruled frame.
struct RuledPages;

impl Rasterizer for RuledPages {
    fn rasterize(&self, _: &Path, page_idx: usize) -> Result<PageImage> {
        let mut pixels = GrayImage::from_pixel(1000, 600, Luma([255]));
        for inset in 0..4u32 {
            let rect = Rect::at(100 + inset as i32, 100 + inset as i32)
                .of_size(800 - 2 * inset, 400 - 2 * inset);
            draw_hollow_rect_mut(&mut pixels, rect, Luma([0]));
        }
        Ok(PageImage::new(page_idx, pixels, 500.0, 300.0))
    }
}

/// Always answers with the same tabula-style grid.
struct FixedGrid;

impl GridExtractor for FixedGrid {
    fn extract_grid(
        &self,
        _: &Path,
        _: usize,
        _: &BBox,
        _: Option<&[f32]>,
    ) -> Result<Vec<Vec<String>>> {
        Ok(vec![
            vec!["Head".to_string(), String::new(), "2015-16".to_string()],
            vec![String::new(), String::new(), String::new()],
            vec!["Police".to_string(), String::new(), "4,000".to_string()],
        ])
    }
}

#[test]
fn line_strategy_cleans_the_grid_and_writes_commas() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = PipelineConfig::new(PathBuf::from("grid.pdf"), dir.path().to_path_buf(), 300);
    config.strategy = Strategy::Lines;

    let extractor = LineTableExtractor::new(FixedGrid, config.settings.lines.clone());
    assert_eq!(extractor.name(), "lines");

    let document = run_pages(&config.input, 0..2, &RuledPages, &extractor);
    export_document(&document, &config)?;

    assert_eq!(document.tables.len(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("page_002_table_01.csv"))?,
        "Head,2015-16\nPolice,\"4,000\"\n"
    );
    assert!(!dir.path().join("debug").exists());
    Ok(())
}

#[test]
fn unreadable_pdf_fails_the_document() -> Result<()> {
    if !tool_available("pdfinfo") {
        eprintln!("skipping: pdfinfo not installed");
        return Ok(());
    }
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("broken.pdf");
    fs::write(&input, b"not a pdf")?;

    let config = PipelineConfig::new(input, dir.path().join("out"), 72);
    let err = build_document(&config).expect_err("garbage is not a PDF");
    assert!(format!("{err:#}").contains("pdfinfo"), "{err:#}");
    Ok(())
}
