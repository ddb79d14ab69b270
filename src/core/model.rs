use std::path::PathBuf;

use image::{imageops, GrayImage};
use serde::{Deserialize, Serialize};

/// Grayscale raster of one page plus the factors mapping pixels to points.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_idx: usize,
    pub pixels: GrayImage,
    pub horizontal_ratio: f32,
    pub vertical_ratio: f32,
}

impl PageImage {
    /// `page_width`/`page_height` are the page size in points, already oriented.
    pub fn new(page_idx: usize, pixels: GrayImage, page_width: f32, page_height: f32) -> Self {
        let horizontal_ratio = page_width / pixels.width().max(1) as f32;
        let vertical_ratio = page_height / pixels.height().max(1) as f32;
        Self {
            page_idx,
            pixels,
            horizontal_ratio,
            vertical_ratio,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Same page turned 90° clockwise; the ratios follow the swapped axes.
    pub fn rotated_clockwise(&self) -> Self {
        Self {
            page_idx: self.page_idx,
            pixels: imageops::rotate90(&self.pixels),
            horizontal_ratio: self.vertical_ratio,
            vertical_ratio: self.horizontal_ratio,
        }
    }
}

/// Structural role of a block. Unlabelled blocks carry `None`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Header,
    NumberValues,
    Grouping,
    Title,
    CellSummary,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Header => "header",
            Label::NumberValues => "number_values",
            Label::Grouping => "grouping",
            Label::Title => "title",
            Label::CellSummary => "cell_summary",
        }
    }
}

/// Rectangular island of ink with its geometric and textual features.
///
/// Geometry is in image pixels. `pos` is the identity assigned when the block was
/// enumerated and is the only handle merge passes use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub pos: usize,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub right: i32,
    pub bottom: i32,
    pub area: u32,
    pub centroid_x: f32,
    pub centroid_y: f32,
    pub text: String,
    pub text_length: usize,
    pub is_text: bool,
    pub comma_separated_numbers_present: bool,
    pub possible_row_merger: bool,
    pub number: Option<i64>,
    pub label: Option<Label>,
    pub table: Option<usize>,
    pub row_index: Option<usize>,
    pub col_index: Option<usize>,
}

impl Block {
    pub fn new(pos: usize, left: i32, top: i32, width: i32, height: i32) -> Self {
        let area = (width.max(0) as u32) * (height.max(0) as u32);
        Self {
            pos,
            left,
            top,
            width,
            height,
            right: left + width,
            bottom: top + height,
            area,
            centroid_x: left as f32 + width as f32 / 2.0,
            centroid_y: top as f32 + height as f32 / 2.0,
            text: String::new(),
            text_length: 0,
            is_text: false,
            comma_separated_numbers_present: false,
            possible_row_merger: false,
            number: None,
            label: None,
            table: None,
            row_index: None,
            col_index: None,
        }
    }

    /// Moves the block to a new rectangle; `right`, `bottom` and the centroid follow.
    pub fn set_bounds(&mut self, left: i32, top: i32, width: i32, height: i32) {
        self.left = left;
        self.top = top;
        self.width = width;
        self.height = height;
        self.right = left + width;
        self.bottom = top + height;
        self.centroid_x = left as f32 + width as f32 / 2.0;
        self.centroid_y = top as f32 + height as f32 / 2.0;
    }

    pub fn is(&self, label: Label) -> bool {
        self.label == Some(label)
    }

    pub fn is_unlabeled(&self) -> bool {
        self.label.is_none()
    }
}

/// Extrema of one axis of the table grid, in pixels.
///
/// `start`/`end` are the resolved extent along the axis; `base_line` is the outermost
/// rule found on this axis, against which the opposite axis is clipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisExtent {
    pub max_length: i32,
    pub start: i32,
    pub end: i32,
    pub base_line: i32,
}

impl AxisExtent {
    pub fn span(&self) -> i32 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLimits {
    pub horizontal: AxisExtent,
    pub vertical: AxisExtent,
}

/// Metadata read from the titles of a block-based table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableSummary {
    pub page: usize,
    pub table: usize,
    pub demand_no: Option<String>,
    pub major_head: Option<String>,
    pub head_of_account: Option<String>,
    pub detailed_account_no: Option<String>,
    pub detailed: bool,
    #[serde(rename = "abstract")]
    pub abstract_account: bool,
    pub filename: Option<String>,
}

/// One logical table in row-major order, ready for emission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedTable {
    pub page_idx: usize,
    pub table_idx: usize,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TableSummary>,
}

impl ExtractedTable {
    /// File stem derived from page, table and title text with path-unsafe characters replaced.
    pub fn file_stem(&self) -> String {
        let mut stem = format!("page_{:03}_table_{:02}", self.page_idx + 1, self.table_idx);
        if let Some(title) = self.title.as_deref() {
            let slug = slugify(title);
            if !slug.is_empty() {
                stem.push('_');
                stem.push_str(&slug);
            }
        }
        stem
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
        if slug.len() >= 48 {
            break;
        }
    }
    slug.trim_matches('_').to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageStatus {
    Extracted { tables: usize },
    Blank,
    NoTable,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub page_idx: usize,
    #[serde(flatten)]
    pub status: PageStatus,
    #[serde(skip)]
    pub debug: Option<PageDebug>,
}

/// Intermediate state kept for the debug exporters.
#[derive(Debug, Clone, Default)]
pub struct PageDebug {
    pub width: u32,
    pub height: u32,
    pub blocks: Vec<Block>,
    pub grids: Vec<TableGrid>,
    pub lines_image: Option<GrayImage>,
}

/// Row and column boundaries chosen for one table group, in pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGrid {
    pub table: Option<usize>,
    pub rows: Vec<i32>,
    pub columns: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTables {
    pub source: PathBuf,
    pub pages: Vec<PageReport>,
    pub tables: Vec<ExtractedTable>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn rotation_swaps_dimensions_and_ratios() {
        let page = PageImage::new(0, GrayImage::from_pixel(200, 100, Luma([255])), 100.0, 25.0);
        assert_eq!(page.horizontal_ratio, 0.5);
        assert_eq!(page.vertical_ratio, 0.25);

        let rotated = page.rotated_clockwise();
        assert_eq!((rotated.width(), rotated.height()), (100, 200));
        assert_eq!(rotated.horizontal_ratio, 0.25);
        assert_eq!(rotated.vertical_ratio, 0.5);
    }

    #[test]
    fn file_stem_sanitises_title() {
        let table = ExtractedTable {
            page_idx: 2,
            table_idx: 1,
            title: Some("DEMAND NO. 12 / Revenue".to_string()),
            header: None,
            rows: vec![],
            summary: None,
        };
        assert_eq!(table.file_stem(), "page_003_table_01_demand_no_12_revenue");
    }

    #[test]
    fn set_bounds_updates_derived_edges() {
        let mut block = Block::new(1, 10, 20, 30, 40);
        block.set_bounds(5, 5, 10, 10);
        assert_eq!((block.right, block.bottom), (15, 15));
        assert_eq!(block.centroid_x, 10.0);
    }
}
