use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::ExtractError;

/// Every tuning constant of both extraction strategies.
///
/// Sections default independently, so a TOML file only needs the keys it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub lines: LineSettings,
    pub blocks: BlockSettings,
    pub classifier: ClassifierSettings,
    pub layout: LayoutSettings,
    pub output: OutputSettings,
}

impl Settings {
    /// Reads a TOML settings file; `None` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: Settings = toml::from_str(&raw)
            .map_err(|e| ExtractError::Config(e.to_string()))
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.blocks.kernel_width == 0 || self.blocks.kernel_height == 0 {
            return Err(ExtractError::Config(
                "dilation kernel must be at least 1x1".to_string(),
            ));
        }
        if self.blocks.kernel_width > 255 || self.blocks.kernel_height > 255 {
            return Err(ExtractError::Config(
                "dilation kernel must fit in 255x255".to_string(),
            ));
        }
        if self.lines.line_thickness == 0 {
            return Err(ExtractError::Config(
                "line thickness must be positive".to_string(),
            ));
        }
        if self.classifier.title_band.0 >= self.classifier.title_band.1 {
            return Err(ExtractError::Config(
                "title band must be an increasing range".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LineSettings {
    /// Pixels added around every detected rule.
    pub buffer: i32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough_vote_threshold: u32,
    pub hough_suppression_radius: u32,
    pub min_line_length: i32,
    pub max_line_gap: i32,
    pub line_thickness: u32,
    pub ink_threshold: u8,
    /// Launcher for the grid extractor, e.g. a wrapper script around the tabula jar.
    pub grid_command: String,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            buffer: 10,
            canny_low: 100.0,
            canny_high: 150.0,
            hough_vote_threshold: 80,
            hough_suppression_radius: 8,
            min_line_length: 200,
            max_line_gap: 100,
            line_thickness: 4,
            ink_threshold: 200,
            grid_command: "tabula".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlockSettings {
    pub kernel_width: u32,
    pub kernel_height: u32,
    pub dilation_iterations: u32,
    pub ink_threshold: u8,
    /// Pages with this many blocks or fewer are treated as blank.
    pub blank_page_blocks: usize,
    /// Points added to the width and height of every text window.
    pub window_padding: f32,
    /// Blocks whose top lies at or below this fraction of the lowest block top are footers.
    pub footer_fraction: f32,
}

impl Default for BlockSettings {
    fn default() -> Self {
        Self {
            kernel_width: 10,
            kernel_height: 5,
            dilation_iterations: 4,
            ink_threshold: 200,
            blank_page_blocks: 3,
            window_padding: 5.0,
            footer_fraction: 0.95,
        }
    }
}

/// Which post-processing pass to run, in configured order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostProcessor {
    TableSegmentation,
    HeaderCombination,
    HorizontalCombination,
    FalseHeaderRemoval,
    LearnedGrouping,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierSettings {
    pub alignment_tolerance: i32,
    pub near_tolerance: i32,
    pub far_tolerance: i32,
    pub header_max_width: i32,
    pub title_band: (f32, f32),
    pub header_keywords: Vec<String>,
    pub title_phrases: Vec<String>,
    /// Markers that force a title, matched case-insensitively.
    pub title_keywords_any_case: Vec<String>,
    /// Markers that force a title, matched as written.
    pub title_keywords: Vec<String>,
    pub combine_tolerance: i32,
    pub false_header_z: f32,
    pub post_processors: Vec<PostProcessor>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            alignment_tolerance: 10,
            near_tolerance: 15,
            far_tolerance: 20,
            header_max_width: 1000,
            title_band: (1200.0, 1300.0),
            header_keywords: ["Actuals", "Budget", "Revised", "Estimate"]
                .map(String::from)
                .to_vec(),
            title_phrases: [
                "REVENUE EXPENDITURE",
                "DETAILED ACCOUNT",
                "ABSTRACT ACCOUNT",
                "CAPITAL EXPENDITURE",
                "LOAN EXPENDITURE",
            ]
            .map(String::from)
            .to_vec(),
            title_keywords_any_case: vec!["demand no".to_string()],
            title_keywords: vec!["Head of Account".to_string()],
            combine_tolerance: 5,
            false_header_z: 1.0,
            post_processors: vec![
                PostProcessor::TableSegmentation,
                PostProcessor::HeaderCombination,
                PostProcessor::HorizontalCombination,
                PostProcessor::FalseHeaderRemoval,
                PostProcessor::LearnedGrouping,
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutSettings {
    /// Left bound of the first column-start window.
    pub column_origin: i32,
    pub min_column_position: i32,
    pub dark_pixel_ratio: f32,
    pub column_gap: i32,
    /// Luma of the page background; any darker pixel counts toward dark-pixel density.
    pub background: u8,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            column_origin: 135,
            min_column_position: 300,
            dark_pixel_ratio: 0.3,
            column_gap: 5,
            background: 255,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub default_headers: Vec<String>,
    pub block_delimiter: char,
    pub line_delimiter: char,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            default_headers: [
                "Actuals, 2013-2014 Rs",
                "Budget Estimate, 2015-2016 Rs",
                "Revised Estimate, 2015-2016 Rs",
                "Budget Estimate, 2016-2017 Rs",
            ]
            .map(String::from)
            .to_vec(),
            block_delimiter: ';',
            line_delimiter: ',',
        }
    }
}
