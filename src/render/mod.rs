pub mod grid;
pub mod pdf_reader;
pub mod rasterizer;
pub mod text_extractor;

pub use grid::TabulaGridExtractor;
pub use pdf_reader::{PageGeometry, PdfReader};
pub use rasterizer::PdfRasterizer;
pub use text_extractor::PdfTextExtractor;

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Output};

use anyhow::Result;

use crate::core::error::ExtractError;
use crate::core::geometry::BBox;
use crate::core::model::PageImage;

/// Turns one page of a document into a grayscale raster with its pixel-to-point ratios.
pub trait Rasterizer {
    fn rasterize(&self, pdf_path: &Path, page_idx: usize) -> Result<PageImage>;
}

/// Reads the text inside a rectangle of a page. The rectangle is in points.
pub trait TextExtractor {
    fn text_in_region(&self, pdf_path: &Path, page_idx: usize, region: &BBox)
        -> Result<String>;
}

/// Reads a grid of cell strings from a rectangle of a page, optionally split at the
/// given column x coordinates (points).
pub trait GridExtractor {
    fn extract_grid(
        &self,
        pdf_path: &Path,
        page_idx: usize,
        region: &BBox,
        columns: Option<&[f32]>,
    ) -> Result<Vec<Vec<String>>>;
}

impl<T: TextExtractor + ?Sized> TextExtractor for &T {
    fn text_in_region(
        &self,
        pdf_path: &Path,
        page_idx: usize,
        region: &BBox,
    ) -> Result<String> {
        (**self).text_in_region(pdf_path, page_idx, region)
    }
}

/// Runs an external tool, mapping spawn and exit failures onto [`ExtractError`].
pub(crate) fn run_tool<I, S>(program: &str, args: I) -> Result<Output, ExtractError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ExtractError::ToolMissing {
                command: program.to_string(),
            }
        } else {
            ExtractError::ToolFailed {
                command: program.to_string(),
                status: "spawn error".to_string(),
                stderr: e.to_string(),
            }
        }
    })?;

    if !output.status.success() {
        return Err(ExtractError::ToolFailed {
            command: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Whether an external tool can be spawned at all.
pub fn tool_available(program: &str) -> bool {
    Command::new(program).arg("-v").output().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_maps_to_tool_missing() {
        let err = run_tool("tabstruct-no-such-binary", ["--help"]).unwrap_err();
        assert!(matches!(err, ExtractError::ToolMissing { .. }));
    }
}
