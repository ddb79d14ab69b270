use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageReader;
use tracing::debug;

use super::{run_tool, PdfReader, Rasterizer};
use crate::core::error::ExtractError;
use crate::core::model::PageImage;

/// Renders pages with `pdftoppm` into a work directory and loads them as grayscale.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    out_dir: PathBuf,
    dpi: u32,
    keep_images: bool,
}

impl PdfRasterizer {
    pub fn new(out_dir: PathBuf, dpi: u32) -> Self {
        Self {
            out_dir,
            dpi,
            keep_images: false,
        }
    }

    /// Leaves the rendered PNG files in the work directory.
    pub fn keep_images(mut self, keep: bool) -> Self {
        self.keep_images = keep;
        self
    }

    fn render_png(&self, pdf_path: &Path, page_idx: usize) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;

        // pdftoppm uses 1-based page indices
        let page_number = (page_idx + 1).to_string();
        let prefix = self.out_dir.join(format!("page_{:03}", page_idx + 1));
        let dpi = self.dpi.to_string();

        run_tool(
            "pdftoppm",
            [
                OsStr::new("-gray"),
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-f"),
                OsStr::new(&page_number),
                OsStr::new("-l"),
                OsStr::new(&page_number),
                OsStr::new("-singlefile"),
                OsStr::new("-png"),
                pdf_path.as_os_str(),
                prefix.as_os_str(),
            ],
        )
        .with_context(|| format!("failed to render page {page_number} of {}", pdf_path.display()))?;

        // -singlefile drops the page suffix
        let image_path = prefix.with_extension("png");
        if !image_path.exists() {
            anyhow::bail!(
                "expected rendered image not found: {}",
                image_path.display()
            );
        }
        Ok(image_path)
    }
}

impl Rasterizer for PdfRasterizer {
    fn rasterize(&self, pdf_path: &Path, page_idx: usize) -> Result<PageImage> {
        let geometry = PdfReader::new(pdf_path.to_path_buf())?.page_geometry(page_idx)?;
        let image_path = self.render_png(pdf_path, page_idx)?;

        let pixels = ImageReader::open(&image_path)
            .with_context(|| format!("failed to open {}", image_path.display()))?
            .decode()
            .map_err(ExtractError::from)?
            .to_luma8();

        if !self.keep_images {
            let _ = fs::remove_file(&image_path);
        }

        debug!(
            page = page_idx + 1,
            width = pixels.width(),
            height = pixels.height(),
            "rasterized page"
        );
        Ok(PageImage::new(
            page_idx,
            pixels,
            geometry.width,
            geometry.height,
        ))
    }
}
