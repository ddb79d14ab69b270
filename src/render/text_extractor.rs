use std::path::Path;

use anyhow::{Context, Result};

use super::{run_tool, TextExtractor};
use crate::core::geometry::BBox;

/// Region text through `pdftotext -x -y -W -H`.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn region_args(page_idx: usize, region: &BBox) -> Vec<String> {
    let page = (page_idx + 1).to_string();
    vec![
        "-f".to_string(),
        page.clone(),
        "-l".to_string(),
        page,
        "-x".to_string(),
        (region.x0.max(0.0).round() as i64).to_string(),
        "-y".to_string(),
        (region.y0.max(0.0).round() as i64).to_string(),
        "-W".to_string(),
        (region.width().round() as i64).to_string(),
        "-H".to_string(),
        (region.height().round() as i64).to_string(),
    ]
}

impl TextExtractor for PdfTextExtractor {
    fn text_in_region(&self, pdf_path: &Path, page_idx: usize, region: &BBox) -> Result<String> {
        let mut args: Vec<std::ffi::OsString> = region_args(page_idx, region)
            .into_iter()
            .map(Into::into)
            .collect();
        args.push(pdf_path.as_os_str().to_os_string());
        args.push("-".into());

        let output = run_tool("pdftotext", &args).with_context(|| {
            format!(
                "failed to extract text of page {} of {}",
                page_idx + 1,
                pdf_path.display()
            )
        })?;
        // pdftotext terminates every page with a form feed
        Ok(String::from_utf8_lossy(&output.stdout)
            .trim_end_matches('\u{c}')
            .to_string())
    }
}
