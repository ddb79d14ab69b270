use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use super::run_tool;

static PAGE_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Page\s+(\d+)\s+size:\s+([0-9.]+)\s+x\s+([0-9.]+)\s+pts")
        .expect("valid page size regex")
});
static PAGE_ROT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Page\s+(\d+)\s+rot:\s+(\d+)").expect("valid rotation regex"));

/// Size of a page in points, already swapped for rotated pages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub rotation: u32,
}

#[derive(Debug, Clone)]
pub struct PdfReader {
    path: PathBuf,
}

impl PdfReader {
    pub fn new(path: PathBuf) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!("not a file: {}", path.display());
        }
        Ok(Self { path })
    }

    pub fn page_count(&self) -> Result<usize> {
        let output = run_tool("pdfinfo", [self.path.as_os_str()])
            .with_context(|| format!("failed to invoke pdfinfo on {}", self.path.display()))?;
        parse_page_count(&String::from_utf8_lossy(&output.stdout)).with_context(|| {
            format!(
                "pdfinfo output did not contain a 'Pages:' line for {}",
                self.path.display()
            )
        })
    }

    /// Geometry of one page (0-based index).
    pub fn page_geometry(&self, page_idx: usize) -> Result<PageGeometry> {
        let page = (page_idx + 1).to_string();
        let output = run_tool(
            "pdfinfo",
            [
                OsStr::new("-f"),
                OsStr::new(&page),
                OsStr::new("-l"),
                OsStr::new(&page),
                self.path.as_os_str(),
            ],
        )
        .with_context(|| format!("failed to read geometry of page {page}"))?;
        parse_page_geometry(&String::from_utf8_lossy(&output.stdout)).with_context(|| {
            format!(
                "pdfinfo reported no size for page {page} of {}",
                self.path.display()
            )
        })
    }
}

fn parse_page_count(stdout: &str) -> Result<usize> {
    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            let num_str = rest.trim();
            let pages: usize = num_str.parse().with_context(|| {
                format!("failed to parse page count from 'Pages:' line: {num_str}")
            })?;
            return Ok(pages);
        }
    }
    anyhow::bail!("missing 'Pages:' line")
}

fn parse_page_geometry(stdout: &str) -> Result<PageGeometry> {
    let mut size = None;
    let mut rotation = 0;
    for line in stdout.lines() {
        if let Some(caps) = PAGE_SIZE.captures(line) {
            let width: f32 = caps[2].parse()?;
            let height: f32 = caps[3].parse()?;
            size = Some((width, height));
        } else if let Some(caps) = PAGE_ROT.captures(line) {
            rotation = caps[2].parse()?;
        }
    }
    let Some((width, height)) = size else {
        anyhow::bail!("missing page size line");
    };
    let (width, height) = if rotation % 180 == 90 {
        (height, width)
    } else {
        (width, height)
    };
    Ok(PageGeometry {
        width,
        height,
        rotation,
    })
}
