use std::ffi::OsString;
use std::path::Path;

use anyhow::{Context, Result};

use super::{run_tool, GridExtractor};
use crate::core::geometry::BBox;

/// Cell grid through the `tabula` command line, parsed from its CSV output.
#[derive(Debug, Clone)]
pub struct TabulaGridExtractor {
    program: String,
}

impl Default for TabulaGridExtractor {
    fn default() -> Self {
        Self {
            program: "tabula".to_string(),
        }
    }
}

impl TabulaGridExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different launcher, e.g. a wrapper script around the tabula jar.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

fn area_arg(region: &BBox) -> String {
    format!(
        "{:.2},{:.2},{:.2},{:.2}",
        region.y0, region.x0, region.y1, region.x1
    )
}

fn columns_arg(columns: &[f32]) -> String {
    columns
        .iter()
        .map(|c| format!("{c:.2}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses tabula's CSV output; rows may differ in width.
pub fn parse_grid(stdout: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(stdout);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("malformed CSV from grid extractor")?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

impl GridExtractor for TabulaGridExtractor {
    fn extract_grid(
        &self,
        pdf_path: &Path,
        page_idx: usize,
        region: &BBox,
        columns: Option<&[f32]>,
    ) -> Result<Vec<Vec<String>>> {
        let mut args: Vec<OsString> = vec![
            "--pages".into(),
            (page_idx + 1).to_string().into(),
            "--area".into(),
            area_arg(region).into(),
        ];
        if let Some(columns) = columns.filter(|c| !c.is_empty()) {
            args.push("--columns".into());
            args.push(columns_arg(columns).into());
        }
        args.push(pdf_path.as_os_str().to_os_string());

        let output = run_tool(&self.program, &args).with_context(|| {
            format!(
                "failed to extract grid on page {} of {}",
                page_idx + 1,
                pdf_path.display()
            )
        })?;
        parse_grid(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_ragged_csv() -> Result<()> {
        let grid = parse_grid(b"Head,\"1,234\",5\nTotal,9\n")?;
        assert_eq!(
            grid,
            vec![
                vec!["Head".to_string(), "1,234".to_string(), "5".to_string()],
                vec!["Total".to_string(), "9".to_string()],
            ]
        );
        assert!(parse_grid(b"")?.is_empty());
        Ok(())
    }

    #[test]
    fn area_is_top_left_bottom_right() {
        assert_eq!(
            area_arg(&BBox::new(10.0, 20.0, 300.0, 400.5)),
            "20.00,10.00,400.50,300.00"
        );
        assert_eq!(columns_arg(&[72.0, 144.25]), "72.00,144.25");
    }

    #[test]
    fn configured_launcher_is_the_one_spawned() {
        let extractor = TabulaGridExtractor::new().with_program("tabstruct-no-such-tabula");
        let err = extractor
            .extract_grid(Path::new("x.pdf"), 0, &BBox::new(0.0, 0.0, 10.0, 10.0), None)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::core::error::ExtractError>(),
            Some(crate::core::error::ExtractError::ToolMissing { command })
                if command == "tabstruct-no-such-tabula"
        ));
    }
}
