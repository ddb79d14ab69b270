use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::model::{DocumentTables, ExtractedTable};
use crate::export::Exporter;

/// Writes every table to its own delimited file, header row first.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    out_dir: PathBuf,
    delimiter: u8,
}

impl CsvExporter {
    pub fn new(out_dir: PathBuf, delimiter: char) -> Self {
        let delimiter = u8::try_from(delimiter).unwrap_or(b',');
        Self { out_dir, delimiter }
    }

    pub fn write_table(&self, table: &ExtractedTable) -> Result<PathBuf> {
        let path = self.out_dir.join(format!("{}.csv", table.file_stem()));
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        if let Some(header) = &table.header {
            writer.write_record(header)?;
        }
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        debug!(path = %path.display(), rows = table.rows.len(), "wrote table");
        Ok(path)
    }
}

impl Exporter for CsvExporter {
    fn export(&self, document: &DocumentTables) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        for table in &document.tables {
            self.write_table(table)?;
        }
        Ok(())
    }
}
