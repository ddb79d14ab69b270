use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::core::model::{DocumentTables, PageReport, TableSummary};
use crate::export::Exporter;

#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

#[derive(Serialize)]
struct TableIndex<'a> {
    source: &'a Path,
    pages: &'a [PageReport],
    tables: Vec<TableEntry<'a>>,
}

#[derive(Serialize)]
struct TableEntry<'a> {
    file: String,
    page: usize,
    table: usize,
    title: Option<&'a str>,
    rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a TableSummary>,
}

impl Exporter for JsonExporter {
    fn export(&self, document: &DocumentTables) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let index = TableIndex {
            source: &document.source,
            pages: &document.pages,
            tables: document
                .tables
                .iter()
                .map(|t| TableEntry {
                    file: format!("{}.csv", t.file_stem()),
                    page: t.page_idx + 1,
                    table: t.table_idx,
                    title: t.title.as_deref(),
                    rows: t.rows.len(),
                    summary: t.summary.as_ref(),
                })
                .collect(),
        };
        let path = self.out_dir.join("tables.json");
        let data = serde_json::to_string_pretty(&index)?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ExtractedTable, PageStatus};
    use pretty_assertions::assert_eq;

    #[test]
    fn index_lists_pages_and_tables() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let document = DocumentTables {
            source: PathBuf::from("budget.pdf"),
            pages: vec![
                PageReport {
                    page_idx: 0,
                    status: PageStatus::Extracted { tables: 1 },
                    debug: None,
                },
                PageReport {
                    page_idx: 1,
                    status: PageStatus::Failed {
                        reason: "pdftoppm exited with 1".to_string(),
                    },
                    debug: None,
                },
            ],
            tables: vec![ExtractedTable {
                page_idx: 0,
                table_idx: 1,
                title: None,
                header: None,
                rows: vec![vec!["a".to_string()]],
                summary: None,
            }],
        };

        JsonExporter::new(dir.path().to_path_buf()).export(&document)?;

        let raw = fs::read_to_string(dir.path().join("tables.json"))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(value["pages"][0]["status"], "extracted");
        assert_eq!(value["pages"][1]["reason"], "pdftoppm exited with 1");
        assert_eq!(value["tables"][0]["file"], "page_001_table_01.csv");
        assert_eq!(value["tables"][0]["rows"], 1);
        Ok(())
    }
}
