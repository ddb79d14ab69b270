use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::{Block, DocumentTables, PageDebug, TableGrid};
use crate::export::Exporter;

/// Per-page overlay of the labelled blocks, the block table as JSON and, for the line
/// strategy, the image with the synthetic borders drawn in.
#[derive(Debug, Clone)]
pub struct HtmlDebugExporter {
    out_dir: PathBuf,
}

impl HtmlDebugExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn block_to_div(block: &Block) -> String {
        let label = block.label.map_or("unlabeled", |l| l.as_str());
        let cell = match (block.row_index, block.col_index) {
            (Some(row), Some(col)) => format!("{row},{col}"),
            _ => String::new(),
        };
        format!(
            r#"<div class='bbox {label}' style='left:{x}px; top:{y}px; width:{w}px; height:{h}px;' data-pos='{pos}' data-label='{label}' data-table='{table}' data-cell='{cell}' data-text='{text}'></div>"#,
            x = block.left,
            y = block.top,
            w = block.width,
            h = block.height,
            pos = block.pos,
            label = label,
            table = block.table.map(|t| t.to_string()).unwrap_or_default(),
            cell = cell,
            text = html_escape::encode_single_quoted_attribute(&block.text),
        )
    }

    /// One thin div per row and column boundary, spanning the grid's extent.
    fn grid_to_divs(grid: &TableGrid) -> String {
        let (Some(&top), Some(&bottom)) = (grid.rows.first(), grid.rows.last()) else {
            return String::new();
        };
        let (Some(&left), Some(&right)) = (grid.columns.first(), grid.columns.last()) else {
            return String::new();
        };
        let table = grid.table.map(|t| t.to_string()).unwrap_or_default();
        let rows = grid.rows.iter().map(|y| {
            format!(
                "<div class='rule row' data-table='{table}' style='left:{left}px; top:{y}px; width:{}px;'></div>",
                right - left
            )
        });
        let columns = grid.columns.iter().map(|x| {
            format!(
                "<div class='rule col' data-table='{table}' style='left:{x}px; top:{top}px; height:{}px;'></div>",
                bottom - top
            )
        });
        rows.chain(columns).collect()
    }

    fn page_html(page_number: usize, image: &str, debug: &PageDebug) -> String {
        let blocks: String = debug
            .blocks
            .iter()
            .map(Self::block_to_div)
            .chain(debug.grids.iter().map(Self::grid_to_divs))
            .collect();
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset='utf-8'>
<title>tabstruct page {page_number}</title>
<style>
body {{ margin: 0; font-family: Arial, sans-serif; }}
#canvas {{ position: relative; width: {width}px; height: {height}px; }}
#canvas img {{ display: block; }}
.bbox {{ position: absolute; border: 2px solid rgba(0,0,0,0.4); box-sizing: border-box; }}
.bbox.header {{ background: rgba(255,165,0,0.25); border-color: rgba(255,140,0,0.8); }}
.bbox.number_values {{ background: rgba(0,128,0,0.15); border-color: rgba(0,128,0,0.7); }}
.bbox.grouping {{ background: rgba(100,100,255,0.15); border-color: rgba(0,0,255,0.6); }}
.bbox.title {{ background: rgba(128,0,128,0.15); border-color: rgba(128,0,128,0.7); }}
.bbox.cell_summary {{ background: rgba(0,200,200,0.15); border-color: rgba(0,160,160,0.7); }}
.bbox.unlabeled {{ border-style: dashed; }}
.rule {{ position: absolute; pointer-events: none; }}
.rule.row {{ border-top: 1px dotted red; height: 0; }}
.rule.col {{ border-left: 1px dotted red; width: 0; }}
#info {{ position: fixed; right: 10px; top: 10px; background: #fff; padding: 10px; border: 1px solid #ddd; max-width: 300px; }}
</style>
</head>
<body>
<div id='info'>Click a block to inspect.</div>
<div id='canvas'>
<img src='{image}' />
{blocks}
</div>
<script>
const info = document.getElementById('info');
for (const el of document.querySelectorAll('.bbox')) {{
  el.addEventListener('click', () => {{
    info.textContent = `pos ${{el.dataset.pos}} | ${{el.dataset.label}} | table ${{el.dataset.table}} | cell ${{el.dataset.cell}} | ${{el.dataset.text}}`;
  }});
}}
</script>
</body>
</html>"#,
            width = debug.width,
            height = debug.height,
        )
    }
}

impl Exporter for HtmlDebugExporter {
    fn export(&self, document: &DocumentTables) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        for page in &document.pages {
            let Some(debug) = &page.debug else {
                continue;
            };
            let page_number = page.page_idx + 1;

            let image = match &debug.lines_image {
                Some(lines) => {
                    let name = format!("page_{page_number:03}_lines.png");
                    let path = self.out_dir.join(&name);
                    lines
                        .save(&path)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    name
                }
                None => format!("../pages/page_{page_number:03}.png"),
            };

            let html = Self::page_html(page_number, &image, debug);
            fs::write(self.out_dir.join(format!("page_{page_number:03}.html")), html)?;

            if !debug.blocks.is_empty() {
                let data = serde_json::to_string_pretty(&debug.blocks)?;
                fs::write(
                    self.out_dir.join(format!("page_{page_number:03}_blocks.json")),
                    data,
                )?;
            }
        }
        Ok(())
    }
}
