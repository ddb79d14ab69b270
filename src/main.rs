use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabstruct::core::config::Settings;
use tabstruct::core::model::PageStatus;
use tabstruct::pipeline::{build_document, export_document, PipelineConfig, Strategy};
use tabstruct::render::PdfReader;

#[derive(Parser, Debug)]
#[command(name = "tabstruct")]
#[command(version, about = "Table structure recovery for budget PDF documents", long_about = None)]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log every pipeline stage
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the tables of one PDF file
    Convert {
        /// Input PDF file path
        input: PathBuf,

        /// Output directory (default: ./<input_name>_tables)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Extract the tables of several PDF files or directories of PDF files
    Batch {
        /// Input PDF files or directories
        inputs: Vec<PathBuf>,

        /// Output directory for all results
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Show page count and page geometry of a PDF file
    Info {
        /// Input PDF file path
        input: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct ExtractArgs {
    /// Extraction strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Blocks)]
    strategy: Strategy,

    /// Pass vertical rules to the grid extractor as column separators (lines strategy)
    #[arg(long)]
    identify_columns: bool,

    /// Retry pages without data rotated by 90 degrees (lines strategy)
    #[arg(long)]
    check_page_rotation: bool,

    /// Pages carry a ruled header band above the table (lines strategy)
    #[arg(long)]
    header: bool,

    /// First page to process, 1-based
    #[arg(long, default_value_t = 1)]
    first_page: usize,

    /// Rendering DPI
    #[arg(long, default_value_t = 300)]
    dpi: u32,

    /// TOML file overriding the tuning constants
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON logistic model for the learned grouping pass (blocks strategy)
    #[arg(long)]
    grouping_model: Option<PathBuf>,

    /// Write debug outputs (page images, block overlays)
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Convert {
            input,
            output,
            extract,
        } => convert_single(input, output, &extract, cli.quiet),
        Commands::Batch {
            inputs,
            output,
            extract,
        } => convert_batch(inputs, output, &extract),
        Commands::Info { input } => show_info(input),
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn pipeline_config(input: PathBuf, output: PathBuf, args: &ExtractArgs) -> Result<PipelineConfig> {
    let settings = Settings::load(args.config.as_deref())?;
    let mut config = PipelineConfig::new(input, output, args.dpi);
    config.strategy = args.strategy;
    config.identify_columns = args.identify_columns;
    config.check_page_rotation = args.check_page_rotation;
    config.is_header = args.header;
    config.first_page = args.first_page;
    config.settings = settings;
    config.grouping_model = args.grouping_model.clone();
    config.debug = args.debug;
    Ok(config)
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

fn convert_single(
    input: PathBuf,
    output: Option<PathBuf>,
    args: &ExtractArgs,
    quiet: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }

    let output_dir =
        output.unwrap_or_else(|| PathBuf::from(format!("{}_tables", file_stem(&input))));

    if !quiet {
        println!("[*] Processing: {}", input.display());
        println!("[*] Output: {}", output_dir.display());
        println!("[*] Strategy: {:?}, DPI: {}", args.strategy, args.dpi);
    }

    let config = pipeline_config(input.clone(), output_dir.clone(), args)?;

    if !quiet {
        println!("\n[+] Extracting tables...");
    }

    let document = build_document(&config)
        .with_context(|| format!("Failed to process PDF: {}", input.display()))?;

    if !quiet {
        println!("[+] Exporting results...");
    }

    export_document(&document, &config)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    if !quiet {
        let failed = document
            .pages
            .iter()
            .filter(|p| matches!(p.status, PageStatus::Failed { .. }))
            .count();
        println!(
            "\n[✓] Done! {} table(s) from {} page(s), {} page(s) failed. Results saved to: {}",
            document.tables.len(),
            document.pages.len(),
            failed,
            output_dir.display()
        );
    }

    Ok(())
}

/// Files as given, directories expanded to the PDF files directly inside them.
fn expand_inputs(inputs: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(&input)
                .with_context(|| format!("Failed to read directory: {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input);
        }
    }
    Ok(files)
}

fn convert_batch(inputs: Vec<PathBuf>, output: Option<PathBuf>, args: &ExtractArgs) -> Result<()> {
    let inputs = expand_inputs(inputs)?;
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    let base_output = output.unwrap_or_else(|| PathBuf::from("batch_tables"));

    println!("[*] Batch processing {} file(s)", inputs.len());
    println!("[*] Base output: {}\n", base_output.display());

    let mut success = 0;
    let mut failed = 0;

    for (i, input) in inputs.iter().enumerate() {
        println!("[{}/{}] Processing: {}", i + 1, inputs.len(), input.display());

        if !input.exists() {
            eprintln!("  [!] Skipped: file does not exist");
            failed += 1;
            continue;
        }

        let output_dir = base_output.join(file_stem(input));

        match convert_single(input.clone(), Some(output_dir), args, true) {
            Ok(_) => {
                println!("  [✓] Success");
                success += 1;
            }
            Err(e) => {
                eprintln!("  [✗] Failed: {e:#}");
                failed += 1;
            }
        }
        println!();
    }

    println!("\n[*] Summary: {} succeeded, {} failed", success, failed);

    if failed > 0 {
        anyhow::bail!("{} file(s) failed to process", failed);
    }

    Ok(())
}

fn show_info(input: PathBuf) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let reader = PdfReader::new(input.clone())
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;

    let page_count = reader.page_count()?;

    println!("PDF Information");
    println!("===============");
    println!("File: {}", input.display());
    println!("Pages: {}", page_count);

    for page_idx in 0..page_count {
        let geometry = reader.page_geometry(page_idx)?;
        println!(
            "  page {:>3}: {:.1} x {:.1} pt, rotated {}°",
            page_idx + 1,
            geometry.width,
            geometry.height,
            geometry.rotation
        );
    }

    Ok(())
}
