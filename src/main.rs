// src/main.rs
mod chunking;
mod extractors;
mod output;
mod utils;

use chunking::{Chunker, ChunkerConfig, Metadata};
use clap::{Parser, Subcommand};
use extractors::{DocumentExtractor, HeadingPatternDetector};
use output::OutputWriter;
use serde_json::Value;
use std::path::{Path, PathBuf};
use utils::AppError;

/// Command Line Interface for PDF text extraction and chunking
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Write the JSON result to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long, global = true)]
    pretty: bool,

    /// More log output on stderr (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the cleaned full text of a PDF
    Text { pdf: PathBuf },

    /// Extract per-page text and document metadata
    Pages { pdf: PathBuf },

    /// Split the text of a PDF into heuristic sections
    Sections {
        pdf: PathBuf,

        /// Heading regex to use instead of the uppercase-line heuristic
        #[arg(long)]
        heading_pattern: Option<String>,
    },

    /// Count the pages of a PDF (0 when it cannot be read)
    PageCount { pdf: PathBuf },

    /// Split a PDF (or a plain text file) into chunks for embedding
    Chunk(ChunkArgs),
}

#[derive(clap::Args, Debug)]
struct ChunkArgs {
    /// PDF to chunk, or a UTF-8 text file with --plain
    input: PathBuf,

    /// Treat the input as plain UTF-8 text instead of a PDF
    #[arg(long)]
    plain: bool,

    /// Chunk each PDF page separately and tag chunks with their page number
    #[arg(long, conflicts_with = "plain")]
    per_page: bool,

    /// Group N sentences per chunk instead of size-based chunking
    #[arg(long, value_name = "N", conflicts_with = "per_page")]
    sentences: Option<usize>,

    /// JSON file with chunker settings (chunk_size, chunk_overlap, separators)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target maximum chunk length in characters (overrides --config)
    #[arg(long, env = "CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// Characters repeated between force-split pieces (overrides --config)
    #[arg(long, env = "CHUNK_OVERLAP")]
    chunk_overlap: Option<usize>,

    /// Extra KEY=VALUE metadata merged into every chunk; VALUE may be JSON
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
    meta: Vec<(String, Value)>,
}

fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (RUST_LOG, else -v count)
    utils::logging::setup_logging(args.verbose);
    tracing::debug!("Parsed args: {:?}", args);

    // 3. Run the requested command
    let writer = OutputWriter::new(args.output.as_deref(), args.pretty)?;
    run(args.command, &writer)
}

fn run(command: Command, writer: &OutputWriter) -> Result<(), AppError> {
    let extractor = DocumentExtractor::new();

    match command {
        Command::Text { pdf } => {
            let text = extractor.extract_text(&pdf)?;
            writer.write(&source_name(&pdf), "text", &text)?;
        }
        Command::Pages { pdf } => {
            let document = extractor.extract_with_metadata(&pdf)?;
            writer.write(&source_name(&pdf), "pages", &document)?;
        }
        Command::Sections { pdf, heading_pattern } => {
            let extractor = match heading_pattern {
                Some(pattern) => DocumentExtractor::with_detector(HeadingPatternDetector::with_pattern(&pattern)?),
                None => extractor,
            };
            let sections = extractor.extract_sections(&pdf)?;
            writer.write(&source_name(&pdf), "sections", &sections)?;
        }
        Command::PageCount { pdf } => {
            let count = extractor.get_page_count(&pdf);
            writer.write(&source_name(&pdf), "page-count", &count)?;
        }
        Command::Chunk(args) => run_chunk(&args, &extractor, writer)?,
    }

    Ok(())
}

fn run_chunk(args: &ChunkArgs, extractor: &DocumentExtractor, writer: &OutputWriter) -> Result<(), AppError> {
    let source = source_name(&args.input);
    let chunker = build_chunker(args)?;
    let metadata: Metadata = args.meta.iter().cloned().collect();

    if args.per_page {
        let document = extractor.extract_with_metadata(&args.input)?;
        let chunks = chunker.chunk_document(&document, Some(&metadata));
        writer.write(&source, "chunk", &chunks)?;
        return Ok(());
    }

    let text = if args.plain {
        std::fs::read_to_string(&args.input)?
    } else {
        extractor.extract_text(&args.input)?
    };

    match args.sentences {
        Some(per_chunk) => {
            let groups = chunker.chunk_by_sentences(&text, per_chunk);
            tracing::info!("Grouped sentences into {} chunks", groups.len());
            writer.write(&source, "chunk", &groups)?;
        }
        None => {
            let chunks = chunker.chunk_text(&text, Some(&metadata));
            writer.write(&source, "chunk", &chunks)?;
        }
    }

    Ok(())
}

/// Config file (or defaults), then CLI/env overrides, then validation.
fn build_chunker(args: &ChunkArgs) -> Result<Chunker, AppError> {
    let mut config = match &args.config {
        Some(path) => ChunkerConfig::from_file(path)?,
        None => ChunkerConfig::default(),
    };
    if let Some(size) = args.chunk_size {
        config.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.chunk_overlap = overlap;
    }

    let chunker = Chunker::new(config)?;
    tracing::debug!("Chunker settings: {:?}", chunker.config());
    Ok(chunker)
}

fn parse_meta(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    // Numbers, booleans and JSON literals keep their type; anything else is a string.
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}
