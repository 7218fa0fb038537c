use crate::config::{Config, load_config};
use crate::document::Document;
use crate::forest::Forest;
use crate::layout::redraw_forest;
use crate::layout_dump::write_layout_dump;
use crate::text_metrics::FontTextMetrics;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "syntree", version, about = "Lay out syntax tree documents")]
pub struct Args {
    /// Input document (.json5 / .json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "dump")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout constants, default style, metrics)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Measure text with the calibrated character table instead of system fonts
    #[arg(long = "fastText")]
    pub fast_text: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Absolute geometry of every node, connector and mdom edge
    Dump,
    /// The normalized document with layout seeds
    Document,
}

pub fn run() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if args.fast_text {
        config.metrics.fast_text_metrics = true;
    }

    let input = read_input(args.input.as_deref())?;
    let forest = layout_document(&input, &config)?;

    match args.output_format {
        OutputFormat::Dump => write_layout_dump(args.output.as_deref(), &forest)?,
        OutputFormat::Document => {
            let json = Document::from_forest(&forest, true).to_json()?;
            write_output(&json, args.output.as_deref())?;
        }
    }
    Ok(())
}

/// Parses a document and lays out every tree in it. A document without
/// trees yields an empty forest.
fn layout_document(input: &str, config: &Config) -> Result<Forest> {
    let document = Document::parse(input)?;
    let mut loaded = document.build(&config.style, &config.layout)?;
    let metrics = FontTextMetrics::from(&config.metrics);
    redraw_forest(&mut loaded.forest, &metrics, &config.layout);
    tracing::debug!(nodes = loaded.forest.node_count(), "layout complete");
    Ok(loaded.forest)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(contents: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, contents)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
