// ==============================================================================
// main.rs - Genetics Interpreter Entry Point
// ==============================================================================
// Description: Command-line entry point: validate, load, analyse, report
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-02-09
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use genetics_interpreter::output;
use genetics_interpreter::parsers::Genome23Parser;
use genetics_interpreter::processor::{EngineOptions, GeneticsProcessor};
use genetics_interpreter::reference_data::{DatabasePaths, ReferenceDatabases};
use genetics_interpreter::validator::FileValidator;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw 23andMe-style genotype file (.txt, .tsv, .csv or .txt.gz)
    #[arg(short, long, env = "GENOME_FILE")]
    genome: PathBuf,

    /// Directory holding the reference databases
    #[arg(short, long, env = "GENETICS_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Report path (defaults to ./genetics_report_<run id>.json)
    #[arg(short, long, env = "GENETICS_OUTPUT")]
    output: Option<PathBuf>,

    /// Restrict loading to these chromosomes (comma-separated, e.g. 1,2,X,MT)
    #[arg(long, value_delimiter = ',')]
    chromosomes: Vec<String>,

    /// Skip ancestry estimation (polygenic scores then carry no ancestry caveat)
    #[arg(long)]
    skip_ancestry: bool,

    /// Skip polygenic risk scoring
    #[arg(long)]
    skip_prs: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "genetics_interpreter=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!("Genetics Interpreter {} starting...", env!("CARGO_PKG_VERSION"));

    // 1. Validate input
    let validated = FileValidator::new()
        .validate(&args.genome)
        .with_context(|| format!("Genome file rejected: {}", args.genome.display()))?;

    // 2. Load genotype calls
    let parser = if args.chromosomes.is_empty() {
        Genome23Parser::new()
    } else {
        info!("Restricting to chromosomes: {}", args.chromosomes.join(", "));
        Genome23Parser::with_chromosomes(args.chromosomes.clone())
    };
    let (genome, stats) = parser
        .load(&args.genome)
        .with_context(|| format!("Failed to load {}", args.genome.display()))?;
    info!(
        "Loaded {} calls ({} no-calls, {} malformed lines)",
        stats.calls_loaded, stats.no_calls, stats.malformed_lines
    );

    // 3. Reference databases
    let paths = DatabasePaths::from_data_dir(&args.data_dir);
    let databases = ReferenceDatabases::load(&paths).context("Failed to load reference databases")?;

    // 4. Run the engine
    let options = EngineOptions {
        skip_ancestry: args.skip_ancestry,
        skip_prs: args.skip_prs,
    };
    let report = GeneticsProcessor::new(genome, stats, databases, options)
        .with_source(&args.genome, &validated)
        .run()
        .await;

    // 5. Write report
    let output_path = args
        .output
        .unwrap_or_else(|| output::default_report_path(&PathBuf::from("."), &report));
    output::write_report(&report, &output_path)?;
    output::log_summary(&report);

    info!("Done");
    Ok(())
}
