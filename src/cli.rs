use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, fmt::writer::MakeWriterExt};

use crate::{
    effect::EffectType,
    harmonize::{
        HarmonizeConfig, HarmonizeError, HarmonizeSummary, SumstatsColumns, TracingReporter,
        harmonize_file,
    },
    pdb::{self, PdbClient},
    reference::{ReferenceColumns, ReferenceIndex},
    report::{ReferenceInfo, RunReport},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Yet another bioinformatics toolbox", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Flip alleles in a summary statistics file to match a reference
    Flipalleles(FlipAllelesArgs),
    /// Fetch protein structures from the Protein Data Bank
    Fetchpdb(FetchPdbArgs),
}

#[derive(Debug, Args)]
struct FlipAllelesArgs {
    /// Summary statistics file (tab-separated, optionally gzipped)
    #[arg(long, value_name = "FILE")]
    sumstats: PathBuf,

    /// SNP field name in summary statistics file
    #[arg(long, default_value = "SNP")]
    sumstats_snp: String,

    /// Effect allele field name in summary statistics file
    #[arg(long, default_value = "A1")]
    sumstats_effect_allele: String,

    /// Other allele field name in summary statistics file
    #[arg(long, default_value = "A2")]
    sumstats_other_allele: String,

    /// Effect field name in summary statistics file
    #[arg(long, default_value = "BETA")]
    sumstats_effect: String,

    /// Effect type (BETA or OR)
    #[arg(long, default_value = "BETA")]
    effect_type: String,

    /// Reference file (tab-separated, optionally gzipped)
    #[arg(long, value_name = "FILE")]
    reference: PathBuf,

    /// SNP field name in reference file
    #[arg(long, default_value = "SNP")]
    reference_snp: String,

    /// Effect allele field name in reference file
    #[arg(long, default_value = "A1")]
    reference_effect_allele: String,

    /// Other allele field name in reference file
    #[arg(long, default_value = "A2")]
    reference_other_allele: String,

    /// Output file; a log is written next to it as <OUTPUT>.log
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Also write a JSON run report as <OUTPUT stem>_report.json
    #[arg(long)]
    report: bool,
}

#[derive(Debug, Args)]
struct FetchPdbArgs {
    /// PDB IDs, or a file with one PDB ID per line
    #[arg(value_name = "PDB IDs or input file", required = true)]
    inputs: Vec<String>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Flipalleles(args) => {
            init_logging(&cli.log_level, &log_path(&args.output))?;
            run_flipalleles(&args)
        }
        Command::Fetchpdb(args) => {
            fs::create_dir_all(&args.output).with_context(|| {
                format!("failed to create output directory {}", args.output.display())
            })?;
            init_logging(&cli.log_level, &args.output.join("fetchpdb.log"))?;
            run_fetchpdb(&args)
        }
    }
}

fn run_flipalleles(args: &FlipAllelesArgs) -> Result<()> {
    let effect_type: EffectType = args
        .effect_type
        .parse()
        .map_err(HarmonizeError::from)?;

    let reference_columns = ReferenceColumns {
        id: args.reference_snp.clone(),
        effect_allele: args.reference_effect_allele.clone(),
        other_allele: args.reference_other_allele.clone(),
    };
    let config = HarmonizeConfig {
        input: args.sumstats.clone(),
        output: args.output.clone(),
        columns: SumstatsColumns {
            id: args.sumstats_snp.clone(),
            effect_allele: args.sumstats_effect_allele.clone(),
            other_allele: args.sumstats_other_allele.clone(),
            effect: args.sumstats_effect.clone(),
        },
        effect_type,
    };

    let index = ReferenceIndex::build(&args.reference, &reference_columns)
        .with_context(|| format!("failed to index reference {}", args.reference.display()))?;
    let summary = harmonize_file(&config, &index, &mut TracingReporter).with_context(|| {
        format!("failed to harmonize {}", args.sumstats.display())
    })?;

    print_summary(&summary);

    if args.report {
        let report = RunReport::new(
            &args.sumstats,
            ReferenceInfo {
                path: args.reference.display().to_string(),
                variants: index.len(),
                rows: index.rows_read(),
                duplicate_ids: index.overwritten(),
            },
            &args.output,
            effect_type,
            summary,
        );
        report
            .write(&args.output)
            .context("failed to write run report")?;
    }

    Ok(())
}

fn run_fetchpdb(args: &FetchPdbArgs) -> Result<()> {
    let client = PdbClient::rcsb()?;
    let written = pdb::fetch_pdb(&args.inputs, &args.output, &client)?;
    println!(
        "Downloaded {count} structures to {dir}.",
        count = written.len(),
        dir = args.output.display()
    );
    Ok(())
}

fn log_path(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_os_string();
    path.push(".log");
    PathBuf::from(path)
}

/// Logs to stdout and, without ANSI colouring, to `log_file`.
fn init_logging(level: &str, log_file: &Path) -> Result<()> {
    let file = File::create(log_file)
        .with_context(|| format!("failed to create log file {}", log_file.display()))?;
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stdout.and(Mutex::new(file)))
        .try_init()
        .ok();

    tracing::info!(
        "kirill - Version: {}, Logging to file {}",
        env!("CARGO_PKG_VERSION"),
        log_file.display()
    );
    tracing::info!("{}", command_line());
    Ok(())
}

fn command_line() -> String {
    let args: Vec<String> = std::env::args().collect();
    format!(
        "Invoked with following arguments: \n{}",
        args.join(" \\ \n")
    )
}

fn print_summary(summary: &HarmonizeSummary) {
    println!(
        "Processed {total} rows; flipped {flipped}, already aligned {aligned}.",
        total = summary.total_rows,
        flipped = summary.flipped_rows,
        aligned = summary.aligned_rows,
    );

    if summary.missing_rows > 0 {
        println!(
            "{count} variants were not found in the reference and were passed through.",
            count = summary.missing_rows
        );
    }

    if summary.mismatched_rows > 0 {
        println!(
            "{count} variants had alleles matching neither reference orientation and were left untouched.",
            count = summary.mismatched_rows
        );
    }
}
