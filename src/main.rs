extern crate calibration_report;

use anyhow::anyhow;
use calibration_report::core::coil_multiplier::{CoilMultipliers, CoilSelection};
use calibration_report::output::FileOutput;
use calibration_report::{run_coil_multiplier, run_report, ReportFlags};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CalibrationArgs {
    #[command(subcommand)]
    command: Command,
    #[clap(long, default_value_t = false, help = "Whether to log out spans")]
    log_spans: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a calibration report comparing utility bills against modeled values
    Report(ReportArgs),
    /// Scale rated capacity and COP of two-speed DX cooling coils
    CoilMultiplier(CoilMultiplierArgs),
}

#[derive(Args, Debug)]
struct ReportArgs {
    input_file: String,
    #[arg(
        long,
        short,
        help = "Directory to write report artifacts to (defaults to <input>__results)"
    )]
    output_dir: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = false,
        help = "Register per-bill and per-period values alongside the report"
    )]
    extended_telemetry: bool,
}

#[derive(Args, Debug)]
struct CoilMultiplierArgs {
    input_file: String,
    #[arg(long, short, help = "Directory to write the altered coils to")]
    output_dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "ALL",
        help = "Handle of the coil to alter, or ALL or NONE"
    )]
    coil: String,
    #[arg(long, default_value_t = 1.0)]
    rated_high_speed_cooling_capacity_multiplier: f64,
    #[arg(long, default_value_t = 1.0)]
    rated_low_speed_cooling_capacity_multiplier: f64,
    #[arg(long, default_value_t = 1.0)]
    rated_high_speed_cop_multiplier: f64,
    #[arg(long, default_value_t = 1.0)]
    rated_low_speed_cop_multiplier: f64,
}

impl From<&CoilMultiplierArgs> for CoilMultipliers {
    fn from(args: &CoilMultiplierArgs) -> Self {
        Self {
            rated_high_speed_cooling_capacity: args.rated_high_speed_cooling_capacity_multiplier,
            rated_low_speed_cooling_capacity: args.rated_low_speed_cooling_capacity_multiplier,
            rated_high_speed_cop: args.rated_high_speed_cop_multiplier,
            rated_low_speed_cop: args.rated_low_speed_cop_multiplier,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = CalibrationArgs::parse();

    // set up basic tracing
    let tracing_subscriber = {
        let mut builder = tracing_subscriber::fmt::fmt().with_max_level(tracing::Level::DEBUG);

        if args.log_spans {
            builder = builder.with_span_events(FmtSpan::CLOSE);
        }

        builder.finish()
    };
    tracing::subscriber::set_global_default(tracing_subscriber)?;

    match args.command {
        Command::Report(report_args) => report(report_args),
        Command::CoilMultiplier(coil_args) => coil_multiplier(coil_args),
    }
}

fn report(args: ReportArgs) -> anyhow::Result<()> {
    let file_output = file_output_for(&args.input_file, args.output_dir.as_ref())?;
    let flags = ReportFlags {
        extended_telemetry_enabled: args.extended_telemetry,
    };

    let report = run_report(
        BufReader::new(File::open(Path::new(&args.input_file))?),
        &file_output,
        flags,
    )?;

    for precondition in &report.missing_preconditions {
        debug!("Missing model data: {precondition}");
    }
    println!("{}", report.final_condition);

    Ok(())
}

fn coil_multiplier(args: CoilMultiplierArgs) -> anyhow::Result<()> {
    let file_output = file_output_for(&args.input_file, args.output_dir.as_ref())?;
    let selection: CoilSelection = args.coil.parse()?;
    let multipliers = CoilMultipliers::from(&args);

    let (_coils, outcome) = run_coil_multiplier(
        BufReader::new(File::open(Path::new(&args.input_file))?),
        &file_output,
        &selection,
        &multipliers,
    )?;

    for error in &outcome.errors {
        warn!("Skipped multiplier: {error}");
    }
    println!("{}", outcome.final_condition());

    Ok(())
}

fn file_output_for(input_file: &str, output_dir: Option<&PathBuf>) -> anyhow::Result<FileOutput> {
    let input_file_ext = Path::new(input_file).extension().and_then(OsStr::to_str);
    let input_file_stem = match input_file_ext {
        Some(ext) => &input_file[..(input_file.len() - ext.len() - 1)],
        None => input_file,
    };
    let input_file_stem = PathBuf::from(input_file_stem);
    let input_file_name = input_file_stem
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| anyhow!("Input file path {input_file} has no file name"))?;

    let output_path = match output_dir {
        Some(output_dir) => output_dir.clone(),
        None => PathBuf::from(format!("{}__results", input_file_stem.display())),
    };
    fs::create_dir_all(&output_path)?;

    Ok(FileOutput::new(
        output_path,
        format!("{input_file_name}__{{}}.{{}}"),
    ))
}
