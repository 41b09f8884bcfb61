use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bod_diagnostics::report::OutputFormat;
use bod_diagnostics::{analyze, AnalyzeOptions, ReportKind};

#[derive(Parser)]
#[command(
    name = "bod-diagnostics",
    about = "Diagnostic information from BOD 18-01 report CSVs",
    version
)]
struct Cli {
    /// Print debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a pshtt HTTPS report
    Https {
        /// The CSV file to parse
        csv_file: PathBuf,

        /// Optional list of domains to filter against
        domains: Vec<String>,

        /// Output format (console, csv, json)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Analyze a trustymail report
    Trustymail {
        /// The CSV file to parse
        csv_file: PathBuf,

        /// Optional list of domains to filter against
        domains: Vec<String>,

        /// Output format (console, csv, json)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let result = match cli.command {
        Commands::Https {
            csv_file,
            domains,
            format,
            output,
        } => run(ReportKind::Https, csv_file, domains, format, output),
        Commands::Trustymail {
            csv_file,
            domains,
            format,
            output,
        } => run(ReportKind::Trustymail, csv_file, domains, format, output),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

fn run(
    kind: ReportKind,
    csv_file: PathBuf,
    domains: Vec<String>,
    format_str: String,
    output_path: Option<PathBuf>,
) -> Result<i32, bod_diagnostics::error::DiagnosticsError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let options = AnalyzeOptions { kind, domains };
    let report = analyze(&csv_file, &options)?;
    let rendered = bod_diagnostics::render_report(&report, format)?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = all compliant, 1 = non-compliant domains found
    Ok(if report.found_noncompliance() { 1 } else { 0 })
}
