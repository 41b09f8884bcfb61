//! bod-diagnostics — BOD 18-01 compliance diagnostics for scan report CSVs.
//!
//! Consumes the flattened CSVs produced by pshtt (HTTPS configuration) and
//! trustymail (email authentication) scans and explains *why* domains fail
//! the directive: per-domain score breakdowns for the web checks, and an
//! exclusive decision funnel with structured failure detail for the email
//! checks.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use bod_diagnostics::{analyze, AnalyzeOptions, ReportKind};
//! use bod_diagnostics::report::OutputFormat;
//!
//! let options = AnalyzeOptions {
//!     kind: ReportKind::Trustymail,
//!     domains: vec![],
//! };
//! let report = analyze(Path::new("trustymail_results.csv"), &options).unwrap();
//! print!("{}", bod_diagnostics::render_report(&report, OutputFormat::Console).unwrap());
//! ```

pub mod error;
pub mod filter;
pub mod ingest;
pub mod record;
pub mod report;
pub mod score;

use std::io::Read;
use std::path::Path;

use error::Result;
use filter::DomainFilter;
use report::OutputFormat;
use score::{HttpsScorer, TrustymailScorer};

/// Which scanner produced the report being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Https,
    Trustymail,
}

impl Default for ReportKind {
    fn default() -> Self {
        Self::Https
    }
}

/// Options for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub kind: ReportKind,
    /// Optional allow-list of domains; empty means score every row.
    pub domains: Vec<String>,
}

/// A completed analysis: the result store for one run. Constructed fresh per
/// run; nothing is shared across runs.
#[derive(Debug)]
pub enum Report {
    Https(HttpsScorer),
    Trustymail(TrustymailScorer),
}

impl Report {
    /// Whether the run surfaced any non-compliant domain, for the process
    /// exit code.
    pub fn found_noncompliance(&self) -> bool {
        match self {
            // Weak-crypto support counts: such domains appear in the report
            // even when all four scores pass.
            Self::Https(scorer) => scorer
                .results()
                .any(|(_, r)| !r.scores.all_pass() || r.weak_crypto_hosts.is_some()),
            Self::Trustymail(scorer) => {
                let c = scorer.counters();
                c.smtp_invalid + c.spf_not_covered + c.has_weak_crypto + c.dmarc_invalid
                    + c.bod_failed
                    > 0
            }
        }
    }
}

/// Run a complete analysis: ingest the CSV, score every row, return the
/// result store.
pub fn analyze(path: &Path, options: &AnalyzeOptions) -> Result<Report> {
    let records = ingest::read_csv(path)?;
    score_records(&records, options)
}

/// Same as [`analyze`] for CSV text already in memory.
pub fn analyze_from<R: Read>(source: R, options: &AnalyzeOptions) -> Result<Report> {
    let records = ingest::read_csv_from(source)?;
    score_records(&records, options)
}

fn score_records(
    records: &[record::NormalizedRecord],
    options: &AnalyzeOptions,
) -> Result<Report> {
    let filter = DomainFilter::new(&options.domains);
    match options.kind {
        ReportKind::Https => {
            let mut scorer = HttpsScorer::new(filter);
            for record in records {
                scorer.score(record)?;
            }
            Ok(Report::Https(scorer))
        }
        ReportKind::Trustymail => {
            let mut scorer = TrustymailScorer::new(filter);
            for record in records {
                scorer.score(record)?;
            }
            Ok(Report::Trustymail(scorer))
        }
    }
}

/// Render an analysis report in the specified format.
pub fn render_report(report: &Report, format: OutputFormat) -> Result<String> {
    report::render(report, format)
}
