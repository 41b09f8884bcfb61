pub mod console;
pub mod csv;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::Report;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Some(Self::Console),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Render a report into the specified format. The scorers only ever hand
/// over structured results; all formatting decisions live here.
pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(console::render(report)),
        OutputFormat::Csv => csv::render(report),
        OutputFormat::Json => json::render(report),
    }
}
