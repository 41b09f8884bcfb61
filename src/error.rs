use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiagnosticsError>;

#[derive(Error, Debug)]
pub enum DiagnosticsError {
    #[error("Row for domain '{domain}' is missing required field '{field}'")]
    MissingField { field: String, domain: String },

    #[error("Output error: {0}")]
    Output(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DiagnosticsError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}
