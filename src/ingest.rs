//! CSV ingestion: header-keyed rows out of a report file, normalized.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::record::NormalizedRecord;

/// Stream normalized records out of a report CSV file. Read and decode
/// failures are fatal; a partial report is worse than a loud error.
pub fn read_csv(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let reader = csv::Reader::from_path(path)?;
    collect_records(reader)
}

/// Same as [`read_csv`] but over any reader, for callers holding CSV text
/// in memory.
pub fn read_csv_from<R: Read>(source: R) -> Result<Vec<NormalizedRecord>> {
    collect_records(csv::Reader::from_reader(source))
}

fn collect_records<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<NormalizedRecord>> {
    let mut records = Vec::new();
    for row in reader.deserialize::<HashMap<String, String>>() {
        records.push(NormalizedRecord::from_row(row?));
    }
    tracing::debug!(rows = records.len(), "ingested report CSV");
    Ok(records)
}
