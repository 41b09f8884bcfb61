//! Field normalization for scanner CSV rows.
//!
//! pshtt and trustymail emit stringly-typed booleans ("True"/"False").
//! Rows are normalized once at ingestion so the scorers only ever see real
//! booleans; values that are neither are kept verbatim as text.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{DiagnosticsError, Result};

/// A normalized CSV field: either a recognized boolean or the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// Boolean view of a field. Unrecognized text is treated as truthy when
    /// non-empty, matching the scanners' loose serialization. This is a
    /// guardrail for malformed input, not an expected path.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Text view of a field; booleans have no text form.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Bool(_) => "",
            Self::Text(s) => s,
        }
    }

    /// Exact string comparison. A field that normalized to a boolean never
    /// matches, so e.g. a bogus "True" DMARC policy cannot equal "reject".
    pub fn matches_text(&self, expected: &str) -> bool {
        match self {
            Self::Bool(_) => false,
            Self::Text(s) => s == expected,
        }
    }
}

/// One CSV row with boolean-like fields converted. Ephemeral: built per row,
/// dropped after scoring.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    fields: HashMap<String, FieldValue>,
}

impl NormalizedRecord {
    /// Normalize a raw header-keyed row. Any value equal to "true"/"false"
    /// after trimming, case-insensitively, becomes a boolean; everything else
    /// passes through unchanged.
    pub fn from_row(row: HashMap<String, String>) -> Self {
        let fields = row
            .into_iter()
            .map(|(name, raw)| {
                let value = match raw.trim().to_lowercase().as_str() {
                    "true" => FieldValue::Bool(true),
                    "false" => FieldValue::Bool(false),
                    _ => FieldValue::Text(raw),
                };
                (name, value)
            })
            .collect();
        Self { fields }
    }

    /// The row's lower-cased "Domain" field, the identity used for result
    /// lookups. Case differences in the CSV must not create duplicate keys.
    pub fn domain_key(&self) -> Result<String> {
        Ok(self.require("Domain")?.as_text().to_lowercase())
    }

    /// The raw (original-case) domain, for display in failure records.
    pub fn domain_raw(&self) -> Result<&str> {
        Ok(self.require("Domain")?.as_text())
    }

    /// Fetch a required field; a missing field aborts the run rather than
    /// silently skewing the report.
    pub fn require(&self, field: &str) -> Result<&FieldValue> {
        self.fields
            .get(field)
            .ok_or_else(|| DiagnosticsError::MissingField {
                field: field.to_string(),
                domain: self
                    .fields
                    .get("Domain")
                    .map(|v| v.as_text().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string()),
            })
    }

    /// Boolean view of a required field.
    pub fn bool_field(&self, field: &str) -> Result<bool> {
        Ok(self.require(field)?.truthy())
    }

    /// Text view of a required field (empty for boolean fields).
    pub fn text_field(&self, field: &str) -> Result<&str> {
        Ok(self.require(field)?.as_text())
    }
}
