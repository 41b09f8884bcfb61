//! Optional domain allow-list applied before scoring.

use crate::error::Result;
use crate::record::NormalizedRecord;

/// Case-insensitive exact-match allow-list. An empty filter includes every
/// row. No wildcard or subdomain matching: `example.com` does not cover
/// `sub.example.com`.
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    domains: Vec<String>,
}

impl DomainFilter {
    pub fn new(domains: &[String]) -> Self {
        let domains: Vec<String> = domains.iter().map(|d| d.to_lowercase()).collect();
        tracing::debug!(?domains, "domain filter configured");
        Self { domains }
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Whether the record's domain should be scored.
    pub fn includes(&self, record: &NormalizedRecord) -> Result<bool> {
        if self.domains.is_empty() {
            return Ok(true);
        }
        let key = record.domain_key()?;
        Ok(self.domains.contains(&key))
    }
}
