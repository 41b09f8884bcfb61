//! BOD 18-01 web compliance scoring over pshtt report rows.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::filter::DomainFilter;
use crate::record::NormalizedRecord;

/// Raw pshtt fields consulted per domain, in report order.
pub const PLAIN_VALUES: [&str; 5] = [
    "Live",
    "Base Domain HSTS Preloaded",
    "Domain Supports HTTPS",
    "Domain Enforces HTTPS",
    "Domain Uses Strong HSTS",
];

/// Score names paired with the rule text that produces them, used as column
/// titles and console annotations.
pub const SCORING: [(&str, &str); 4] = [
    (
        "Uses HTTPS",
        "'Domain Supports HTTPS' or ('Live' and 'Base Domain HSTS Preloaded')",
    ),
    (
        "Enforces HTTPS",
        "'Domain Enforces HTTPS' or ('Live' and 'Base Domain HSTS Preloaded')",
    ),
    (
        "Uses Strong HSTS",
        "'Domain Uses Strong HSTS' or ('Live' and 'Base Domain HSTS Preloaded')",
    ),
    (
        "BOD 18-01 Web Compliance",
        "('Domain Supports HTTPS' and 'Domain Enforces HTTPS' and 'Domain Uses Strong HSTS') \
         or ('Live' and 'Base Domain HSTS Preloaded')",
    ),
];

/// The four computed scores for one domain, in [`SCORING`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HttpsScores {
    pub uses_https: bool,
    pub enforces_https: bool,
    pub strong_hsts: bool,
    pub compliant: bool,
}

impl HttpsScores {
    pub fn all_pass(&self) -> bool {
        self.uses_https && self.enforces_https && self.strong_hsts && self.compliant
    }

    /// Scores as an ordered tuple matching [`SCORING`].
    pub fn as_array(&self) -> [bool; 4] {
        [
            self.uses_https,
            self.enforces_https,
            self.strong_hsts,
            self.compliant,
        ]
    }
}

/// Per-domain result: the raw fields that justify the scores plus the scores
/// themselves. Immutable once stored.
#[derive(Debug, Clone, Serialize)]
pub struct HttpsResult {
    pub live: bool,
    pub base_domain_hsts_preloaded: bool,
    pub supports_https: bool,
    pub enforces_https: bool,
    pub uses_strong_hsts: bool,
    pub scores: HttpsScores,
    /// Weak-crypto host listing, retained when the domain supports any weak
    /// crypto algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weak_crypto_hosts: Option<String>,
}

impl HttpsResult {
    /// Raw field values in [`PLAIN_VALUES`] order.
    pub fn plain_values(&self) -> [bool; 5] {
        [
            self.live,
            self.base_domain_hsts_preloaded,
            self.supports_https,
            self.enforces_https,
            self.uses_strong_hsts,
        ]
    }
}

/// Scores pshtt rows and owns the per-domain results for one run.
#[derive(Debug, Default)]
pub struct HttpsScorer {
    filter: DomainFilter,
    results: BTreeMap<String, HttpsResult>,
}

impl HttpsScorer {
    pub fn new(filter: DomainFilter) -> Self {
        Self {
            filter,
            results: BTreeMap::new(),
        }
    }

    /// Score one normalized row. Rows outside the domain filter are ignored;
    /// a repeated domain overwrites its earlier result.
    pub fn score(&mut self, record: &NormalizedRecord) -> Result<()> {
        if !self.filter.includes(record)? {
            return Ok(());
        }

        let live = record.bool_field("Live")?;
        let preloaded = record.bool_field("Base Domain HSTS Preloaded")?;
        let supports_https = record.bool_field("Domain Supports HTTPS")?;
        let enforces_https = record.bool_field("Domain Enforces HTTPS")?;
        let uses_strong_hsts = record.bool_field("Domain Uses Strong HSTS")?;

        // The preload exception: a live, HSTS-preloaded base domain counts as
        // compliant for every criterion. Computed once, applied to all four.
        let fallback = live && preloaded;

        let scores = HttpsScores {
            uses_https: supports_https || fallback,
            enforces_https: enforces_https || fallback,
            strong_hsts: uses_strong_hsts || fallback,
            compliant: (supports_https && enforces_https && uses_strong_hsts) || fallback,
        };

        let weak_crypto_hosts = if record.bool_field("Domain Supports Weak Crypto")? {
            Some(record.text_field("Web Hosts With Weak Crypto")?.to_string())
        } else {
            None
        };

        self.results.insert(
            record.domain_key()?,
            HttpsResult {
                live,
                base_domain_hsts_preloaded: preloaded,
                supports_https,
                enforces_https,
                uses_strong_hsts,
                scores,
                weak_crypto_hosts,
            },
        );
        Ok(())
    }

    /// All scored domains with their results, ordered by domain. Filtering
    /// down to failing domains is the reporter's call, not the scorer's.
    pub fn results(&self) -> impl Iterator<Item = (&str, &HttpsResult)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
