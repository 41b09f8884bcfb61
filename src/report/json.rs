//! JSON report rendering. Unlike the console and CSV views this serializes
//! every scored domain, compliant or not, so downstream tooling can apply
//! its own filtering.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::score::https::HttpsResult;
use crate::score::trustymail::{FailureBucket, FailureRecord, FunnelCounters};
use crate::Report;

#[derive(Serialize)]
struct HttpsJsonReport<'a> {
    domains: BTreeMap<&'a str, &'a HttpsResult>,
}

#[derive(Serialize)]
struct TrustymailJsonReport<'a> {
    counters: &'a FunnelCounters,
    invalid_dmarc: &'a [FailureRecord],
    invalid_rua: &'a [FailureRecord],
}

pub fn render(report: &Report) -> Result<String> {
    let json = match report {
        Report::Https(scorer) => serde_json::to_string_pretty(&HttpsJsonReport {
            domains: scorer.results().collect(),
        })?,
        Report::Trustymail(scorer) => serde_json::to_string_pretty(&TrustymailJsonReport {
            counters: scorer.counters(),
            invalid_dmarc: scorer.failures(FailureBucket::InvalidDmarc),
            invalid_rua: scorer.failures(FailureBucket::InvalidRua),
        })?,
    };
    Ok(json)
}
