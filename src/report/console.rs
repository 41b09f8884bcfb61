//! Human-readable report rendering, matching the layout analysts already
//! read: per-domain blocks with the raw values and the rule text behind each
//! score, then the funnel summary as `<counter> :: <count>` lines.

use crate::score::https::{HttpsScorer, PLAIN_VALUES, SCORING};
use crate::score::trustymail::{
    FailureBucket, FailureRecord, TrustymailScorer, BOD_RUA_URL, CONDITIONS,
    PLAIN_VALUES as TM_VALUES,
};
use crate::Report;

pub fn render(report: &Report) -> String {
    match report {
        Report::Https(scorer) => render_https(scorer),
        Report::Trustymail(scorer) => render_trustymail(scorer),
    }
}

/// Only domains with a failing score are shown; fully compliant domains need
/// no diagnostics.
fn render_https(scorer: &HttpsScorer) -> String {
    let mut out = String::new();
    out.push_str("Domains with Failing Checks ::\n");

    for (domain, result) in scorer.results() {
        if result.scores.all_pass() && result.weak_crypto_hosts.is_none() {
            continue;
        }
        out.push_str(&format!("  {domain}\n"));
        out.push_str("    pshtt Values:\n");
        for (name, value) in PLAIN_VALUES.iter().zip(result.plain_values()) {
            out.push_str(&format!("      {name}: {value}\n"));
        }
        out.push_str("    Scores:\n");
        for ((name, desc), value) in SCORING.iter().zip(result.scores.as_array()) {
            out.push_str(&format!("      {name} : {desc}\n"));
            out.push_str(&format!("      = {value}\n"));
        }
        if let Some(hosts) = &result.weak_crypto_hosts {
            out.push_str("    The Following Hosts Support Weak Crypto:\n");
            out.push_str(&format!("      {hosts}\n"));
        }
    }
    out
}

fn render_trustymail(scorer: &TrustymailScorer) -> String {
    let mut out = String::new();

    for bucket in [FailureBucket::InvalidDmarc, FailureBucket::InvalidRua] {
        let failures = scorer.failures(bucket);
        if failures.is_empty() {
            continue;
        }
        out.push_str(&bucket.title());
        out.push('\n');
        for failure in failures {
            render_failure(&mut out, failure);
        }
        out.push('\n');
    }

    for (name, count) in scorer.counters().iter() {
        out.push_str(&format!("{name} :: {count}\n"));
    }
    out
}

fn render_failure(out: &mut String, failure: &FailureRecord) {
    out.push_str(&format!("  {}\n", failure.domain));
    let values = [
        failure.base_domain.to_string(),
        failure.valid_dmarc.to_string(),
        format!("\"{}\"", failure.dmarc_policy),
        format!("\"{}\"", failure.dmarc_subdomain_policy),
        failure.dmarc_policy_percentage.clone(),
    ];
    for (name, value) in TM_VALUES.iter().zip(values) {
        out.push_str(&format!("    {name} : {value}\n"));
    }
    out.push_str("    Conditions (must be true):\n");
    for (desc, value) in CONDITIONS.iter().zip(failure.conditions()) {
        out.push_str(&format!("      {desc} : {value}\n"));
    }
    if !failure.rua_urls.is_empty() {
        out.push_str(&format!(
            "    RUA URLs (should contain '{BOD_RUA_URL}'):\n"
        ));
        for url in &failure.rua_urls {
            out.push_str(&format!("      {url}\n"));
        }
    }
}
