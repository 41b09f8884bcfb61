//! CSV report rendering: one row per failing domain, one column per raw
//! field plus one per named score or condition, headers carrying the rule
//! text so the export is self-describing.

use crate::error::{DiagnosticsError, Result};
use crate::score::https::{HttpsScorer, PLAIN_VALUES, SCORING};
use crate::score::trustymail::{
    FailureBucket, TrustymailScorer, BOD_RUA_URL, CONDITIONS, PLAIN_VALUES as TM_VALUES,
};
use crate::Report;

pub fn render(report: &Report) -> Result<String> {
    match report {
        Report::Https(scorer) => render_https(scorer),
        Report::Trustymail(scorer) => render_trustymail(scorer),
    }
}

fn render_https(scorer: &HttpsScorer) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = vec!["Domain".to_string()];
    header.extend(PLAIN_VALUES.iter().map(|v| v.to_string()));
    header.extend(SCORING.iter().map(|(name, desc)| format!("{name} - {desc}")));
    writer.write_record(&header)?;

    for (domain, result) in scorer.results() {
        if result.scores.all_pass() {
            continue;
        }
        let mut row: Vec<String> = vec![domain.to_string()];
        row.extend(result.plain_values().iter().map(|b| b.to_string()));
        row.extend(result.scores.as_array().iter().map(|b| b.to_string()));
        writer.write_record(&row)?;
    }

    into_string(writer)
}

fn render_trustymail(scorer: &TrustymailScorer) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = vec!["Domain".to_string()];
    header.extend(TM_VALUES.iter().map(|v| v.to_string()));
    header.extend(CONDITIONS.iter().map(|c| c.to_string()));
    header.push(format!("RUA URLs (should contain '{BOD_RUA_URL}')"));
    writer.write_record(&header)?;

    for bucket in [FailureBucket::InvalidDmarc, FailureBucket::InvalidRua] {
        for failure in scorer.failures(bucket) {
            let mut row: Vec<String> = vec![failure.domain.clone()];
            row.push(failure.base_domain.to_string());
            row.push(failure.valid_dmarc.to_string());
            row.push(failure.dmarc_policy.clone());
            row.push(failure.dmarc_subdomain_policy.clone());
            row.push(failure.dmarc_policy_percentage.clone());
            row.extend(failure.conditions().iter().map(|b| b.to_string()));
            row.push(failure.rua_urls.join(";"));
            writer.write_record(&row)?;
        }
    }

    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| DiagnosticsError::Output(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DiagnosticsError::Output(e.to_string()))
}
