//! BOD 18-01 email-authentication scoring over trustymail report rows.
//!
//! Each row walks a strict linear funnel: the first failing stage classifies
//! the domain into a terminal bucket and stops evaluation, so the pass/fail
//! counts at every level sum exactly to the count that entered that level.
//! DMARC and RUA failures additionally emit a structured failure record,
//! since those checks involve more than a single true/false field.

use serde::Serialize;

use crate::error::Result;
use crate::filter::DomainFilter;
use crate::record::NormalizedRecord;

/// The aggregate-report address BOD 18-01 requires in every DMARC record.
pub const BOD_RUA_URL: &str = "mailto:reports@dmarc.cyber.dhs.gov";

/// Raw trustymail fields echoed in failure reports, in report order.
pub const PLAIN_VALUES: [&str; 5] = [
    "Base Domain",
    "Valid DMARC",
    "DMARC Policy",
    "DMARC Subdomain Policy",
    "DMARC Policy Percentage",
];

/// The three DMARC sub-conditions, as shown to report readers. All must hold
/// for a DMARC configuration to satisfy the directive.
pub const CONDITIONS: [&str; 3] = [
    "'Valid DMARC' and 'DMARC Policy' == \"reject\"",
    "'Valid DMARC' and (not 'Base Domain' or 'DMARC Subdomain Policy' == \"reject\")",
    "'Valid DMARC' and 'DMARC Policy Percentage' == 100",
];

/// Funnel counters for one run. Monotonic; each pair sums to the count that
/// reached its stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunnelCounters {
    pub total_domains: u64,
    pub domains_checked: u64,
    pub domains_skipped: u64,
    pub smtp_valid: u64,
    pub smtp_invalid: u64,
    pub spf_covered: u64,
    pub spf_not_covered: u64,
    pub no_weak_crypto: u64,
    pub has_weak_crypto: u64,
    pub dmarc_valid: u64,
    pub dmarc_invalid: u64,
    pub bod_compliant: u64,
    pub bod_failed: u64,
}

impl FunnelCounters {
    /// Counters as (name, count) pairs in funnel order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> {
        [
            ("total_domains", self.total_domains),
            ("domains_checked", self.domains_checked),
            ("domains_skipped", self.domains_skipped),
            ("smtp_valid", self.smtp_valid),
            ("smtp_invalid", self.smtp_invalid),
            ("spf_covered", self.spf_covered),
            ("spf_not_covered", self.spf_not_covered),
            ("no_weak_crypto", self.no_weak_crypto),
            ("has_weak_crypto", self.has_weak_crypto),
            ("dmarc_valid", self.dmarc_valid),
            ("dmarc_invalid", self.dmarc_invalid),
            ("bod_compliant", self.bod_compliant),
            ("bod_failed", self.bod_failed),
        ]
        .into_iter()
    }
}

/// Which failure list a non-compliant domain lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureBucket {
    InvalidDmarc,
    InvalidRua,
}

impl FailureBucket {
    /// Report heading for this bucket.
    pub fn title(&self) -> String {
        match self {
            Self::InvalidDmarc => "Domains With Invalid DMARC Configurations ::".to_string(),
            Self::InvalidRua => format!("Domains Missing RUA URL \"{BOD_RUA_URL}\" ::"),
        }
    }
}

/// Diagnostic detail for a domain that failed the DMARC or RUA stage: the raw
/// fields consulted, the three sub-conditions, and the parsed RUA URI list.
/// Never mutated after creation; list order is CSV row order.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub domain: String,
    pub base_domain: bool,
    pub valid_dmarc: bool,
    pub dmarc_policy: String,
    pub dmarc_subdomain_policy: String,
    pub dmarc_policy_percentage: String,
    pub policy_reject: bool,
    pub subdomain_policy_reject: bool,
    pub policy_pct_100: bool,
    pub rua_urls: Vec<String>,
}

impl FailureRecord {
    /// The three sub-conditions in [`CONDITIONS`] order.
    pub fn conditions(&self) -> [bool; 3] {
        [
            self.policy_reject,
            self.subdomain_policy_reject,
            self.policy_pct_100,
        ]
    }
}

/// Everything the funnel needs, derived once per row before any counter is
/// touched.
struct FunnelInput {
    base_domain: bool,
    supports_smtp: bool,
    supports_starttls: bool,
    supports_weak_crypto: bool,
    spf_covered: bool,
    dmarc_fully_valid: bool,
    rua_matches: bool,
    failure: FailureRecord,
}

impl FunnelInput {
    fn derive(record: &NormalizedRecord) -> Result<Self> {
        let base_domain = record.bool_field("Domain Is Base Domain")?;
        let valid_dmarc = record.bool_field("Valid DMARC")?
            || record.bool_field("Valid DMARC Record on Base Domain")?;

        let policy_reject = valid_dmarc && record.require("DMARC Policy")?.matches_text("reject");
        let subdomain_policy_reject = valid_dmarc
            && (!base_domain
                || record
                    .require("DMARC Subdomain Policy")?
                    .matches_text("reject"));
        let policy_pct_100 =
            valid_dmarc && record.require("DMARC Policy Percentage")?.matches_text("100");
        let dmarc_fully_valid = policy_reject && subdomain_policy_reject && policy_pct_100;

        // A subdomain with no SPF record of its own inherits coverage through
        // a fully valid DMARC reject policy; a base domain never does.
        let valid_spf = record.bool_field("Valid SPF")?;
        let spf_covered = if base_domain {
            valid_spf
        } else {
            valid_spf || (!record.bool_field("SPF Record")? && dmarc_fully_valid)
        };

        let rua_urls: Vec<String> = record
            .text_field("DMARC Aggregate Report URIs")?
            .split(',')
            .map(|u| u.trim().to_lowercase())
            .collect();
        let rua_matches = valid_dmarc && rua_urls.iter().any(|u| u == BOD_RUA_URL);

        Ok(Self {
            base_domain,
            supports_smtp: record.bool_field("Domain Supports SMTP")?,
            supports_starttls: record.bool_field("Domain Supports STARTTLS")?,
            supports_weak_crypto: record.bool_field("Domain Supports Weak Crypto")?,
            spf_covered,
            dmarc_fully_valid,
            rua_matches,
            failure: FailureRecord {
                domain: record.domain_raw()?.to_string(),
                base_domain,
                valid_dmarc,
                dmarc_policy: record.text_field("DMARC Policy")?.to_string(),
                dmarc_subdomain_policy: record.text_field("DMARC Subdomain Policy")?.to_string(),
                dmarc_policy_percentage: record.text_field("DMARC Policy Percentage")?.to_string(),
                policy_reject,
                subdomain_policy_reject,
                policy_pct_100,
                rua_urls,
            },
        })
    }
}

/// One funnel level: a predicate plus the counter each branch increments,
/// and optionally the bucket the failing branch reports into.
struct FunnelStage {
    passes: fn(&FunnelInput) -> bool,
    on_pass: fn(&mut FunnelCounters) -> &mut u64,
    on_fail: fn(&mut FunnelCounters) -> &mut u64,
    fail_bucket: Option<FailureBucket>,
}

/// The funnel, in evaluation order. Keeping this as an explicit table makes
/// the pair-sum invariant mechanically checkable.
const STAGES: [FunnelStage; 6] = [
    // Eligibility: subdomains without SMTP are out of scope.
    FunnelStage {
        passes: |i| i.base_domain || i.supports_smtp,
        on_pass: |c| &mut c.domains_checked,
        on_fail: |c| &mut c.domains_skipped,
        fail_bucket: None,
    },
    // SMTP servers must offer STARTTLS; domains without SMTP pass vacuously.
    FunnelStage {
        passes: |i| (i.supports_smtp && i.supports_starttls) || !i.supports_smtp,
        on_pass: |c| &mut c.smtp_valid,
        on_fail: |c| &mut c.smtp_invalid,
        fail_bucket: None,
    },
    FunnelStage {
        passes: |i| i.spf_covered,
        on_pass: |c| &mut c.spf_covered,
        on_fail: |c| &mut c.spf_not_covered,
        fail_bucket: None,
    },
    FunnelStage {
        passes: |i| !i.supports_weak_crypto,
        on_pass: |c| &mut c.no_weak_crypto,
        on_fail: |c| &mut c.has_weak_crypto,
        fail_bucket: None,
    },
    FunnelStage {
        passes: |i| i.dmarc_fully_valid,
        on_pass: |c| &mut c.dmarc_valid,
        on_fail: |c| &mut c.dmarc_invalid,
        fail_bucket: Some(FailureBucket::InvalidDmarc),
    },
    FunnelStage {
        passes: |i| i.rua_matches,
        on_pass: |c| &mut c.bod_compliant,
        on_fail: |c| &mut c.bod_failed,
        fail_bucket: Some(FailureBucket::InvalidRua),
    },
];

/// Walks trustymail rows through the funnel and owns the counters and
/// failure lists for one run.
#[derive(Debug, Default)]
pub struct TrustymailScorer {
    filter: DomainFilter,
    counters: FunnelCounters,
    invalid_dmarc: Vec<FailureRecord>,
    invalid_rua: Vec<FailureRecord>,
}

impl TrustymailScorer {
    pub fn new(filter: DomainFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// Classify one normalized row. Every row past the domain filter counts
    /// toward `total_domains`, duplicates included.
    pub fn score(&mut self, record: &NormalizedRecord) -> Result<()> {
        if !self.filter.includes(record)? {
            return Ok(());
        }

        let input = FunnelInput::derive(record)?;
        self.counters.total_domains += 1;

        for stage in &STAGES {
            if (stage.passes)(&input) {
                *(stage.on_pass)(&mut self.counters) += 1;
            } else {
                *(stage.on_fail)(&mut self.counters) += 1;
                match stage.fail_bucket {
                    Some(FailureBucket::InvalidDmarc) => {
                        self.invalid_dmarc.push(input.failure);
                    }
                    Some(FailureBucket::InvalidRua) => {
                        self.invalid_rua.push(input.failure);
                    }
                    None => {}
                }
                break;
            }
        }
        Ok(())
    }

    pub fn counters(&self) -> &FunnelCounters {
        &self.counters
    }

    /// Failure records for one bucket, in CSV row order.
    pub fn failures(&self, bucket: FailureBucket) -> &[FailureRecord] {
        match bucket {
            FailureBucket::InvalidDmarc => &self.invalid_dmarc,
            FailureBucket::InvalidRua => &self.invalid_rua,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.invalid_dmarc.is_empty() || !self.invalid_rua.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// A base-domain row that sails through the whole funnel.
    fn compliant_row() -> HashMap<String, String> {
        [
            ("Domain", "example.gov"),
            ("Domain Is Base Domain", "True"),
            ("Valid DMARC", "True"),
            ("Valid DMARC Record on Base Domain", "True"),
            ("DMARC Policy", "reject"),
            ("DMARC Subdomain Policy", "reject"),
            ("DMARC Policy Percentage", "100"),
            ("Valid SPF", "True"),
            ("SPF Record", "True"),
            ("Domain Supports SMTP", "True"),
            ("Domain Supports STARTTLS", "True"),
            ("Domain Supports Weak Crypto", "False"),
            ("DMARC Aggregate Report URIs", BOD_RUA_URL),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn score_rows(rows: Vec<HashMap<String, String>>) -> TrustymailScorer {
        let mut scorer = TrustymailScorer::default();
        for row in rows {
            scorer.score(&NormalizedRecord::from_row(row)).unwrap();
        }
        scorer
    }

    fn assert_pair_sums(c: &FunnelCounters) {
        assert_eq!(c.domains_checked + c.domains_skipped, c.total_domains);
        assert_eq!(c.smtp_valid + c.smtp_invalid, c.domains_checked);
        assert_eq!(c.spf_covered + c.spf_not_covered, c.smtp_valid);
        assert_eq!(c.no_weak_crypto + c.has_weak_crypto, c.spf_covered);
        assert_eq!(c.dmarc_valid + c.dmarc_invalid, c.no_weak_crypto);
        assert_eq!(c.bod_compliant + c.bod_failed, c.dmarc_valid);
    }

    #[test]
    fn fully_compliant_domain_reaches_the_end() {
        let scorer = score_rows(vec![compliant_row()]);
        let c = scorer.counters();
        assert_eq!(c.bod_compliant, 1);
        assert_eq!(c.bod_failed, 0);
        assert!(!scorer.has_failures());
        assert_pair_sums(c);
    }

    #[test]
    fn quarantine_policy_lands_in_invalid_dmarc() {
        // DMARC is valid but the policy is not "reject".
        let mut row = compliant_row();
        row.insert("DMARC Policy".into(), "quarantine".into());
        let scorer = score_rows(vec![row]);

        assert_eq!(scorer.counters().dmarc_invalid, 1);
        assert_eq!(scorer.counters().bod_compliant, 0);
        let failures = scorer.failures(FailureBucket::InvalidDmarc);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].domain, "example.gov");
        assert_eq!(failures[0].conditions(), [false, true, true]);
        assert_eq!(failures[0].dmarc_policy, "quarantine");
        assert_pair_sums(scorer.counters());
    }

    #[test]
    fn wrong_rua_url_lands_in_invalid_rua() {
        let mut row = compliant_row();
        row.insert(
            "DMARC Aggregate Report URIs".into(),
            "mailto:other@example.com".into(),
        );
        let scorer = score_rows(vec![row]);

        assert_eq!(scorer.counters().dmarc_valid, 1);
        assert_eq!(scorer.counters().bod_failed, 1);
        let failures = scorer.failures(FailureBucket::InvalidRua);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rua_urls, vec!["mailto:other@example.com"]);
        assert_pair_sums(scorer.counters());
    }

    #[test]
    fn rua_match_ignores_case_and_padding() {
        let mut row = compliant_row();
        row.insert(
            "DMARC Aggregate Report URIs".into(),
            "mailto:first@example.com, Mailto:Reports@DMARC.cyber.dhs.gov ".into(),
        );
        let scorer = score_rows(vec![row]);
        assert_eq!(scorer.counters().bod_compliant, 1);
    }

    #[test]
    fn rua_never_matches_without_valid_dmarc() {
        let mut row = compliant_row();
        row.insert("Valid DMARC".into(), "False".into());
        row.insert("Valid DMARC Record on Base Domain".into(), "False".into());
        let scorer = score_rows(vec![row]);
        // No valid DMARC means the reject conditions all fail first.
        assert_eq!(scorer.counters().dmarc_invalid, 1);
        assert_eq!(scorer.counters().bod_compliant, 0);
    }

    #[test]
    fn subdomain_without_smtp_is_skipped() {
        let mut row = compliant_row();
        row.insert("Domain Is Base Domain".into(), "False".into());
        row.insert("Domain Supports SMTP".into(), "False".into());
        let scorer = score_rows(vec![row]);

        let c = scorer.counters();
        assert_eq!(c.domains_skipped, 1);
        assert_eq!(c.domains_checked, 0);
        // Later stages were never reached.
        assert_eq!(c.smtp_valid + c.smtp_invalid, 0);
        assert_pair_sums(c);
    }

    #[test]
    fn smtp_without_starttls_is_invalid() {
        let mut row = compliant_row();
        row.insert("Domain Supports STARTTLS".into(), "False".into());
        let scorer = score_rows(vec![row]);
        assert_eq!(scorer.counters().smtp_invalid, 1);
        assert_eq!(scorer.counters().spf_covered, 0);
        assert_pair_sums(scorer.counters());
    }

    #[test]
    fn subdomain_inherits_spf_through_dmarc_reject() {
        // No SPF record of its own, but DMARC is fully valid: covered.
        let mut row = compliant_row();
        row.insert("Domain Is Base Domain".into(), "False".into());
        row.insert("Valid SPF".into(), "False".into());
        row.insert("SPF Record".into(), "False".into());
        let scorer = score_rows(vec![row]);
        assert_eq!(scorer.counters().spf_covered, 1);
        assert_eq!(scorer.counters().bod_compliant, 1);
    }

    #[test]
    fn base_domain_never_inherits_spf() {
        let mut row = compliant_row();
        row.insert("Valid SPF".into(), "False".into());
        row.insert("SPF Record".into(), "False".into());
        let scorer = score_rows(vec![row]);
        assert_eq!(scorer.counters().spf_not_covered, 1);
        assert_pair_sums(scorer.counters());
    }

    #[test]
    fn weak_crypto_terminates_the_funnel() {
        let mut row = compliant_row();
        row.insert("Domain Supports Weak Crypto".into(), "True".into());
        let scorer = score_rows(vec![row]);
        let c = scorer.counters();
        assert_eq!(c.has_weak_crypto, 1);
        assert_eq!(c.dmarc_valid + c.dmarc_invalid, 0);
        assert!(!scorer.has_failures());
        assert_pair_sums(c);
    }

    #[test]
    fn subdomain_policy_only_binds_base_domains() {
        // A subdomain row with a non-reject subdomain policy still satisfies
        // the subdomain condition.
        let mut row = compliant_row();
        row.insert("Domain Is Base Domain".into(), "False".into());
        row.insert("DMARC Subdomain Policy".into(), "none".into());
        let scorer = score_rows(vec![row]);
        assert_eq!(scorer.counters().bod_compliant, 1);
    }

    #[test]
    fn duplicate_domains_count_independently() {
        let scorer = score_rows(vec![compliant_row(), compliant_row()]);
        assert_eq!(scorer.counters().total_domains, 2);
        assert_eq!(scorer.counters().bod_compliant, 2);
    }

    #[test]
    fn filtered_rows_touch_no_counters() {
        let filter = DomainFilter::new(&["other.gov".to_string()]);
        let mut scorer = TrustymailScorer::new(filter);
        scorer
            .score(&NormalizedRecord::from_row(compliant_row()))
            .unwrap();
        assert_eq!(scorer.counters(), &FunnelCounters::default());
    }

    #[test]
    fn counter_iteration_is_in_funnel_order() {
        let scorer = score_rows(vec![compliant_row()]);
        let names: Vec<&str> = scorer.counters().iter().map(|(name, _)| name).collect();
        assert_eq!(names[0], "total_domains");
        assert_eq!(names[names.len() - 1], "bod_failed");
        assert_eq!(names.len(), 13);
    }

    mod exclusivity {
        use super::*;
        use proptest::prelude::*;

        fn bool_str(b: bool) -> String {
            if b { "True".into() } else { "False".into() }
        }

        proptest! {
            /// Pair sums hold for every mix of boolean fields and policies.
            #[test]
            fn pair_sums_hold(rows in proptest::collection::vec(
                (any::<[bool; 9]>(), 0usize..3, 0usize..3), 0..40)
            ) {
                let policies = ["reject", "quarantine", "none"];
                let mut scorer = TrustymailScorer::default();
                for (i, (bits, policy, pct)) in rows.iter().enumerate() {
                    let pcts = ["100", "50", "0"];
                    let row: HashMap<String, String> = [
                        ("Domain".to_string(), format!("d{i}.gov")),
                        ("Domain Is Base Domain".to_string(), bool_str(bits[0])),
                        ("Valid DMARC".to_string(), bool_str(bits[1])),
                        ("Valid DMARC Record on Base Domain".to_string(), bool_str(bits[2])),
                        ("DMARC Policy".to_string(), policies[*policy].to_string()),
                        ("DMARC Subdomain Policy".to_string(), policies[*policy].to_string()),
                        ("DMARC Policy Percentage".to_string(), pcts[*pct].to_string()),
                        ("Valid SPF".to_string(), bool_str(bits[3])),
                        ("SPF Record".to_string(), bool_str(bits[4])),
                        ("Domain Supports SMTP".to_string(), bool_str(bits[5])),
                        ("Domain Supports STARTTLS".to_string(), bool_str(bits[6])),
                        ("Domain Supports Weak Crypto".to_string(), bool_str(bits[7])),
                        (
                            "DMARC Aggregate Report URIs".to_string(),
                            if bits[8] { BOD_RUA_URL.to_string() } else { String::new() },
                        ),
                    ]
                    .into_iter()
                    .collect();
                    scorer.score(&NormalizedRecord::from_row(row)).unwrap();
                }

                let c = scorer.counters();
                prop_assert_eq!(c.total_domains, rows.len() as u64);
                prop_assert_eq!(c.domains_checked + c.domains_skipped, c.total_domains);
                prop_assert_eq!(c.smtp_valid + c.smtp_invalid, c.domains_checked);
                prop_assert_eq!(c.spf_covered + c.spf_not_covered, c.smtp_valid);
                prop_assert_eq!(c.no_weak_crypto + c.has_weak_crypto, c.spf_covered);
                prop_assert_eq!(c.dmarc_valid + c.dmarc_invalid, c.no_weak_crypto);
                prop_assert_eq!(c.bod_compliant + c.bod_failed, c.dmarc_valid);
                // Failure lists line up with their counters.
                prop_assert_eq!(
                    scorer.failures(FailureBucket::InvalidDmarc).len() as u64,
                    c.dmarc_invalid
                );
                prop_assert_eq!(
                    scorer.failures(FailureBucket::InvalidRua).len() as u64,
                    c.bod_failed
                );
            }
        }
    }
}
