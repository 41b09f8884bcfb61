pub mod https;
pub mod trustymail;

pub use https::{HttpsResult, HttpsScorer, HttpsScores};
pub use trustymail::{FailureBucket, FailureRecord, FunnelCounters, TrustymailScorer};
