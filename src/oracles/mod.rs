//! Optional external oracles: a URL reputation service and an LLM judge.
//!
//! Both are failure-isolated. Whatever goes wrong inside an oracle call ends up as
//! an [`OracleOutcome`] that is not `Completed`, and the local detectors' result
//! stands on its own.

pub mod llm_judge;
pub mod virustotal;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signal::{Severity, Signal, SignalCategory};

/// LLM scores count for 40% of their raw value.
pub const LLM_WEIGHT: f64 = 0.4;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("API key not configured")]
    MissingCredential,

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("all {attempts} model(s) unavailable")]
    Exhausted { attempts: usize },
}

/// Typed result of consulting an oracle.
#[derive(Debug)]
pub enum OracleOutcome<T> {
    /// Nothing to ask (e.g. the email has no URLs).
    Skipped,
    /// Not configured or switched off.
    Disabled,
    /// Configured, but the call failed.
    Unavailable(String),
    Completed(T),
}

impl<T> OracleOutcome<T> {
    pub fn from_result(result: Result<T, OracleError>) -> Self {
        match result {
            Ok(value) => OracleOutcome::Completed(value),
            Err(OracleError::MissingCredential) => OracleOutcome::Disabled,
            Err(e) => OracleOutcome::Unavailable(e.to_string()),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, OracleOutcome::Completed(_))
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            OracleOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Complete,
    Pending,
    Failed,
}

/// Vendor vote counts for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlVerdict {
    pub url: String,
    pub malicious: u32,
    pub suspicious: u32,
    pub harmless: u32,
    pub undetected: u32,
    pub status: ScanStatus,
}

impl UrlVerdict {
    pub fn pending(url: &str) -> Self {
        Self::empty(url, ScanStatus::Pending)
    }

    pub fn failed(url: &str) -> Self {
        Self::empty(url, ScanStatus::Failed)
    }

    fn empty(url: &str, status: ScanStatus) -> Self {
        Self {
            url: url.to_string(),
            malicious: 0,
            suspicious: 0,
            harmless: 0,
            undetected: 0,
            status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlReputationReport {
    pub per_url: Vec<UrlVerdict>,
}

/// Prompt input for the LLM judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailSummary {
    pub from: String,
    pub subject: String,
    pub body_snippet: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmJudgment {
    /// Raw model score in [0, 100].
    pub score: u8,
    pub flags: Vec<String>,
    pub summary: String,
    pub model: String,
}

#[async_trait]
pub trait UrlReputationOracle: Send + Sync {
    async fn check_urls(&self, urls: &[String]) -> Result<UrlReputationReport, OracleError>;
}

#[async_trait]
pub trait LlmOracle: Send + Sync {
    async fn judge(&self, summary: &EmailSummary) -> Result<LlmJudgment, OracleError>;
}

/// Collapse per-URL votes into at most one signal. Only completed scans count.
pub fn url_reputation_signal(report: &UrlReputationReport) -> Option<Signal> {
    let completed: Vec<&UrlVerdict> = report
        .per_url
        .iter()
        .filter(|v| v.status == ScanStatus::Complete)
        .collect();

    let total_malicious: u32 = completed.iter().map(|v| v.malicious).sum();
    let total_suspicious: u32 = completed.iter().map(|v| v.suspicious).sum();
    let category = SignalCategory::UrlReputation;

    if total_malicious > 5 {
        Some(Signal::new(
            category,
            "VirusTotal: Malicious URLs",
            format!(
                "{} security vendors flagged URL(s) as malicious",
                total_malicious
            ),
            40,
            Severity::High,
        ))
    } else if total_malicious > 0 {
        Some(Signal::new(
            category,
            "VirusTotal: Suspicious URLs",
            format!(
                "{} security vendor(s) flagged URL(s) as potentially malicious",
                total_malicious
            ),
            25,
            Severity::Medium,
        ))
    } else if total_suspicious > 0 {
        Some(Signal::new(
            category,
            "VirusTotal: Caution",
            format!(
                "{} security vendor(s) flagged URL(s) as suspicious",
                total_suspicious
            ),
            10,
            Severity::Low,
        ))
    } else if !completed.is_empty() {
        Some(Signal::new(
            category,
            "VirusTotal: Clean",
            "URL(s) verified clean by security vendors",
            -25,
            Severity::Good,
        ))
    } else {
        None
    }
}

/// Down-weight the raw score; severity comes from the raw score. A zero raw score
/// produces no signal.
pub fn llm_signal(judgment: &LlmJudgment) -> Option<Signal> {
    if judgment.score == 0 {
        return None;
    }

    let raw = judgment.score;
    let severity = match raw {
        r if r >= 60 => Severity::High,
        r if r >= 30 => Severity::Medium,
        _ => Severity::Low,
    };
    let description = if judgment.summary.is_empty() {
        format!("AI detected suspicious patterns (score: {})", raw)
    } else {
        judgment.summary.clone()
    };

    Some(Signal::new(
        SignalCategory::LlmJudgment,
        "AI Analysis",
        description,
        (raw as f64 * LLM_WEIGHT).round() as i32,
        severity,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(malicious: u32, suspicious: u32, status: ScanStatus) -> UrlVerdict {
        UrlVerdict {
            url: "https://example.net".to_string(),
            malicious,
            suspicious,
            harmless: 60,
            undetected: 10,
            status,
        }
    }

    fn report(per_url: Vec<UrlVerdict>) -> UrlReputationReport {
        UrlReputationReport { per_url }
    }

    fn judgment(score: u8, summary: &str) -> LlmJudgment {
        LlmJudgment {
            score,
            flags: vec![],
            summary: summary.to_string(),
            model: "test-model".to_string(),
        }
    }

    #[test]
    fn test_reputation_priority() {
        let heavy = url_reputation_signal(&report(vec![
            verdict(4, 0, ScanStatus::Complete),
            verdict(3, 2, ScanStatus::Complete),
        ]))
        .unwrap();
        assert_eq!(heavy.score(), 40);
        assert_eq!(heavy.severity(), Severity::High);

        let light = url_reputation_signal(&report(vec![verdict(1, 9, ScanStatus::Complete)])).unwrap();
        assert_eq!(light.score(), 25);

        let suspicious =
            url_reputation_signal(&report(vec![verdict(0, 2, ScanStatus::Complete)])).unwrap();
        assert_eq!(suspicious.score(), 10);
        assert_eq!(suspicious.severity(), Severity::Low);
    }

    #[test]
    fn test_clean_reputation_reduces() {
        let clean = url_reputation_signal(&report(vec![
            verdict(0, 0, ScanStatus::Complete),
            UrlVerdict::pending("https://new.example"),
        ]))
        .unwrap();
        assert_eq!(clean.score(), -25);
        assert_eq!(clean.severity(), Severity::Good);
        assert!(clean.is_reputation_reduction());
    }

    #[test]
    fn test_no_completed_results_yields_nothing() {
        assert!(url_reputation_signal(&report(vec![])).is_none());
        assert!(url_reputation_signal(&report(vec![
            UrlVerdict::pending("https://a.example"),
            UrlVerdict::failed("https://b.example"),
        ]))
        .is_none());
    }

    #[test]
    fn test_llm_weighting_uses_raw_severity() {
        let signal = llm_signal(&judgment(80, "Requests credentials")).unwrap();
        assert_eq!(signal.score(), 32);
        assert_eq!(signal.severity(), Severity::High);
        assert_eq!(signal.description(), "Requests credentials");

        let medium = llm_signal(&judgment(30, "")).unwrap();
        assert_eq!(medium.score(), 12);
        assert_eq!(medium.severity(), Severity::Medium);
        assert!(medium.description().contains("score: 30"));

        let low = llm_signal(&judgment(5, "")).unwrap();
        assert_eq!(low.score(), 2);
        assert_eq!(low.severity(), Severity::Low);
    }

    #[test]
    fn test_llm_zero_score_yields_no_signal() {
        assert!(llm_signal(&judgment(0, "Looks normal")).is_none());
    }

    #[test]
    fn test_outcome_from_result() {
        let disabled: OracleOutcome<u8> = OracleOutcome::from_result(Err(OracleError::MissingCredential));
        assert!(matches!(disabled, OracleOutcome::Disabled));

        let failed: OracleOutcome<u8> =
            OracleOutcome::from_result(Err(OracleError::Exhausted { attempts: 5 }));
        assert!(matches!(failed, OracleOutcome::Unavailable(_)));

        let done = OracleOutcome::from_result(Ok(7u8));
        assert!(done.is_completed());
        assert_eq!(done.completed(), Some(&7));
    }
}
