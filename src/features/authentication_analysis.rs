use super::FeatureExtractor;
use crate::mail::EmailData;
use crate::signal::{Severity, Signal, SignalCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Fail,
    SoftFail,
    Pass,
    None,
}

/// One protocol probed in the Authentication-Results header.
struct AuthProtocol {
    label: &'static str,
    token: &'static str,
    supports_softfail: bool,
    fail_score: i32,
    fail_description: &'static str,
    softfail_description: &'static str,
    pass_description: &'static str,
}

const PROTOCOLS: [AuthProtocol; 3] = [
    AuthProtocol {
        label: "SPF",
        token: "spf",
        supports_softfail: true,
        fail_score: 25,
        fail_description: "Sender's server is not authorized to send for this domain",
        softfail_description: "Sender's server authorization is questionable",
        pass_description: "Sender's server is authorized",
    },
    AuthProtocol {
        label: "DKIM",
        token: "dkim",
        supports_softfail: false,
        fail_score: 25,
        fail_description: "Email signature verification failed",
        softfail_description: "",
        pass_description: "Email signature verified",
    },
    AuthProtocol {
        label: "DMARC",
        token: "dmarc",
        supports_softfail: false,
        fail_score: 20,
        fail_description: "Domain authentication policy check failed",
        softfail_description: "",
        pass_description: "Domain authentication policy verified",
    },
];

const SOFTFAIL_SCORE: i32 = 15;
const RECEIVED_SPF_FAIL_SCORE: i32 = 20;
const SPAM_FLAG_SCORE: i32 = 15;

/// Reads the Authentication-Results, Received-SPF and X-Spam-Status headers.
/// Every protocol and header is judged on its own; none suppresses another.
pub struct AuthenticationAnalyzer;

impl Default for AuthenticationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticationAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Case-sensitive probe for `<token>=fail|softfail|pass`. Fail wins over softfail,
    /// softfail over pass.
    pub fn probe(auth_results: &str, token: &str, supports_softfail: bool) -> AuthResult {
        if auth_results.contains(&format!("{}=fail", token)) {
            AuthResult::Fail
        } else if supports_softfail && auth_results.contains(&format!("{}=softfail", token)) {
            AuthResult::SoftFail
        } else if auth_results.contains(&format!("{}=pass", token)) {
            AuthResult::Pass
        } else {
            AuthResult::None
        }
    }

    fn protocol_signal(protocol: &AuthProtocol, auth_results: &str) -> Option<Signal> {
        let category = SignalCategory::Authentication;
        match Self::probe(auth_results, protocol.token, protocol.supports_softfail) {
            AuthResult::Fail => Some(Signal::new(
                category,
                format!("{} Failed", protocol.label),
                protocol.fail_description,
                protocol.fail_score,
                Severity::High,
            )),
            AuthResult::SoftFail => Some(Signal::new(
                category,
                format!("{} Soft Fail", protocol.label),
                protocol.softfail_description,
                SOFTFAIL_SCORE,
                Severity::Medium,
            )),
            AuthResult::Pass => Some(Signal::new(
                category,
                format!("{} Passed", protocol.label),
                protocol.pass_description,
                0,
                Severity::Good,
            )),
            AuthResult::None => None,
        }
    }
}

impl FeatureExtractor for AuthenticationAnalyzer {
    fn extract(&self, email: &EmailData) -> Vec<Signal> {
        let auth_results = email.header("authentication-results");

        let mut signals: Vec<Signal> = PROTOCOLS
            .iter()
            .filter_map(|protocol| Self::protocol_signal(protocol, auth_results))
            .collect();

        if email
            .header("received-spf")
            .to_lowercase()
            .contains("fail")
        {
            signals.push(Signal::new(
                SignalCategory::Authentication,
                "Received-SPF Failed",
                "SPF validation failed at receiving server",
                RECEIVED_SPF_FAIL_SCORE,
                Severity::High,
            ));
        }

        if email.header("x-spam-status").to_lowercase().contains("yes") {
            signals.push(Signal::new(
                SignalCategory::Authentication,
                "Marked as Spam",
                "Email was flagged by spam filters",
                SPAM_FLAG_SCORE,
                Severity::Medium,
            ));
        }

        signals
    }

    fn name(&self) -> &str {
        "Authentication Analysis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn email_with_headers(pairs: &[(&str, &str)]) -> EmailData {
        let headers: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EmailData::new("a@example.com", None, None, headers, vec![])
    }

    #[test]
    fn test_all_pass_emits_zero_score_good_signals() {
        let email = email_with_headers(&[(
            "Authentication-Results",
            "mx.google.com; spf=pass; dkim=pass; dmarc=pass",
        )]);
        let signals = AuthenticationAnalyzer::new().extract(&email);

        assert_eq!(signals.len(), 3);
        assert!(signals
            .iter()
            .all(|s| s.score() == 0 && s.severity() == Severity::Good));
    }

    #[test]
    fn test_failures_score_independently() {
        let email = email_with_headers(&[
            ("Authentication-Results", "spf=softfail; dkim=fail; dmarc=fail"),
            ("Received-SPF", "FAIL (domain does not designate)"),
            ("X-Spam-Status", "YES, score=12.1"),
        ]);
        let signals = AuthenticationAnalyzer::new().extract(&email);
        let scores: Vec<(&str, i32)> = signals.iter().map(|s| (s.name(), s.score())).collect();

        assert_eq!(
            scores,
            vec![
                ("SPF Soft Fail", 15),
                ("DKIM Failed", 25),
                ("DMARC Failed", 20),
                ("Received-SPF Failed", 20),
                ("Marked as Spam", 15),
            ]
        );
    }

    #[test]
    fn test_probe_is_case_sensitive() {
        assert_eq!(
            AuthenticationAnalyzer::probe("SPF=FAIL", "spf", true),
            AuthResult::None
        );
        assert_eq!(
            AuthenticationAnalyzer::probe("spf=fail spf=pass", "spf", true),
            AuthResult::Fail
        );
    }

    #[test]
    fn test_missing_headers_yield_nothing() {
        let email = email_with_headers(&[]);
        assert!(AuthenticationAnalyzer::new().extract(&email).is_empty());
    }

    #[test]
    fn test_spam_status_no_is_ignored() {
        let email = email_with_headers(&[("X-Spam-Status", "No, score=-0.1")]);
        assert!(AuthenticationAnalyzer::new().extract(&email).is_empty());
    }
}
