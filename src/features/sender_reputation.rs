use super::FeatureExtractor;
use crate::mail::EmailData;
use crate::overrides::OverrideList;
use crate::signal::{Severity, Signal, SignalCategory};

pub const BLACKLISTED_EMAIL_SCORE: i32 = 50;
pub const BLACKLISTED_DOMAIN_SCORE: i32 = 40;

/// Checks the sender against the user's blacklist. An exact address match beats a
/// domain match; at most one signal is produced.
pub struct SenderReputationAnalyzer {
    blacklist: OverrideList,
}

impl SenderReputationAnalyzer {
    pub fn new(blacklist: OverrideList) -> Self {
        Self { blacklist }
    }

    pub fn check(&self, sender_email: Option<&str>, sender_domain: &str) -> Option<Signal> {
        if let Some(email) = sender_email {
            if self.blacklist.contains_email(email) {
                return Some(Signal::new(
                    SignalCategory::Sender,
                    "Blacklisted Sender",
                    "Sender email is on your blacklist",
                    BLACKLISTED_EMAIL_SCORE,
                    Severity::High,
                ));
            }
        }

        if self.blacklist.contains_domain(sender_domain) {
            return Some(Signal::new(
                SignalCategory::Sender,
                "Blacklisted Domain",
                "Sender domain is on your blacklist",
                BLACKLISTED_DOMAIN_SCORE,
                Severity::High,
            ));
        }

        None
    }
}

impl FeatureExtractor for SenderReputationAnalyzer {
    fn extract(&self, email: &EmailData) -> Vec<Signal> {
        self.check(email.sender_email.as_deref(), &email.sender_domain)
            .into_iter()
            .collect()
    }

    fn name(&self) -> &str {
        "Sender Reputation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> SenderReputationAnalyzer {
        let list = OverrideList::default()
            .add_email("scammer@evil.example")
            .and_then(|l| l.add_domain("evil.example"))
            .and_then(|l| l.add_domain("spam.example"))
            .unwrap();
        SenderReputationAnalyzer::new(list)
    }

    #[test]
    fn test_email_match_takes_precedence() {
        let signal = analyzer()
            .check(Some("scammer@evil.example"), "evil.example")
            .unwrap();
        assert_eq!(signal.name(), "Blacklisted Sender");
        assert_eq!(signal.score(), 50);
        assert_eq!(signal.severity(), Severity::High);
    }

    #[test]
    fn test_domain_match() {
        let signal = analyzer()
            .check(Some("someone@spam.example"), "spam.example")
            .unwrap();
        assert_eq!(signal.name(), "Blacklisted Domain");
        assert_eq!(signal.score(), 40);
    }

    #[test]
    fn test_domain_match_is_exact() {
        assert!(analyzer()
            .check(Some("a@mail.spam.example"), "mail.spam.example")
            .is_none());
    }

    #[test]
    fn test_clean_sender() {
        let email = EmailData::new("friend@example.org", None, None, Default::default(), vec![]);
        assert!(analyzer().extract(&email).is_empty());
    }
}
