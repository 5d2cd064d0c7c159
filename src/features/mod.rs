pub mod attachment_analyzer;
pub mod authentication_analysis;
pub mod content_analyzer;
pub mod link_analyzer;
pub mod sender_reputation;

use crate::mail::EmailData;
use crate::overrides::OverrideList;
use crate::signal::Signal;

/// Count how many patterns occur as substrings of `text`. Each pattern counts once.
pub fn count_matches(text: &str, patterns: &[&str]) -> usize {
    patterns.iter().filter(|p| text.contains(*p)).count()
}

/// One independent check over the email. Implementations hold no mutable state,
/// so running the same input twice yields the same signals.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, email: &EmailData) -> Vec<Signal>;
    fn name(&self) -> &str;
}

pub struct DetectorSet {
    extractors: Vec<Box<dyn FeatureExtractor>>,
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self::new(OverrideList::default())
    }
}

impl DetectorSet {
    pub fn new(blacklist: OverrideList) -> Self {
        Self {
            extractors: vec![
                Box::new(sender_reputation::SenderReputationAnalyzer::new(blacklist)),
                Box::new(authentication_analysis::AuthenticationAnalyzer::new()),
                Box::new(content_analyzer::ContentAnalyzer::new()),
                Box::new(link_analyzer::LinkAnalyzer::new()),
                Box::new(attachment_analyzer::AttachmentAnalyzer::new()),
            ],
        }
    }

    /// Run every detector and concatenate their signals in detector order.
    pub fn analyze(&self, email: &EmailData) -> Vec<Signal> {
        let mut signals = Vec::new();

        for extractor in &self.extractors {
            let found = extractor.extract(email);
            log::debug!("{}: {} signal(s)", extractor.name(), found.len());
            signals.extend(found);
        }

        signals
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::Attachment;
    use std::collections::HashMap;

    fn phishing_email() -> EmailData {
        let mut headers = HashMap::new();
        headers.insert(
            "authentication-results".to_string(),
            "mx; spf=fail; dkim=fail; dmarc=fail".to_string(),
        );
        EmailData::new(
            "Security <alert@paypa1-secure.example>",
            Some("URGENT: verify your account".to_string()),
            Some(
                "Act now! Your password expires. Visit http://203.0.113.9/paypal-login \
                 to confirm your credit card."
                    .to_string(),
            ),
            headers,
            vec![Attachment {
                name: "statement.pdf.exe".to_string(),
                content_type: "application/octet-stream".to_string(),
                size: 1024,
            }],
        )
    }

    #[test]
    fn test_count_matches_counts_each_pattern_once() {
        assert_eq!(count_matches("urgent urgent urgent", &["urgent", "act now"]), 1);
        assert_eq!(count_matches("urgent, act now", &["urgent", "act now"]), 2);
    }

    #[test]
    fn test_detector_set_is_idempotent() {
        let detectors = DetectorSet::default();
        let email = phishing_email();

        let first = detectors.analyze(&email);
        let second = detectors.analyze(&email);

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_detectors_contribute() {
        let mut blacklist = OverrideList::default();
        blacklist = blacklist.add_domain("paypa1-secure.example").unwrap();
        let detectors = DetectorSet::new(blacklist);

        let signals = detectors.analyze(&phishing_email());
        let names: Vec<&str> = signals.iter().map(|s| s.name()).collect();

        assert_eq!(names[0], "Blacklisted Domain");
        assert!(names.contains(&"SPF Failed"));
        assert!(names.contains(&"Urgency Language") || names.contains(&"High Urgency Language"));
        assert!(names.contains(&"IP-based URLs"));
        assert!(names.contains(&"Dangerous Attachments"));
    }

    #[test]
    fn test_detector_names() {
        let detectors = DetectorSet::default();
        assert_eq!(detectors.detector_names().len(), 5);
    }
}
