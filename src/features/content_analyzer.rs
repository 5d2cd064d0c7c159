use super::{count_matches, FeatureExtractor};
use crate::mail::EmailData;
use crate::signal::{Severity, Signal, SignalCategory};

const URGENCY_PATTERNS: &[&str] = &[
    "urgent",
    "immediate action",
    "act now",
    "limited time",
    "expire",
    "suspended",
    "verify your account",
    "confirm your identity",
    "unusual activity",
    "unauthorized access",
    "within 24 hours",
    "immediate",
    "right away",
    "don't wait",
    "hurry",
];

const FINANCIAL_PATTERNS: &[&str] = &[
    "password",
    "credit card",
    "social security",
    "bank account",
    "login credentials",
    "billing information",
    "payment details",
    "wire transfer",
    "bitcoin",
    "cryptocurrency",
    "ssn",
    "pin code",
];

const SCAM_PATTERNS: &[&str] = &[
    "free",
    "free gift card",
    "you won",
    "you've won",
    "winner",
    "claim your prize",
    "lottery",
    "inheritance",
    "free money",
    "get rich",
    "make money fast",
    "nigerian prince",
    "foreign prince",
    "million dollars",
    "casino",
    "betting",
    "gambling",
    "100% more",
    "100% free",
    "100% satisfied",
    "additional income",
    "be your own boss",
];

const SUSPICIOUS_SUBJECT_PATTERNS: &[&str] = &[
    "not a virus",
    "totally safe",
    "trust me",
    "this is real",
    "not spam",
    "not a scam",
    "legit",
    "100% real",
    "click here",
    "open immediately",
    "read this",
];

const DOWNLOAD_PATTERNS: &[&str] = &[
    "download now",
    "install now",
    "click to download",
    "download for free",
    "free download",
    "get it now",
];

const EXECUTABLE_MENTIONS: &[&str] = &[".exe", ".scr", ".bat", ".cmd", ".ps1", ".vbs", ".js"];

/// Keyword-family counters over the lower-cased subject and body.
pub struct ContentAnalyzer;

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, subject: Option<&str>, body: Option<&str>) -> Vec<Signal> {
        let mut signals = Vec::new();
        let subject_lower = subject.unwrap_or("").to_lowercase();
        let text = format!("{} {}", subject.unwrap_or(""), body.unwrap_or("")).to_lowercase();

        let urgency = count_matches(&text, URGENCY_PATTERNS);
        if urgency >= 3 {
            signals.push(Signal::new(
                SignalCategory::Content,
                "High Urgency Language",
                format!(
                    "{} urgent phrases detected (common in phishing)",
                    urgency
                ),
                20,
                Severity::Medium,
            ));
        } else if urgency >= 1 {
            signals.push(Signal::new(
                SignalCategory::Content,
                "Urgency Language",
                format!("{} urgency phrase(s) detected", urgency),
                10,
                Severity::Low,
            ));
        }

        let financial = count_matches(&text, FINANCIAL_PATTERNS);
        if financial >= 2 {
            signals.push(Signal::new(
                SignalCategory::Content,
                "Sensitive Data Request",
                "Email requests sensitive financial/credential information",
                25,
                Severity::High,
            ));
        } else if financial == 1 {
            signals.push(Signal::new(
                SignalCategory::Content,
                "Financial Reference",
                "Email mentions sensitive financial topics",
                10,
                Severity::Low,
            ));
        }

        let scam = count_matches(&text, SCAM_PATTERNS);
        let scam_score = match scam {
            0 => None,
            1 => Some(20),
            _ => Some(30),
        };
        if let Some(score) = scam_score {
            signals.push(Signal::new(
                SignalCategory::Scam,
                "Scam/Prize Pattern",
                format!(
                    "{} common scam phrase(s) detected (fake prizes, free currency, etc.)",
                    scam
                ),
                score,
                Severity::Medium,
            ));
        }

        if count_matches(&subject_lower, SUSPICIOUS_SUBJECT_PATTERNS) > 0 {
            signals.push(Signal::new(
                SignalCategory::Content,
                "Suspicious Subject Line",
                "Subject contains phrases often used ironically in scams",
                25,
                Severity::High,
            ));
        }

        if count_matches(&text, DOWNLOAD_PATTERNS) > 0 {
            signals.push(Signal::new(
                SignalCategory::Content,
                "Download Prompt",
                "Email prompts you to download something",
                15,
                Severity::Medium,
            ));
        }

        if count_matches(&text, EXECUTABLE_MENTIONS) > 0 {
            signals.push(Signal::new(
                SignalCategory::Content,
                "Executable Reference",
                "Email mentions executable file types",
                15,
                Severity::Medium,
            ));
        }

        signals
    }
}

impl FeatureExtractor for ContentAnalyzer {
    fn extract(&self, email: &EmailData) -> Vec<Signal> {
        self.analyze(email.subject.as_deref(), email.body.as_deref())
    }

    fn name(&self) -> &str {
        "Content Analysis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(signals: &'a [Signal], name: &str) -> Option<&'a Signal> {
        signals.iter().find(|s| s.name() == name)
    }

    #[test]
    fn test_three_urgency_phrases_is_high_urgency() {
        let signals = ContentAnalyzer::new().analyze(
            None,
            Some("This is urgent. Act now before your access will expire."),
        );

        let urgency = find(&signals, "High Urgency Language").unwrap();
        assert_eq!(urgency.score(), 20);
        assert!(find(&signals, "Urgency Language").is_none());
    }

    #[test]
    fn test_single_urgency_phrase_is_low() {
        let signals = ContentAnalyzer::new().analyze(Some("Hurry"), None);
        let urgency = find(&signals, "Urgency Language").unwrap();
        assert_eq!(urgency.score(), 10);
        assert_eq!(urgency.severity(), Severity::Low);
    }

    #[test]
    fn test_financial_tiers() {
        let analyzer = ContentAnalyzer::new();

        let one = analyzer.analyze(None, Some("Reset your password"));
        assert_eq!(find(&one, "Financial Reference").unwrap().score(), 10);

        let two = analyzer.analyze(None, Some("Send your password and credit card"));
        let request = find(&two, "Sensitive Data Request").unwrap();
        assert_eq!(request.score(), 25);
        assert_eq!(request.severity(), Severity::High);
    }

    #[test]
    fn test_scam_count_tiers() {
        let analyzer = ContentAnalyzer::new();

        let single = analyzer.analyze(None, Some("Visit our casino"));
        let signal = find(&single, "Scam/Prize Pattern").unwrap();
        assert_eq!(signal.score(), 20);
        assert_eq!(signal.category(), SignalCategory::Scam);

        let many = analyzer.analyze(None, Some("You won the lottery, claim your prize"));
        assert_eq!(find(&many, "Scam/Prize Pattern").unwrap().score(), 30);

        let none = analyzer.analyze(None, Some("Meeting notes attached"));
        assert!(find(&none, "Scam/Prize Pattern").is_none());
    }

    #[test]
    fn test_suspicious_subject_only_reads_subject() {
        let analyzer = ContentAnalyzer::new();

        let in_subject = analyzer.analyze(Some("Totally safe, not a virus"), None);
        assert_eq!(find(&in_subject, "Suspicious Subject Line").unwrap().score(), 25);

        let in_body = analyzer.analyze(Some("Hello"), Some("trust me"));
        assert!(find(&in_body, "Suspicious Subject Line").is_none());
    }

    #[test]
    fn test_download_and_executable_mentions() {
        let signals = ContentAnalyzer::new().analyze(None, Some("Download now: setup.EXE"));
        assert!(find(&signals, "Download Prompt").is_some());
        assert!(find(&signals, "Executable Reference").is_some());
    }

    #[test]
    fn test_clean_text() {
        let signals =
            ContentAnalyzer::new().analyze(Some("Lunch on Thursday"), Some("See you at noon."));
        assert!(signals.is_empty());
    }
}
