use super::FeatureExtractor;
use crate::mail::EmailData;
use crate::signal::{Severity, Signal, SignalCategory};
use regex::Regex;

/// Well-known services. A URL containing any of these is skipped entirely.
const TRUSTED_DOMAINS: &[&str] = &[
    "gett.com",
    "wolt.com",
    "uber.com",
    "bolt.eu",
    "lyft.com",
    "google.com",
    "gmail.com",
    "youtube.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "amazon.com",
    "amazon.co.il",
    "ebay.com",
    "aliexpress.com",
    "apple.com",
    "microsoft.com",
    "github.com",
    "gitlab.com",
    "paypal.com",
    "stripe.com",
    "netflix.com",
    "spotify.com",
    "disney.com",
    "bankhapoalim.co.il",
    "leumi.co.il",
    "mizrahi-tefahot.co.il",
    "discount.co.il",
    "isracard.co.il",
    "cal-online.co.il",
    "max.co.il",
    "bezeq.co.il",
    "partner.co.il",
    "cellcom.co.il",
    "hot.net.il",
    "super-pharm.co.il",
    "shufersal.co.il",
    "gov.il",
    "health.gov.il",
    "tax.gov.il",
    "mailchimp.com",
    "sendgrid.net",
    "constantcontact.com",
    "zoom.us",
    "slack.com",
    "notion.so",
    "dropbox.com",
    "university.edu",
    "tau.ac.il",
    "huji.ac.il",
    "bgu.ac.il",
    "technion.ac.il",
];

const SHORTENERS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "goo.gl",
    "t.co",
    "ow.ly",
    "is.gd",
    "buff.ly",
    "adf.ly",
    "cutt.ly",
];

const SCAM_DOMAIN_KEYWORDS: &[&str] = &[
    "free-",
    "-free",
    "giftcard",
    "prize",
    "winner",
    "lottery",
    "login-",
    "-login",
    "secure-",
    "-secure",
    "verify-",
    "-verify",
    "account-",
    "-account",
    "update-",
    "-update",
    "paypal-",
    "amazon-",
    "apple-",
    "microsoft-",
    "google-",
    "facebook-",
];

const SENSITIVE_WORDS: &[&str] = &[
    "login", "signin", "verify", "secure", "account", "update", "confirm", "banking", "paypal",
    "amazon",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkCounts {
    pub http: usize,
    pub ip_literal: usize,
    pub shortened: usize,
    pub scam_keywords: usize,
    pub brand_mismatch: usize,
}

pub struct LinkAnalyzer {
    ip_url_regex: Regex,
    brand_domain_regexes: Vec<(&'static str, Regex)>,
}

impl Default for LinkAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkAnalyzer {
    pub fn new() -> Self {
        let brand_domain_regexes = SENSITIVE_WORDS
            .iter()
            .map(|word| {
                let pattern = format!(r"https?://[^/]*{}\.(com|org|net)", regex::escape(word));
                (*word, Regex::new(&pattern).unwrap())
            })
            .collect();

        Self {
            ip_url_regex: Regex::new(r"https?://\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").unwrap(),
            brand_domain_regexes,
        }
    }

    /// Substring match against the whole URL, case-insensitive.
    pub fn is_trusted(url: &str) -> bool {
        let url_lower = url.to_lowercase();
        TRUSTED_DOMAINS.iter().any(|d| url_lower.contains(d))
    }

    /// URL mentions a sensitive word but its host is not literally `<word>.com|org|net`.
    fn has_brand_mismatch(&self, url_lower: &str) -> bool {
        self.brand_domain_regexes
            .iter()
            .any(|(word, brand_domain)| url_lower.contains(word) && !brand_domain.is_match(url_lower))
    }

    pub fn count(&self, urls: &[String]) -> LinkCounts {
        let mut counts = LinkCounts::default();

        for url in urls {
            if Self::is_trusted(url) {
                log::debug!("Skipping trusted URL: {}", url);
                continue;
            }

            let url_lower = url.to_lowercase();

            if url_lower.starts_with("http://") {
                counts.http += 1;
            }
            if self.ip_url_regex.is_match(&url_lower) {
                counts.ip_literal += 1;
            }
            counts.shortened += SHORTENERS
                .iter()
                .filter(|s| url_lower.contains(*s))
                .count();
            counts.scam_keywords += SCAM_DOMAIN_KEYWORDS
                .iter()
                .filter(|k| url_lower.contains(*k))
                .count();
            if self.has_brand_mismatch(&url_lower) {
                counts.brand_mismatch += 1;
            }
        }

        counts
    }

    pub fn analyze(&self, urls: &[String]) -> Vec<Signal> {
        let mut signals = Vec::new();
        if urls.is_empty() {
            return signals;
        }

        let counts = self.count(urls);

        if counts.ip_literal > 0 {
            signals.push(Signal::new(
                SignalCategory::Url,
                "IP-based URLs",
                format!(
                    "{} URL(s) use IP addresses instead of domains",
                    counts.ip_literal
                ),
                25,
                Severity::High,
            ));
        }

        if counts.http > 0 {
            signals.push(Signal::new(
                SignalCategory::Url,
                "Insecure HTTP Links",
                format!("{} link(s) use HTTP instead of HTTPS", counts.http),
                15,
                Severity::Medium,
            ));
        }

        if counts.shortened > 0 {
            signals.push(Signal::new(
                SignalCategory::Url,
                "Shortened URLs",
                format!(
                    "{} shortened URL(s) detected (hiding true destination)",
                    counts.shortened
                ),
                15,
                Severity::Medium,
            ));
        }

        if counts.scam_keywords > 0 {
            signals.push(Signal::new(
                SignalCategory::Scam,
                "Suspicious Domain Keywords",
                format!(
                    "{} keyword match(es) commonly used in scam domains",
                    counts.scam_keywords
                ),
                25,
                Severity::High,
            ));
        }

        if counts.brand_mismatch > 0 {
            signals.push(Signal::new(
                SignalCategory::Url,
                "Suspicious URLs",
                format!(
                    "{} URL(s) with suspicious patterns",
                    counts.brand_mismatch
                ),
                20,
                Severity::Medium,
            ));
        }

        signals
    }
}

impl FeatureExtractor for LinkAnalyzer {
    fn extract(&self, email: &EmailData) -> Vec<Signal> {
        self.analyze(&email.urls)
    }

    fn name(&self) -> &str {
        "Link Analysis"
    }
}
