//! Four-tier verdict derived from the final score.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Safe,
    Caution,
    Suspicious,
    Malicious,
}

pub const MALICIOUS_THRESHOLD: u8 = 60;
pub const SUSPICIOUS_THRESHOLD: u8 = 30;
pub const CAUTION_THRESHOLD: u8 = 10;

impl Verdict {
    /// Highest threshold is checked first; every score maps to exactly one tier.
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= MALICIOUS_THRESHOLD => Verdict::Malicious,
            s if s >= SUSPICIOUS_THRESHOLD => Verdict::Suspicious,
            s if s >= CAUTION_THRESHOLD => Verdict::Caution,
            _ => Verdict::Safe,
        }
    }

    pub fn level(&self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Caution => "CAUTION",
            Verdict::Suspicious => "SUSPICIOUS",
            Verdict::Malicious => "MALICIOUS",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Verdict::Safe => "#34A853",
            Verdict::Caution => "#1E88E5",
            Verdict::Suspicious => "#F9AB00",
            Verdict::Malicious => "#D93025",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Verdict::Safe => "✅",
            Verdict::Caution => "ℹ️",
            Verdict::Suspicious => "⚠️",
            Verdict::Malicious => "⛔",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Verdict::Safe => "No significant threats detected. Email appears safe.",
            Verdict::Caution => "Minor concerns detected. Likely safe but stay vigilant.",
            Verdict::Suspicious => {
                "This email has some concerning characteristics. Review carefully before taking any action."
            }
            Verdict::Malicious => {
                "This email shows strong indicators of being malicious. Exercise extreme caution."
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.level())
    }
}
