use serde::Serialize;
use std::fmt;

/// Display tier of a signal. Never used for arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    Good,
}

impl Severity {
    /// Ordering used when listing signals for a reader (high first, good last).
    pub fn display_rank(&self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
            Severity::Good => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Good => "good",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which check produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Sender,
    Authentication,
    Content,
    /// Scam/prize wording or scam keywords in link domains. Bypasses whitelist damping.
    Scam,
    Url,
    Attachment,
    UrlReputation,
    LlmJudgment,
}

/// Where the evidence came from. Routes a signal into the right aggregation branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOrigin {
    Heuristic,
    UrlReputation,
    LlmJudge,
}

impl SignalCategory {
    pub fn origin(&self) -> SignalOrigin {
        match self {
            SignalCategory::UrlReputation => SignalOrigin::UrlReputation,
            SignalCategory::LlmJudgment => SignalOrigin::LlmJudge,
            _ => SignalOrigin::Heuristic,
        }
    }
}

/// One unit of scored evidence. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal {
    name: String,
    description: String,
    score: i32,
    severity: Severity,
    category: SignalCategory,
}

impl Signal {
    pub fn new(
        category: SignalCategory,
        name: impl Into<String>,
        description: impl Into<String>,
        score: i32,
        severity: Severity,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            score,
            severity,
            category,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn category(&self) -> SignalCategory {
        self.category
    }

    pub fn origin(&self) -> SignalOrigin {
        self.category.origin()
    }

    /// A negative score handed back by the URL reputation service.
    pub fn is_reputation_reduction(&self) -> bool {
        self.origin() == SignalOrigin::UrlReputation && self.score < 0
    }
}
