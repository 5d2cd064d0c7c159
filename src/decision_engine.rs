//! Decision Engine
//!
//! Folds the flat signal list into one bounded score and derives the verdict.
//!
//! The clamp order matters: the positive total is capped at 100 *before* the
//! reputation-service reduction is applied, so a clean reputation can still pull
//! a saturated score down (100 - 25 = 75). Only then is the floor clamped to 0.

use serde::{Deserialize, Serialize};

use crate::signal::{Signal, SignalCategory};
use crate::verdict::Verdict;

pub const MAX_SCORE: i32 = 100;
pub const MIN_SCORE: i32 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Multiplier for heuristic scores when the sender is whitelisted.
    pub whitelist_damping: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            whitelist_damping: 0.5,
        }
    }
}

/// Intermediate values of one aggregation, kept for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub raw_total: i32,
    pub reduction: i32,
    pub capped: i32,
    pub final_score: u8,
    pub damped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalDecision {
    pub score: u8,
    pub verdict: Verdict,
    pub breakdown: ScoreBreakdown,
}

pub struct DecisionEngine {
    config: DecisionConfig,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DecisionConfig::default())
    }
}

impl DecisionEngine {
    /// A damping factor outside [0, 1] is clamped; a non-number falls back to the default.
    pub fn new(mut config: DecisionConfig) -> Self {
        let factor = config.whitelist_damping;
        if factor.is_nan() || !(0.0..=1.0).contains(&factor) {
            let sanitized = if factor.is_nan() {
                DecisionConfig::default().whitelist_damping
            } else {
                factor.clamp(0.0, 1.0)
            };
            log::warn!(
                "whitelist_damping {} out of range, using {}",
                factor,
                sanitized
            );
            config.whitelist_damping = sanitized;
        }
        Self { config }
    }

    /// Clamp the positive total, apply the reduction, clamp the floor.
    pub fn combine(raw_total: i32, reduction: i32) -> u8 {
        let capped = raw_total.min(MAX_SCORE);
        let adjusted = capped.saturating_add(reduction);
        adjusted.max(MIN_SCORE) as u8
    }

    /// Whitelisted senders get heuristic signals damped, unless scam content showed up.
    fn should_damp(signals: &[Signal], whitelisted: bool) -> bool {
        whitelisted
            && !signals
                .iter()
                .any(|s| s.category() == SignalCategory::Scam)
    }

    /// What a signal adds to the positive total. The signal itself is left untouched.
    fn contribution(&self, signal: &Signal, damp: bool) -> i32 {
        let score = signal.score();
        if damp && score > 0 && signal.category() != SignalCategory::Sender {
            ((score as f64 * self.config.whitelist_damping).round() as i32).clamp(0, score)
        } else {
            score
        }
    }

    pub fn breakdown(&self, signals: &[Signal], whitelisted: bool) -> ScoreBreakdown {
        let damped = Self::should_damp(signals, whitelisted);

        let raw_total: i32 = signals
            .iter()
            .filter(|s| !s.is_reputation_reduction())
            .map(|s| self.contribution(s, damped))
            .fold(0, i32::saturating_add);

        let reduction: i32 = signals
            .iter()
            .filter(|s| s.is_reputation_reduction())
            .map(|s| s.score())
            .fold(0, i32::saturating_add);

        ScoreBreakdown {
            raw_total,
            reduction,
            capped: raw_total.min(MAX_SCORE),
            final_score: Self::combine(raw_total, reduction),
            damped,
        }
    }

    pub fn make_decision(&self, signals: &[Signal], whitelisted: bool) -> FinalDecision {
        let breakdown = self.breakdown(signals, whitelisted);
        let verdict = Verdict::from_score(breakdown.final_score);

        log::debug!(
            "Score: raw {} capped {} reduction {} final {} ({}){}",
            breakdown.raw_total,
            breakdown.capped,
            breakdown.reduction,
            breakdown.final_score,
            verdict,
            if breakdown.damped {
                " [whitelist damping]"
            } else {
                ""
            }
        );

        FinalDecision {
            score: breakdown.final_score,
            verdict,
            breakdown,
        }
    }
}
