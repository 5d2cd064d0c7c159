//! Per-email orchestration: local detectors, the optional oracles, then aggregation.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::decision_engine::{DecisionEngine, ScoreBreakdown};
use crate::features::DetectorSet;
use crate::mail::EmailData;
use crate::oracles::llm_judge::LlmJudgeClient;
use crate::oracles::virustotal::VirusTotalClient;
use crate::oracles::{
    llm_signal, url_reputation_signal, EmailSummary, LlmJudgment, LlmOracle, OracleOutcome,
    UrlReputationOracle, UrlReputationReport,
};
use crate::overrides::{OverrideList, Whitelist};
use crate::signal::Signal;
use crate::verdict::Verdict;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub score: u8,
    pub verdict: Verdict,
    /// In creation order: detectors first, then URL reputation, then the LLM.
    pub signals: Vec<Signal>,
    pub url_reputation_enabled: bool,
    pub llm_enabled: bool,
    pub whitelisted: bool,
    pub breakdown: ScoreBreakdown,
}

pub struct Analyzer {
    detectors: DetectorSet,
    engine: DecisionEngine,
    whitelist: Whitelist,
    url_oracle: Option<Box<dyn UrlReputationOracle>>,
    llm_oracle: Option<Box<dyn LlmOracle>>,
    body_snippet_chars: usize,
    url_sample: usize,
}

impl Analyzer {
    /// Local-only analyzer. Oracles are attached with the `with_*` builders.
    pub fn new(detectors: DetectorSet, engine: DecisionEngine, whitelist: Whitelist) -> Self {
        Self {
            detectors,
            engine,
            whitelist,
            url_oracle: None,
            llm_oracle: None,
            body_snippet_chars: 800,
            url_sample: 3,
        }
    }

    pub fn with_url_oracle(mut self, oracle: Box<dyn UrlReputationOracle>) -> Self {
        self.url_oracle = Some(oracle);
        self
    }

    pub fn with_llm_oracle(mut self, oracle: Box<dyn LlmOracle>) -> Self {
        self.llm_oracle = Some(oracle);
        self
    }

    pub fn from_config(config: &Config, blacklist: OverrideList, whitelist: Whitelist) -> Result<Self> {
        let mut analyzer = Self::new(
            DetectorSet::new(blacklist),
            DecisionEngine::new(config.scoring.clone()),
            whitelist,
        );
        analyzer.body_snippet_chars = config.llm.body_snippet_chars;
        analyzer.url_sample = config.llm.url_sample;

        if config.virustotal.enabled {
            analyzer =
                analyzer.with_url_oracle(Box::new(VirusTotalClient::new(config.virustotal.clone())?));
        } else {
            log::info!("URL reputation lookups disabled");
        }

        if config.llm.enabled {
            analyzer = analyzer.with_llm_oracle(Box::new(LlmJudgeClient::new(config.llm.clone())?));
        } else {
            log::info!("LLM judge disabled");
        }

        Ok(analyzer)
    }

    pub fn is_whitelisted(&self, email: &EmailData) -> bool {
        self.whitelist
            .is_whitelisted(email.sender_email.as_deref(), &email.sender_domain)
    }

    /// Detector signals only, no network.
    pub fn local_signals(&self, email: &EmailData) -> Vec<Signal> {
        self.detectors.analyze(email)
    }

    async fn consult_url_oracle(&self, email: &EmailData) -> OracleOutcome<UrlReputationReport> {
        let oracle = match &self.url_oracle {
            Some(oracle) => oracle,
            None => return OracleOutcome::Disabled,
        };
        if email.urls.is_empty() {
            return OracleOutcome::Skipped;
        }
        OracleOutcome::from_result(oracle.check_urls(&email.urls).await)
    }

    async fn consult_llm(&self, email: &EmailData) -> OracleOutcome<LlmJudgment> {
        let oracle = match &self.llm_oracle {
            Some(oracle) => oracle,
            None => return OracleOutcome::Disabled,
        };
        let summary = EmailSummary::from_email(email, self.body_snippet_chars, self.url_sample);
        OracleOutcome::from_result(oracle.judge(&summary).await)
    }

    /// Always produces a result; oracle failures only drop their signals.
    pub async fn analyze(&self, email: &EmailData) -> AnalysisResult {
        let mut signals = self.local_signals(email);

        let (url_outcome, llm_outcome) =
            tokio::join!(self.consult_url_oracle(email), self.consult_llm(email));

        if let OracleOutcome::Unavailable(reason) = &url_outcome {
            log::warn!("URL reputation unavailable: {}", reason);
        }
        if let Some(signal) = url_outcome.completed().and_then(url_reputation_signal) {
            signals.push(signal);
        }

        if let OracleOutcome::Unavailable(reason) = &llm_outcome {
            log::warn!("LLM judge unavailable: {}", reason);
        }
        if let Some(signal) = llm_outcome.completed().and_then(llm_signal) {
            signals.push(signal);
        }

        let whitelisted = self.is_whitelisted(email);
        let decision = self.engine.make_decision(&signals, whitelisted);

        log::info!(
            "{} scored {} ({}) from {} signal(s)",
            email.sender_identity(),
            decision.score,
            decision.verdict,
            signals.len()
        );

        AnalysisResult {
            score: decision.score,
            verdict: decision.verdict,
            signals,
            url_reputation_enabled: url_outcome.is_completed(),
            llm_enabled: llm_outcome.is_completed(),
            whitelisted,
            breakdown: decision.breakdown,
        }
    }
}
