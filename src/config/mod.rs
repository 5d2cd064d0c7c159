pub mod yaml_config;

use serde::{Deserialize, Serialize};

use crate::decision_engine::DecisionConfig;

pub const VIRUSTOTAL_KEY_ENV: &str = "VIRUSTOTAL_API_KEY";
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub scoring: DecisionConfig,
    pub virustotal: VirusTotalConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Holds blacklist.json, whitelist.json and history.json
    pub data_dir: String,
    pub history_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct VirusTotalConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_urls: usize,
    pub pacing_ms: u64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    /// Tried in order; rate-limited or unknown models fall through to the next one.
    pub models: Vec<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub body_snippet_chars: usize,
    pub url_sample: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "/var/lib/mail-risk-scorer".to_string(),
            history_limit: 50,
        }
    }
}

impl Default for VirusTotalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://www.virustotal.com/api/v3".to_string(),
            max_urls: 2,
            pacing_ms: 500,
            timeout_seconds: 15,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            models: vec![
                "arcee-ai/trinity-large-preview:free".to_string(),
                "meta-llama/llama-4-maverick:free".to_string(),
                "deepseek/deepseek-chat-v3-0324:free".to_string(),
                "mistralai/mistral-small-3.1-24b-instruct:free".to_string(),
                "nousresearch/deephermes-3-llama-3-8b-preview:free".to_string(),
            ],
            max_tokens: 200,
            temperature: 0.2,
            timeout_seconds: 30,
            body_snippet_chars: 800,
            url_sample: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Credentials from the environment override whatever the file says.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(VIRUSTOTAL_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.virustotal.api_key = Some(key.trim().to_string());
        }
        if let Some(key) = lookup(OPENROUTER_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(key.trim().to_string());
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let damping = self.scoring.whitelist_damping;
        if !(0.0..=1.0).contains(&damping) {
            anyhow::bail!(
                "scoring.whitelist_damping must be between 0.0 and 1.0, got {}",
                damping
            );
        }
        Ok(())
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.logging
            .level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.virustotal.max_urls, 2);
        assert_eq!(config.virustotal.pacing_ms, 500);
        assert_eq!(config.llm.models.len(), 5);
        assert_eq!(config.storage.history_limit, 50);
        assert_eq!(config.scoring.whitelist_damping, 0.5);
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides_from(|key| match key {
            VIRUSTOTAL_KEY_ENV => Some(" vt-key ".to_string()),
            OPENROUTER_KEY_ENV => Some("".to_string()),
            _ => None,
        });

        assert_eq!(config.virustotal.api_key.as_deref(), Some("vt-key"));
        assert_eq!(config.llm.api_key, None);
    }

    #[test]
    fn test_validate_damping_range() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        for bad in [-1.0, 3.0, f64::NAN] {
            config.scoring.whitelist_damping = bad;
            assert!(config.validate().is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "llm:\n  enabled: false\nlogging:\n  level: debug\nscoring:\n  whitelist_damping: 0.25\n",
        )
        .unwrap();

        assert!(!config.llm.enabled);
        assert_eq!(config.llm.max_tokens, 200);
        assert!(config.virustotal.enabled);
        assert_eq!(config.scoring.whitelist_damping, 0.25);
        assert_eq!(config.log_level(), log::LevelFilter::Debug);
    }
}
