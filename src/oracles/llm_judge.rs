//! LLM phishing judge over an OpenAI-compatible chat endpoint (OpenRouter by default).

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{EmailSummary, LlmJudgment, LlmOracle, OracleError};
use crate::config::LlmConfig;
use crate::mail::EmailData;

lazy_static! {
    static ref JSON_OBJECT: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    flags: Option<Vec<String>>,
    #[serde(default)]
    summary: Option<String>,
}

impl EmailSummary {
    pub fn from_email(email: &EmailData, body_chars: usize, url_sample: usize) -> Self {
        Self {
            from: email.from.clone(),
            subject: email
                .subject
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "(no subject)".to_string()),
            body_snippet: email
                .body
                .as_deref()
                .unwrap_or("")
                .chars()
                .take(body_chars)
                .collect(),
            urls: email.urls.iter().take(url_sample).cloned().collect(),
        }
    }
}

/// Calibrated prompt: most mail is legitimate, flag only clear red flags.
pub fn build_prompt(summary: &EmailSummary) -> String {
    let url_list = if summary.urls.is_empty() {
        "none".to_string()
    } else {
        summary.urls.join(", ")
    };

    format!(
        "Analyze this email and rate how likely it is to be a phishing/scam attempt.\n\n\
         From: {}\n\
         Subject: {}\n\
         Body: {}\n\
         URLs: {}\n\n\
         IMPORTANT: Most emails are legitimate! Only flag as suspicious if there are CLEAR red flags like:\n\
         - Requests for passwords, credit cards, SSN\n\
         - Urgent threats about account suspension\n\
         - Suspicious links (IP addresses, misspelled domains)\n\
         - Too-good-to-be-true offers (free money, lottery wins)\n\
         - Sender mismatch (claims to be a bank but uses gmail)\n\n\
         Score guide:\n\
         0-10 = Normal email (newsletters, receipts, work emails)\n\
         10-30 = Slightly unusual but probably fine\n\
         30-60 = Some red flags, be careful\n\
         60-100 = Multiple clear phishing indicators\n\n\
         Respond ONLY with JSON:\n\
         {{\"score\": <0-100>, \"flags\": [\"flag1\"], \"summary\": \"<1 sentence>\"}}",
        summary.from, summary.subject, summary.body_snippet, url_list
    )
}

/// Strip Markdown fences, take the outermost `{...}` span, clamp the score.
pub fn parse_reply(content: &str, model: &str) -> Result<LlmJudgment, OracleError> {
    let cleaned = content
        .trim()
        .replace("```json", "")
        .replace("```", "");
    let json = JSON_OBJECT
        .find(&cleaned)
        .map(|m| m.as_str())
        .unwrap_or(cleaned.trim());

    let raw: RawJudgment = serde_json::from_str(json)
        .map_err(|e| OracleError::MalformedResponse(format!("{}: {}", e, json)))?;

    let score = raw.score.unwrap_or(0.0).clamp(0.0, 100.0).round() as u8;

    Ok(LlmJudgment {
        score,
        flags: raw.flags.unwrap_or_default(),
        summary: raw.summary.unwrap_or_default(),
        model: model.to_string(),
    })
}

pub struct LlmJudgeClient {
    client: Client,
    config: LlmConfig,
}

impl LlmJudgeClient {
    pub fn new(config: LlmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    /// For testing: point the client at a mock server.
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    async fn try_model(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<LlmJudgment, OracleError> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .header("X-Title", "Mail Risk Scorer")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(OracleError::Http { status, body });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::MalformedResponse("empty completion".to_string()))?;

        parse_reply(&content, model)
    }

    /// Rate limits and unknown models move on to the next fallback model.
    fn is_retryable(error: &OracleError) -> bool {
        matches!(
            error,
            OracleError::Http { status, .. }
                if *status == StatusCode::TOO_MANY_REQUESTS || *status == StatusCode::NOT_FOUND
        )
    }
}

#[async_trait]
impl LlmOracle for LlmJudgeClient {
    async fn judge(&self, summary: &EmailSummary) -> Result<LlmJudgment, OracleError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(OracleError::MissingCredential)?;

        let prompt = build_prompt(summary);
        let mut attempts = 0;

        for model in &self.config.models {
            attempts += 1;
            match self.try_model(api_key, model, &prompt).await {
                Ok(judgment) => {
                    log::info!("LLM judge {} scored {}", model, judgment.score);
                    return Ok(judgment);
                }
                Err(e) if Self::is_retryable(&e) => {
                    log::warn!("Model {} unavailable ({}), trying next", model, e);
                }
                Err(e) => {
                    log::warn!("Model {} failed: {}", model, e);
                    return Err(e);
                }
            }
        }

        Err(OracleError::Exhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: Option<&str>, models: &[&str]) -> LlmConfig {
        LlmConfig {
            enabled: true,
            api_key: api_key.map(str::to_string),
            base_url: "http://localhost".to_string(),
            models: models.iter().map(|m| m.to_string()).collect(),
            max_tokens: 200,
            temperature: 0.2,
            timeout_seconds: 5,
            body_snippet_chars: 800,
            url_sample: 3,
        }
    }

    fn summary() -> EmailSummary {
        EmailSummary {
            from: "Bank <alerts@bank-secure.example>".to_string(),
            subject: "Account suspended".to_string(),
            body_snippet: "Verify now".to_string(),
            urls: vec![],
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_parse_reply_with_fences_and_chatter() {
        let reply = "Sure!\n```json\n{\"score\": 72, \"flags\": [\"urgency\"], \"summary\": \"Fake bank alert.\"}\n```";
        let judgment = parse_reply(reply, "m").unwrap();
        assert_eq!(judgment.score, 72);
        assert_eq!(judgment.flags, vec!["urgency"]);
        assert_eq!(judgment.summary, "Fake bank alert.");
    }

    #[test]
    fn test_parse_reply_clamps_and_defaults() {
        assert_eq!(parse_reply("{\"score\": 140}", "m").unwrap().score, 100);
        assert_eq!(parse_reply("{\"score\": -3}", "m").unwrap().score, 0);
        assert_eq!(parse_reply("{}", "m").unwrap().score, 0);
        assert!(parse_reply("no json here", "m").is_err());
    }

    #[test]
    fn test_summary_truncates_body_and_urls() {
        let email = EmailData {
            from: "a@b.example".to_string(),
            body: Some("x".repeat(1000)),
            urls: (0..5).map(|i| format!("https://u{}.example", i)).collect(),
            ..Default::default()
        };
        let summary = EmailSummary::from_email(&email, 800, 3);
        assert_eq!(summary.body_snippet.len(), 800);
        assert_eq!(summary.urls.len(), 3);
        assert_eq!(summary.subject, "(no subject)");
        assert!(build_prompt(&summary).contains("Subject: (no subject)"));
    }

    #[tokio::test]
    async fn test_falls_back_on_rate_limit() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "first"})))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer key"))
            .and(body_partial_json(serde_json::json!({"model": "second"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "{\"score\": 80, \"flags\": [], \"summary\": \"Phishing.\"}",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmJudgeClient::new(test_config(Some("key"), &["first", "second"]))
            .unwrap()
            .with_base_url(&server.uri());

        let judgment = client.judge(&summary()).await.unwrap();
        assert_eq!(judgment.score, 80);
        assert_eq!(judgment.model, "second");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests
            .iter()
            .all(|r| !r.headers.contains_key("http-referer")));
    }

    #[tokio::test]
    async fn test_stops_on_non_retryable_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "first"})))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "second"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"score\": 5}")))
            .expect(0)
            .mount(&server)
            .await;

        let client = LlmJudgeClient::new(test_config(Some("key"), &["first", "second"]))
            .unwrap()
            .with_base_url(&server.uri());

        let err = client.judge(&summary()).await.unwrap_err();
        assert!(matches!(err, OracleError::Http { status, .. } if status == StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_all_models_exhausted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let client = LlmJudgeClient::new(test_config(Some("key"), &["a", "b"]))
            .unwrap()
            .with_base_url(&server.uri());

        let err = client.judge(&summary()).await.unwrap_err();
        assert!(matches!(err, OracleError::Exhausted { attempts: 2 }));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = LlmJudgeClient::new(test_config(None, &["a"])).unwrap();
        assert!(matches!(
            client.judge(&summary()).await,
            Err(OracleError::MissingCredential)
        ));
    }
}
