//! VirusTotal v3 URL lookups.
//!
//! The free tier allows 4 requests per minute, so only the first few URLs are
//! checked and consecutive calls are paced.

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{OracleError, UrlReputationOracle, UrlReputationReport, UrlVerdict, ScanStatus};
use crate::config::VirusTotalConfig;

const MAX_URL_LENGTH: usize = 2000;

#[derive(Debug, Deserialize)]
struct UrlReportResponse {
    data: UrlReportData,
}

#[derive(Debug, Deserialize)]
struct UrlReportData {
    attributes: UrlAttributes,
}

#[derive(Debug, Deserialize)]
struct UrlAttributes {
    last_analysis_stats: AnalysisStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisStats {
    malicious: u32,
    suspicious: u32,
    harmless: u32,
    undetected: u32,
}

pub struct VirusTotalClient {
    client: Client,
    config: VirusTotalConfig,
}

impl VirusTotalClient {
    pub fn new(config: VirusTotalConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("mail-risk-scorer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// For testing: point the client at a mock server.
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    /// VirusTotal identifies a URL by its unpadded URL-safe base64 encoding.
    pub fn url_id(url: &str) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(url.as_bytes())
    }

    /// The first `max_urls` URLs, minus data URLs and oversized ones.
    pub fn urls_to_check<'a>(&self, urls: &'a [String]) -> Vec<&'a String> {
        urls.iter()
            .take(self.config.max_urls)
            .filter(|u| u.len() <= MAX_URL_LENGTH && !u.starts_with("data:"))
            .collect()
    }

    async fn check_url(&self, api_key: &str, url: &str) -> Result<UrlVerdict, OracleError> {
        let endpoint = format!("{}/urls/{}", self.config.base_url, Self::url_id(url));
        let response = self
            .client
            .get(&endpoint)
            .header("x-apikey", api_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return self.submit_url(api_key, url).await;
        }

        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(OracleError::Http { status, body });
        }

        let report: UrlReportResponse = serde_json::from_str(&body)
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;
        let stats = report.data.attributes.last_analysis_stats;

        Ok(UrlVerdict {
            url: url.to_string(),
            malicious: stats.malicious,
            suspicious: stats.suspicious,
            harmless: stats.harmless,
            undetected: stats.undetected,
            status: ScanStatus::Complete,
        })
    }

    /// Unknown URL: queue it for scanning. The verdict is not available yet.
    async fn submit_url(&self, api_key: &str, url: &str) -> Result<UrlVerdict, OracleError> {
        let endpoint = format!("{}/urls", self.config.base_url);
        let response = self
            .client
            .post(&endpoint)
            .header("x-apikey", api_key)
            .form(&[("url", url)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Http { status, body });
        }

        log::debug!("Submitted {} for scanning", url);
        Ok(UrlVerdict::pending(url))
    }
}

#[async_trait]
impl UrlReputationOracle for VirusTotalClient {
    async fn check_urls(&self, urls: &[String]) -> Result<UrlReputationReport, OracleError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(OracleError::MissingCredential)?;

        let to_check = self.urls_to_check(urls);
        let mut report = UrlReputationReport::default();

        for (i, url) in to_check.iter().enumerate() {
            match self.check_url(api_key, url).await {
                Ok(verdict) => report.per_url.push(verdict),
                Err(e) => {
                    log::warn!("VirusTotal lookup failed for {}: {}", url, e);
                    report.per_url.push(UrlVerdict::failed(url));
                }
            }

            if i + 1 < to_check.len() && self.config.pacing_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.pacing_ms)).await;
            }
        }

        log::info!(
            "VirusTotal checked {} of {} URL(s)",
            report.per_url.len(),
            urls.len()
        );
        Ok(report)
    }
}
