//! Recent analysis history, newest first, capped at a configured length.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::AnalysisResult;
use crate::mail::EmailData;
use crate::verdict::Verdict;

const HISTORY_FILE: &str = "history.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub subject: String,
    pub score: u8,
    pub verdict: Verdict,
    #[serde(default)]
    pub message_id: Option<String>,
}

impl HistoryEntry {
    pub fn from_result(email: &EmailData, result: &AnalysisResult) -> Self {
        Self {
            timestamp: Utc::now(),
            sender: email.sender_identity().to_string(),
            subject: email
                .subject
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("(No subject)")
                .to_string(),
            score: result.score,
            verdict: result.verdict,
            message_id: email.message_id.clone(),
        }
    }
}

pub struct JsonHistoryStore {
    path: PathBuf,
    limit: usize,
}

impl JsonHistoryStore {
    pub fn new<P: AsRef<Path>>(data_dir: P, limit: usize) -> Self {
        Self {
            path: data_dir.as_ref().join(HISTORY_FILE),
            limit,
        }
    }

    /// Newest first. Missing or unreadable history reads as empty.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!(
                "History file {} is unreadable ({}), starting fresh",
                self.path.display(),
                e
            );
            Vec::new()
        })
    }

    pub fn record(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.load();
        entries.insert(0, entry);
        entries.truncate(self.limit);
        self.write(&entries)
    }

    pub fn clear(&self) -> Result<()> {
        self.write(&[])
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write history: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mail-risk-scorer-history-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn entry(subject: &str, score: u8) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc::now(),
            sender: "someone@example.com".to_string(),
            subject: subject.to_string(),
            score,
            verdict: Verdict::from_score(score),
            message_id: None,
        }
    }

    #[test]
    fn test_newest_first_and_capped() {
        let dir = temp_dir("cap");
        let store = JsonHistoryStore::new(&dir, 3);

        for i in 0..5u8 {
            store.record(entry(&format!("mail {}", i), i * 10)).unwrap();
        }

        let entries = store.load();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].subject, "mail 4");
        assert_eq!(entries[2].subject, "mail 2");
        assert_eq!(entries[0].verdict, Verdict::Suspicious);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_clear_and_corrupt_file() {
        let dir = temp_dir("clear");
        let store = JsonHistoryStore::new(&dir, 50);

        store.record(entry("hello", 0)).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());

        fs::write(dir.join(HISTORY_FILE), "[{ not json").unwrap();
        assert!(store.load().is_empty());
        store.record(entry("after", 12)).unwrap();
        assert_eq!(store.load().len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_entry_subject_fallback() {
        let email = EmailData::new("a@b.com", None, None, Default::default(), vec![]);
        let result = AnalysisResult {
            score: 35,
            verdict: Verdict::Suspicious,
            signals: vec![],
            url_reputation_enabled: false,
            llm_enabled: false,
            whitelisted: false,
            breakdown: crate::decision_engine::DecisionEngine::default()
                .breakdown(&[], false),
        };

        let entry = HistoryEntry::from_result(&email, &result);
        assert_eq!(entry.subject, "(No subject)");
        assert_eq!(entry.sender, "a@b.com");
        assert_eq!(entry.score, 35);
    }
}
