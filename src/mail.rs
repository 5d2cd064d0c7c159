//! Email fields consumed by the detectors, plus a small raw-message reader
//! for `.eml` input.

use anyhow::{Context, Result};
use base64::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain_utils::DomainUtils;

lazy_static! {
    static ref ANGLE_ADDRESS: Regex = Regex::new(r"<(.+?)>").unwrap();
    static ref URL_PATTERN: Regex =
        Regex::new(r#"(?i)https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap();
    static ref BOUNDARY_PARAM: Regex = Regex::new(r#"(?i)boundary\s*=\s*"?([^";]+)"?"#).unwrap();
    static ref FILENAME_PARAM: Regex =
        Regex::new(r#"(?i)\b(?:filename|name)\*?\s*=\s*"?([^";]+)"?"#).unwrap();
}

pub const UNKNOWN_DOMAIN: &str = "unknown";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub size: usize,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailData {
    /// Raw From header value, e.g. `"PayPal" <service@paypa1.com>`
    pub from: String,
    pub sender_email: Option<String>,
    pub sender_domain: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub urls: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub message_id: Option<String>,
}

impl EmailData {
    /// Build from already-extracted fields, deriving sender identity and URLs.
    pub fn new(
        from: &str,
        subject: Option<String>,
        body: Option<String>,
        headers: HashMap<String, String>,
        attachments: Vec<Attachment>,
    ) -> Self {
        let mut email = Self {
            from: from.to_string(),
            subject,
            body,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            attachments,
            ..Default::default()
        };
        email.fill_derived_fields();
        email
    }

    /// Parse a raw RFC 5322 message. Never fails; missing parts are left empty.
    pub fn from_raw(raw: &str) -> Self {
        let normalized = raw.replace("\r\n", "\n");
        let (header_block, body_block) = split_header_body(&normalized);
        let headers = parse_headers(header_block);

        let mut body = None;
        let mut attachments = Vec::new();
        collect_parts(&headers, body_block, &mut body, &mut attachments);

        let mut email = Self {
            from: headers.get("from").cloned().unwrap_or_default(),
            subject: headers.get("subject").cloned(),
            message_id: headers.get("message-id").cloned(),
            body,
            headers,
            attachments,
            ..Default::default()
        };
        email.fill_derived_fields();

        log::debug!(
            "Parsed message from {:?}: {} header(s), {} url(s), {} attachment(s)",
            email.sender_email,
            email.headers.len(),
            email.urls.len(),
            email.attachments.len()
        );
        email
    }

    /// Deserialize from JSON; fields a caller left out are derived the same way as for raw input.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut email: EmailData =
            serde_json::from_str(json).context("Failed to parse email JSON")?;
        email.headers = email
            .headers
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        email.fill_derived_fields();
        Ok(email)
    }

    fn fill_derived_fields(&mut self) {
        if self.sender_email.is_none() {
            self.sender_email = extract_email(&self.from);
        }
        if self.sender_domain.is_empty() {
            self.sender_domain = self
                .sender_email
                .as_deref()
                .and_then(DomainUtils::extract_domain)
                .unwrap_or_else(|| UNKNOWN_DOMAIN.to_string());
        }
        if self.urls.is_empty() {
            self.urls = extract_urls(self.body.as_deref().unwrap_or(""));
        }
    }

    /// Header lookup by lower-cased name; missing headers read as empty.
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Email address if known, raw From otherwise.
    pub fn sender_identity(&self) -> &str {
        self.sender_email.as_deref().unwrap_or(&self.from)
    }
}

/// `Name <addr>` yields `addr`; a bare address is accepted as-is. Lower-cased.
pub fn extract_email(from_field: &str) -> Option<String> {
    if let Some(cap) = ANGLE_ADDRESS.captures(from_field) {
        return Some(cap[1].trim().to_lowercase());
    }
    if from_field.contains('@') {
        return Some(from_field.trim().to_lowercase());
    }
    None
}

pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A leading blank line means there are no headers at all.
fn split_header_body(message: &str) -> (&str, &str) {
    if let Some(body) = message.strip_prefix('\n') {
        return ("", body);
    }
    match message.find("\n\n") {
        Some(pos) => (&message[..pos], &message[pos + 2..]),
        None => (message, ""),
    }
}

/// Unfold continuation lines and lower-case header names. The first occurrence of a
/// repeated header wins, which keeps the receiving server's own stamps.
fn parse_headers(block: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    let mut current: Option<(String, String)> = None;

    for line in block.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = current.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }

        if let Some((name, value)) = current.take() {
            headers.entry(name).or_insert(value);
        }

        if let Some(colon) = line.find(':') {
            let name = line[..colon].trim().to_lowercase();
            let value = line[colon + 1..].trim().to_string();
            current = Some((name, value));
        }
    }

    if let Some((name, value)) = current {
        headers.entry(name).or_insert(value);
    }

    headers
}

fn collect_parts(
    headers: &HashMap<String, String>,
    body: &str,
    text_body: &mut Option<String>,
    attachments: &mut Vec<Attachment>,
) {
    let content_type = headers
        .get("content-type")
        .map(String::as_str)
        .unwrap_or("text/plain");
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    if mime.starts_with("multipart/") {
        if let Some(cap) = BOUNDARY_PARAM.captures(content_type) {
            let delimiter = format!("--{}", cap[1].trim());
            for part in body.split(delimiter.as_str()).skip(1) {
                if part.starts_with("--") {
                    break;
                }
                let part = part.strip_prefix('\n').unwrap_or(part);
                let (part_header_block, part_body) = split_header_body(part);
                let part_headers = parse_headers(part_header_block);
                collect_parts(&part_headers, part_body, text_body, attachments);
            }
            return;
        }
    }

    let disposition = headers
        .get("content-disposition")
        .map(String::as_str)
        .unwrap_or("");
    let filename = FILENAME_PARAM
        .captures(disposition)
        .or_else(|| FILENAME_PARAM.captures(content_type))
        .map(|cap| cap[1].trim().to_string());

    let is_base64 = headers
        .get("content-transfer-encoding")
        .map(|e| e.trim().eq_ignore_ascii_case("base64"))
        .unwrap_or(false);

    if let Some(name) = filename {
        let size = if is_base64 {
            decode_base64(body).map(|b| b.len()).unwrap_or(body.len())
        } else {
            body.len()
        };
        attachments.push(Attachment {
            name,
            content_type: mime,
            size,
        });
        return;
    }

    if text_body.is_none() && (mime == "text/plain" || mime == "text/html" || mime.is_empty()) {
        let text = if is_base64 {
            decode_base64(body)
                .map(|b| String::from_utf8_lossy(&b).to_string())
                .unwrap_or_else(|| body.to_string())
        } else {
            body.to_string()
        };
        *text_body = Some(text.trim_end().to_string());
    }
}

fn decode_base64(body: &str) -> Option<Vec<u8>> {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD.decode(compact).ok()
}
