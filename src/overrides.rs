//! Sender blacklist/whitelist as immutable values, plus file-backed storage.
//!
//! Every edit returns a new list; a rejected edit leaves the caller's value untouched.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain_utils::DomainUtils;

lazy_static! {
    static ref EMAIL_FORMAT: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref DOMAIN_FORMAT: Regex =
        Regex::new(r"^[a-z0-9]+([\-\.]{1}[a-z0-9]+)*\.[a-z]{2,}$").unwrap();
    static ref SCHEME_PREFIX: Regex = Regex::new(r"^https?://").unwrap();
}

/// Well-known senders that are always trusted. Not persisted and not removable.
pub const BUILTIN_TRUSTED_DOMAINS: &[&str] = &[
    "hoyoverse.com",
    "mihoyo.com",
    "riotgames.com",
    "leagueoflegends.com",
    "steampowered.com",
    "epicgames.com",
    "blizzard.com",
    "battle.net",
    "playstation.com",
    "xbox.com",
    "nintendo.com",
    "ea.com",
    "ubisoft.com",
    "netflix.com",
    "spotify.com",
    "disney.com",
    "hulu.com",
    "youtube.com",
    "twitch.tv",
    "primevideo.com",
    "amazon.com",
    "amazon.co.il",
    "ebay.com",
    "aliexpress.com",
    "wolt.com",
    "gett.com",
    "uber.com",
    "bolt.eu",
    "google.com",
    "gmail.com",
    "apple.com",
    "microsoft.com",
    "github.com",
    "gitlab.com",
    "linkedin.com",
    "dropbox.com",
    "zoom.us",
    "slack.com",
    "notion.so",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "tiktok.com",
    "reddit.com",
    "discord.com",
    "bankhapoalim.co.il",
    "leumi.co.il",
    "mizrahi-tefahot.co.il",
    "discount.co.il",
    "isracard.co.il",
    "cal-online.co.il",
    "max.co.il",
    "paypal.com",
    "stripe.com",
    "bezeq.co.il",
    "partner.co.il",
    "cellcom.co.il",
    "hot.net.il",
    "super-pharm.co.il",
    "shufersal.co.il",
    "gov.il",
    "tau.ac.il",
    "huji.ac.il",
    "technion.ac.il",
    "weizmann.ac.il",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverrideError {
    #[error("Please enter a value")]
    EmptyInput,

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid domain format: {0}")]
    InvalidDomain(String),

    #[error("{0} is already in the list")]
    AlreadyPresent(String),

    #[error("{0} is not in the list")]
    NotPresent(String),
}

/// Normalize and validate an email entry.
pub fn normalize_email(input: &str) -> Result<String, OverrideError> {
    let email = input.trim().to_lowercase();
    if email.is_empty() {
        return Err(OverrideError::EmptyInput);
    }
    if !EMAIL_FORMAT.is_match(&email) {
        return Err(OverrideError::InvalidEmail(email));
    }
    Ok(email)
}

/// Normalize and validate a domain entry; a pasted URL is reduced to its host.
pub fn normalize_domain(input: &str) -> Result<String, OverrideError> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(OverrideError::EmptyInput);
    }
    let domain = if SCHEME_PREFIX.is_match(&trimmed) {
        DomainUtils::url_host(&trimmed).unwrap_or_default()
    } else {
        trimmed.split('/').next().unwrap_or("").to_string()
    };
    if !DOMAIN_FORMAT.is_match(&domain) {
        return Err(OverrideError::InvalidDomain(domain));
    }
    Ok(domain)
}

/// User-managed set of sender emails and domains.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideList {
    emails: Vec<String>,
    domains: Vec<String>,
}

impl OverrideList {
    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.domains.is_empty()
    }

    pub fn contains_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.emails.iter().any(|e| *e == email)
    }

    /// Exact domain membership.
    pub fn contains_domain(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.domains.iter().any(|d| *d == domain)
    }

    pub fn add_email(&self, input: &str) -> Result<Self, OverrideError> {
        let email = normalize_email(input)?;
        if self.emails.contains(&email) {
            return Err(OverrideError::AlreadyPresent(email));
        }
        let mut next = self.clone();
        next.emails.push(email);
        Ok(next)
    }

    pub fn add_domain(&self, input: &str) -> Result<Self, OverrideError> {
        let domain = normalize_domain(input)?;
        if self.domains.contains(&domain) {
            return Err(OverrideError::AlreadyPresent(domain));
        }
        let mut next = self.clone();
        next.domains.push(domain);
        Ok(next)
    }

    /// Remove an email or domain entry, whichever matches.
    pub fn remove(&self, value: &str) -> Result<Self, OverrideError> {
        let value = value.trim().to_lowercase();
        let mut next = self.clone();
        next.emails.retain(|e| *e != value);
        next.domains.retain(|d| *d != value);
        if next == *self {
            return Err(OverrideError::NotPresent(value));
        }
        Ok(next)
    }

    fn normalized(self) -> Self {
        Self {
            emails: self.emails.into_iter().map(|e| e.to_lowercase()).collect(),
            domains: self.domains.into_iter().map(|d| d.to_lowercase()).collect(),
        }
    }
}

/// User trusted senders combined with the built-in domains.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Whitelist {
    user: OverrideList,
}

impl Whitelist {
    pub fn new(user: OverrideList) -> Self {
        Self { user }
    }

    /// The part that is persisted and editable.
    pub fn user_entries(&self) -> &OverrideList {
        &self.user
    }

    /// Exact email match, or the sender domain equals / is a subdomain of a trusted domain.
    pub fn is_whitelisted(&self, sender_email: Option<&str>, sender_domain: &str) -> bool {
        if let Some(email) = sender_email {
            if self.user.contains_email(email) {
                return true;
            }
        }

        DomainUtils::matches_domain_list(sender_domain, self.user.domains())
            || DomainUtils::matches_domain_list(sender_domain, BUILTIN_TRUSTED_DOMAINS)
    }
}

/// Storage collaborator for the override lists.
pub trait OverrideRepository {
    fn load_blacklist(&self) -> OverrideList;
    fn save_blacklist(&self, list: &OverrideList) -> Result<()>;
    fn load_whitelist(&self) -> Whitelist;
    fn save_whitelist(&self, list: &Whitelist) -> Result<()>;
}

/// JSON files `blacklist.json` and `whitelist.json` under a data directory.
pub struct JsonOverrideRepository {
    data_dir: PathBuf,
}

impl JsonOverrideRepository {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Missing or corrupted files read as an empty list.
    fn load(&self, file: &str) -> OverrideList {
        let path = self.path(file);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return OverrideList::default(),
        };

        match serde_json::from_str::<OverrideList>(&content) {
            Ok(list) => list.normalized(),
            Err(e) => {
                log::warn!(
                    "Stored list {} is unreadable ({}), resetting to empty",
                    path.display(),
                    e
                );
                OverrideList::default()
            }
        }
    }

    fn save(&self, file: &str, list: &OverrideList) -> Result<()> {
        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("Failed to create data directory: {}", self.data_dir.display())
        })?;
        let path = self.path(file);
        let json = serde_json::to_string_pretty(list)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write list: {}", path.display()))?;
        Ok(())
    }
}

impl OverrideRepository for JsonOverrideRepository {
    fn load_blacklist(&self) -> OverrideList {
        self.load("blacklist.json")
    }

    fn save_blacklist(&self, list: &OverrideList) -> Result<()> {
        self.save("blacklist.json", list)
    }

    fn load_whitelist(&self) -> Whitelist {
        Whitelist::new(self.load("whitelist.json"))
    }

    fn save_whitelist(&self, list: &Whitelist) -> Result<()> {
        self.save("whitelist.json", list.user_entries())
    }
}
