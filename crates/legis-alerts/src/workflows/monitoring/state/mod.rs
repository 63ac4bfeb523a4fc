//! Deduplication history, the daily digest, and run state.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AlertLevel, ProposalId};

/// One notifiable event: a proposal at a given status timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub proposal_id: ProposalId,
    pub status_at: String,
}

impl DedupKey {
    pub fn new(proposal_id: ProposalId, status_at: impl Into<String>) -> Self {
        Self {
            proposal_id,
            status_at: status_at.into(),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_at = self.status_at.trim();
        if status_at.is_empty() {
            write!(f, "{}::undated", self.proposal_id)
        } else {
            write!(f, "{}::{}", self.proposal_id, status_at)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub label: String,
    pub level: AlertLevel,
    pub score: u8,
    pub sent_at: DateTime<Utc>,
}

/// Persistence for everything a scan must remember between runs. Assumes a
/// single writer per state location.
pub trait NotificationStore: Send + Sync {
    fn already_sent(&self, key: &DedupKey) -> Result<bool, StoreError>;
    /// Idempotent; recording an existing key overwrites its metadata.
    fn record(&self, key: &DedupKey, record: NotificationRecord) -> Result<(), StoreError>;
    fn reset_digest(&self, day: NaiveDate) -> Result<(), StoreError>;
    fn add_to_digest(&self, day: NaiveDate, label: &str) -> Result<(), StoreError>;
    /// Labels for `day`; a digest stored for any other day reads as empty.
    fn digest(&self, day: NaiveDate) -> Result<Vec<String>, StoreError>;
    /// Return `day`'s labels and leave an empty digest for `day` behind.
    fn drain_digest(&self, day: NaiveDate) -> Result<Vec<String>, StoreError>;
    fn previous_scan_found_news(&self) -> Result<bool, StoreError>;
    fn set_previous_scan_found_news(&self, found: bool) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file {path} unavailable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct HistoryDocument {
    #[serde(default)]
    pub notified: BTreeMap<String, NotificationRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct DigestDocument {
    #[serde(default, alias = "data")]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "itens")]
    pub items: Vec<String>,
}

impl DigestDocument {
    fn reset(&mut self, day: NaiveDate) {
        self.date = Some(day);
        self.items.clear();
    }

    fn for_day(&self, day: NaiveDate) -> Vec<String> {
        if self.date == Some(day) {
            self.items.clone()
        } else {
            Vec::new()
        }
    }

    fn add(&mut self, day: NaiveDate, label: &str) -> bool {
        if self.date != Some(day) {
            self.reset(day);
        }
        if self.items.iter().any(|item| item == label) {
            return false;
        }
        self.items.push(label.to_string());
        true
    }

    fn drain(&mut self, day: NaiveDate) -> Vec<String> {
        let items = self.for_day(day);
        self.reset(day);
        items
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RunStateDocument {
    #[serde(alias = "ultima_novidade")]
    pub previous_scan_found_news: bool,
}

impl Default for RunStateDocument {
    fn default() -> Self {
        Self {
            previous_scan_found_news: true,
        }
    }
}
