use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    DedupKey, DigestDocument, HistoryDocument, NotificationRecord, NotificationStore,
    RunStateDocument, StoreError,
};

const HISTORY_FILE: &str = "history.json";
const DIGEST_FILE: &str = "digest.json";
const RUN_STATE_FILE: &str = "run_state.json";

#[derive(Debug)]
struct Documents {
    history: HistoryDocument,
    digest: DigestDocument,
    run_state: RunStateDocument,
}

/// Three JSON documents in one directory, written through on every change.
/// Writes go to a temporary sibling first and are renamed into place.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    documents: Mutex<Documents>,
}

impl JsonFileStore {
    /// Open (creating if needed) the state directory. Missing documents start
    /// empty; unreadable or corrupt ones are logged and replaced by defaults.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let documents = Documents {
            history: load_or_default(&dir.join(HISTORY_FILE)),
            digest: load_or_default(&dir.join(DIGEST_FILE)),
            run_state: load_or_default(&dir.join(RUN_STATE_FILE)),
        };

        tracing::debug!(
            dir = %dir.display(),
            notified = documents.history.notified.len(),
            "state store opened"
        );

        Ok(Self {
            dir,
            documents: Mutex::new(documents),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock(&self) -> MutexGuard<'_, Documents> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist<T: Serialize>(&self, file: &str, document: &T) -> Result<(), StoreError> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        let bytes = serde_json::to_vec_pretty(document)?;
        fs::write(&tmp, bytes).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "state file unreadable, starting empty");
            return T::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|error| {
        tracing::warn!(path = %path.display(), %error, "state file corrupt, starting empty");
        T::default()
    })
}

impl NotificationStore for JsonFileStore {
    fn already_sent(&self, key: &DedupKey) -> Result<bool, StoreError> {
        Ok(self.lock().history.notified.contains_key(&key.to_string()))
    }

    fn record(&self, key: &DedupKey, record: NotificationRecord) -> Result<(), StoreError> {
        let mut documents = self.lock();
        documents.history.notified.insert(key.to_string(), record);
        self.persist(HISTORY_FILE, &documents.history)
    }

    fn reset_digest(&self, day: NaiveDate) -> Result<(), StoreError> {
        let mut documents = self.lock();
        documents.digest.reset(day);
        self.persist(DIGEST_FILE, &documents.digest)
    }

    fn add_to_digest(&self, day: NaiveDate, label: &str) -> Result<(), StoreError> {
        let mut documents = self.lock();
        let stale = documents.digest.date != Some(day);
        if documents.digest.add(day, label) || stale {
            self.persist(DIGEST_FILE, &documents.digest)?;
        }
        Ok(())
    }

    fn digest(&self, day: NaiveDate) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().digest.for_day(day))
    }

    fn drain_digest(&self, day: NaiveDate) -> Result<Vec<String>, StoreError> {
        let mut documents = self.lock();
        let items = documents.digest.drain(day);
        self.persist(DIGEST_FILE, &documents.digest)?;
        Ok(items)
    }

    fn previous_scan_found_news(&self) -> Result<bool, StoreError> {
        Ok(self.lock().run_state.previous_scan_found_news)
    }

    fn set_previous_scan_found_news(&self, found: bool) -> Result<(), StoreError> {
        let mut documents = self.lock();
        documents.run_state.previous_scan_found_news = found;
        self.persist(RUN_STATE_FILE, &documents.run_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::monitoring::domain::{AlertLevel, ProposalId};
    use chrono::{TimeZone, Utc};

    fn record() -> NotificationRecord {
        NotificationRecord {
            label: "PEC 10/2025".to_string(),
            level: AlertLevel::Medium,
            score: 50,
            sent_at: Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = DedupKey::new(ProposalId::camara("2501234"), "2025-03-10T14:30");
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date");
        {
            let store = JsonFileStore::open(dir.path()).expect("store opens");
            assert!(store.previous_scan_found_news().expect("run state"));
            store.record(&key, record()).expect("record");
            store.add_to_digest(day, "PEC 10/2025").expect("digest");
            store.set_previous_scan_found_news(false).expect("run state");
        }

        let store = JsonFileStore::open(dir.path()).expect("store reopens");
        assert!(store.already_sent(&key).expect("lookup"));
        assert_eq!(store.digest(day).expect("digest"), vec!["PEC 10/2025"]);
        assert!(!store.previous_scan_found_news().expect("run state"));
        assert!(!dir.path().join("history.json.tmp").exists());
    }

    #[test]
    fn corrupt_documents_degrade_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(HISTORY_FILE), "{not json").expect("write");
        fs::write(dir.path().join(RUN_STATE_FILE), "[]").expect("write");

        let store = JsonFileStore::open(dir.path()).expect("store opens");
        let key = DedupKey::new(ProposalId::camara("1"), "");
        assert!(!store.already_sent(&key).expect("lookup"));
        assert!(store.previous_scan_found_news().expect("run state"));

        store.record(&key, record()).expect("record repairs the file");
        let reopened = JsonFileStore::open(dir.path()).expect("store reopens");
        assert!(reopened.already_sent(&key).expect("lookup"));
    }

    #[test]
    fn drain_clears_the_persisted_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date");
        let store = JsonFileStore::open(dir.path()).expect("store opens");
        store.add_to_digest(day, "PL 1/2025").expect("digest");
        assert_eq!(store.drain_digest(day).expect("drain"), vec!["PL 1/2025"]);

        let reopened = JsonFileStore::open(dir.path()).expect("store reopens");
        assert!(reopened.digest(day).expect("digest").is_empty());
    }
}
