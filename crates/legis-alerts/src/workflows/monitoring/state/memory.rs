use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::{
    DedupKey, DigestDocument, HistoryDocument, NotificationRecord, NotificationStore,
    RunStateDocument, StoreError,
};

#[derive(Debug, Default)]
struct Documents {
    history: HistoryDocument,
    digest: DigestDocument,
    run_state: RunStateDocument,
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_keys(&self) -> Vec<String> {
        self.lock().history.notified.keys().cloned().collect()
    }

    pub fn record_for(&self, key: &DedupKey) -> Option<NotificationRecord> {
        self.lock().history.notified.get(&key.to_string()).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Documents> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationStore for MemoryStore {
    fn already_sent(&self, key: &DedupKey) -> Result<bool, StoreError> {
        Ok(self.lock().history.notified.contains_key(&key.to_string()))
    }

    fn record(&self, key: &DedupKey, record: NotificationRecord) -> Result<(), StoreError> {
        self.lock().history.notified.insert(key.to_string(), record);
        Ok(())
    }

    fn reset_digest(&self, day: NaiveDate) -> Result<(), StoreError> {
        self.lock().digest.reset(day);
        Ok(())
    }

    fn add_to_digest(&self, day: NaiveDate, label: &str) -> Result<(), StoreError> {
        self.lock().digest.add(day, label);
        Ok(())
    }

    fn digest(&self, day: NaiveDate) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().digest.for_day(day))
    }

    fn drain_digest(&self, day: NaiveDate) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().digest.drain(day))
    }

    fn previous_scan_found_news(&self) -> Result<bool, StoreError> {
        Ok(self.lock().run_state.previous_scan_found_news)
    }

    fn set_previous_scan_found_news(&self, found: bool) -> Result<(), StoreError> {
        self.lock().run_state.previous_scan_found_news = found;
        Ok(())
    }
}
