use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::workflows::monitoring::domain::{ProposalId, StatusSnapshot};

/// Size-bounded status memo shared by the fetches of one scan. Oldest entries
/// are evicted first; a capacity of zero disables caching.
#[derive(Debug)]
pub struct StatusCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<ProposalId, StatusSnapshot>,
    order: VecDeque<ProposalId>,
}

impl StatusCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &ProposalId) -> Option<StatusSnapshot> {
        self.lock().entries.get(id).cloned()
    }

    pub fn insert(&self, id: ProposalId, snapshot: StatusSnapshot) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.lock();
        if inner.entries.insert(id.clone(), snapshot).is_some() {
            return;
        }
        inner.order.push_back(id);
        while inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.entries.remove(&evicted);
            }
        }
    }

    pub fn invalidate(&self, id: &ProposalId) {
        let mut inner = self.lock();
        if inner.entries.remove(id).is_some() {
            inner.order.retain(|queued| queued != id);
        }
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(situation: &str) -> StatusSnapshot {
        StatusSnapshot {
            situation: situation.to_string(),
            ..StatusSnapshot::default()
        }
    }

    #[test]
    fn evicts_oldest_entry_past_capacity() {
        let cache = StatusCache::new(2);
        cache.insert(ProposalId::camara("1"), snapshot("a"));
        cache.insert(ProposalId::camara("2"), snapshot("b"));
        cache.insert(ProposalId::camara("3"), snapshot("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&ProposalId::camara("1")).is_none());
        assert_eq!(cache.get(&ProposalId::camara("3")), Some(snapshot("c")));
    }

    #[test]
    fn invalidate_and_clear_drop_entries() {
        let cache = StatusCache::new(4);
        cache.insert(ProposalId::camara("1"), snapshot("a"));
        cache.insert(ProposalId::camara("2"), snapshot("b"));
        cache.invalidate(&ProposalId::camara("1"));
        assert!(cache.get(&ProposalId::camara("1")).is_none());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = StatusCache::new(0);
        cache.insert(ProposalId::camara("1"), snapshot("a"));
        assert!(cache.is_empty());
    }
}
