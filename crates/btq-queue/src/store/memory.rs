//! In-process store for local development and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::TaskStore;
use crate::error::{QueueError, QueueResult};

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

#[derive(Default)]
struct MemoryState {
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    deadlines: HashMap<String, DateTime<Utc>>,
    /// Shifts the store's notion of "now" so expiry can be exercised.
    clock_offset: chrono::Duration,
}

impl MemoryState {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.clock_offset
    }

    fn purge_if_expired(&mut self, key: &str) {
        let now = self.now();
        if self.deadlines.get(key).is_some_and(|deadline| *deadline <= now) {
            self.deadlines.remove(key);
            self.lists.remove(key);
            self.hashes.remove(key);
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.lists.contains_key(key) || self.hashes.contains_key(key)
    }
}

/// Store backed by process memory. Every command takes a single lock, so
/// `rpop` is atomic exactly like the real thing.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the store clock forward, expiring keys whose deadline passes.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        let by = to_chrono(by);
        state.clock_offset = state.clock_offset + by;
    }

    /// Remaining time-to-live of a key, if it has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut state = self.lock();
        state.purge_if_expired(key);
        let now = state.now();
        state
            .deadlines
            .get(key)
            .and_then(|deadline| (*deadline - now).to_std().ok())
    }

    /// Snapshot of a list, left end first.
    pub fn list(&self, key: &str) -> Vec<String> {
        let mut state = self.lock();
        state.purge_if_expired(key);
        state
            .lists
            .get(key)
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn rpop(&self, list: &str) -> QueueResult<Option<String>> {
        let mut state = self.lock();
        state.purge_if_expired(list);
        let Some(items) = state.lists.get_mut(list) else {
            return Ok(None);
        };
        let value = items.pop_back();
        if items.is_empty() {
            state.lists.remove(list);
            state.deadlines.remove(list);
        }
        Ok(value)
    }

    async fn lpush(&self, list: &str, value: &str) -> QueueResult<()> {
        let mut state = self.lock();
        state.purge_if_expired(list);
        if state.hashes.contains_key(list) {
            return Err(QueueError::Store(format!("WRONGTYPE {} is not a list", list)));
        }
        state
            .lists
            .entry(list.to_string())
            .or_default()
            .push_front(value.to_string());
        Ok(())
    }

    async fn llen(&self, list: &str) -> QueueResult<u64> {
        let mut state = self.lock();
        state.purge_if_expired(list);
        Ok(state.lists.get(list).map(|items| items.len() as u64).unwrap_or(0))
    }

    async fn hgetall(&self, key: &str) -> QueueResult<HashMap<String, String>> {
        let mut state = self.lock();
        state.purge_if_expired(key);
        if state.lists.contains_key(key) {
            return Err(QueueError::Store(format!("WRONGTYPE {} is not a hash", key)));
        }
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> QueueResult<()> {
        if fields.is_empty() {
            return Err(QueueError::Store("wrong number of arguments for HSET".into()));
        }
        let mut state = self.lock();
        state.purge_if_expired(key);
        if state.lists.contains_key(key) {
            return Err(QueueError::Store(format!("WRONGTYPE {} is not a hash", key)));
        }
        let hash = state.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> QueueResult<()> {
        let mut state = self.lock();
        state.purge_if_expired(key);
        if !state.exists(key) {
            return Ok(());
        }
        let deadline = state
            .now()
            .checked_add_signed(to_chrono(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        state.deadlines.insert(key.to_string(), deadline);
        Ok(())
    }

    async fn ping(&self) -> QueueResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
