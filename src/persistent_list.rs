//! Persisted, deduplicated script lists (recently used and favorites).
//!
//! One generic [`PersistentList`] covers both lists; a [`ListPolicy`] decides
//! the storage key, the length bound, what happens when an item is already
//! present, and the name of the timestamp field written next to each
//! snapshot. Every mutation persists immediately and then notifies the
//! registered listeners with the current entries.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::models::Script;
use crate::storage::SharedStore;

pub const RECENT_KEY: &str = "recentScripts";
pub const FAVORITES_KEY: &str = "favoriteScripts";
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Identity used for deduplication.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Script {
    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupMode {
    /// Re-adding moves the entry to the front with a fresh timestamp.
    MoveToFront,
    /// Re-adding is a no-op; new entries are appended.
    KeepFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPolicy {
    pub storage_key: &'static str,
    pub max_len: Option<usize>,
    pub mode: DedupMode,
    pub timestamp_field: &'static str,
}

impl ListPolicy {
    pub fn recent(limit: usize) -> Self {
        Self {
            storage_key: RECENT_KEY,
            max_len: Some(limit),
            mode: DedupMode::MoveToFront,
            timestamp_field: "lastUsed",
        }
    }

    pub fn favorites() -> Self {
        Self {
            storage_key: FAVORITES_KEY,
            max_len: None,
            mode: DedupMode::KeepFirst,
            timestamp_field: "favorited",
        }
    }
}

/// A snapshot taken at insertion time plus the moment it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry<T> {
    pub item: T,
    pub stamp: DateTime<Utc>,
}

impl<T: Keyed> ListEntry<T> {
    pub fn key(&self) -> &str {
        self.item.key()
    }
}

type Listener<T> = Box<dyn FnMut(&[ListEntry<T>])>;
type Clock = Box<dyn Fn() -> DateTime<Utc>>;

pub struct PersistentList<T> {
    policy: ListPolicy,
    store: SharedStore,
    entries: Vec<ListEntry<T>>,
    index: HashMap<String, usize>,
    listeners: Vec<Listener<T>>,
    clock: Clock,
}

impl<T> fmt::Debug for PersistentList<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentList")
            .field("policy", &self.policy)
            .field("entries", &self.entries)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> PersistentList<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned,
{
    /// Opens the list and loads whatever the store currently holds.
    pub fn open(policy: ListPolicy, store: SharedStore) -> Self {
        Self::open_with_clock(policy, store, Utc::now)
    }

    pub fn open_with_clock(
        policy: ListPolicy,
        store: SharedStore,
        clock: impl Fn() -> DateTime<Utc> + 'static,
    ) -> Self {
        let mut list = Self {
            policy,
            store,
            entries: Vec::new(),
            index: HashMap::new(),
            listeners: Vec::new(),
            clock: Box::new(clock),
        };
        list.entries = list.load();
        list.reindex();
        list
    }

    pub fn policy(&self) -> &ListPolicy {
        &self.policy
    }

    /// Reads the stored list. Missing or malformed content yields an empty list.
    pub fn load(&self) -> Vec<ListEntry<T>> {
        let raw = match self.store.read(self.policy.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = self.policy.storage_key, "No stored list, starting empty");
                return Vec::new();
            }
            Err(err) => {
                warn!(key = self.policy.storage_key, error = %err, "Failed to read stored list");
                return Vec::new();
            }
        };

        let records: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                warn!(key = self.policy.storage_key, error = %err, "Stored list is malformed, ignoring");
                return Vec::new();
            }
        };

        let mut entries: Vec<ListEntry<T>> = Vec::with_capacity(records.len());
        for record in records {
            match self.decode_entry(record) {
                Some(entry) => {
                    if !entries.iter().any(|e| e.key() == entry.key()) {
                        entries.push(entry);
                    }
                }
                None => warn!(key = self.policy.storage_key, "Skipping malformed list record"),
            }
        }
        if let Some(max) = self.policy.max_len {
            entries.truncate(max);
        }

        info!(key = self.policy.storage_key, count = entries.len(), "Loaded stored list");
        entries
    }

    /// Writes the current entries. Failures are logged and otherwise ignored.
    pub fn save(&self) {
        if let Err(err) = self.try_save() {
            warn!(key = self.policy.storage_key, error = %err, "Failed to persist list");
        }
    }

    fn try_save(&self) -> Result<(), StorageError> {
        let records = self
            .entries
            .iter()
            .map(|entry| self.encode_entry(entry))
            .collect::<Result<Vec<_>, _>>()?;
        let json = serde_json::to_string(&records)?;
        self.store.write(self.policy.storage_key, &json)
    }

    fn encode_entry(&self, entry: &ListEntry<T>) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(&entry.item)?;
        if let Value::Object(map) = &mut value {
            map.insert(
                self.policy.timestamp_field.to_string(),
                Value::String(entry.stamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        Ok(value)
    }

    fn decode_entry(&self, record: Value) -> Option<ListEntry<T>> {
        let Value::Object(mut map) = record else {
            return None;
        };
        let stamp = map
            .remove(self.policy.timestamp_field)
            .and_then(|v| v.as_str().map(str::to_owned))
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())?
            .with_timezone(&Utc);
        let item = serde_json::from_value(Value::Object(map)).ok()?;
        Some(ListEntry { item, stamp })
    }

    /// Adds a snapshot according to the list's dedup mode.
    ///
    /// Returns `false` when nothing changed.
    pub fn add(&mut self, item: T) -> bool {
        let stamp = (self.clock)();
        match self.policy.mode {
            DedupMode::MoveToFront => {
                let key = item.key().to_string();
                self.entries.retain(|e| e.key() != key);
                self.entries.insert(0, ListEntry { item, stamp });
                if let Some(max) = self.policy.max_len {
                    self.entries.truncate(max);
                }
            }
            DedupMode::KeepFirst => {
                if self.contains(item.key()) {
                    return false;
                }
                if self.policy.max_len.is_some_and(|max| self.entries.len() >= max) {
                    debug!(key = self.policy.storage_key, "List is full, ignoring add");
                    return false;
                }
                self.entries.push(ListEntry { item, stamp });
            }
        }
        self.commit();
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key() != key);
        let removed = self.entries.len() != before;
        self.commit();
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.commit();
    }

    /// Removes `item` if present, adds it otherwise. Returns the new membership.
    pub fn toggle(&mut self, item: T) -> bool {
        let key = item.key().to_string();
        if self.contains(&key) {
            self.remove(&key);
            false
        } else {
            self.add(item)
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ListEntry<T>> {
        self.index.get(key).and_then(|&i| self.entries.get(i))
    }

    pub fn entries(&self) -> &[ListEntry<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a callback invoked with the entries after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&[ListEntry<T>]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn commit(&mut self) {
        self.reindex();
        self.save();
        for listener in &mut self.listeners {
            listener(&self.entries);
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key().to_string(), i))
            .collect();
    }
}
