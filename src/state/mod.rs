//! Session-scoped shared state - versioned key/value store with snapshots.
//!
//! Every execution session owns one [`StateStore`]. Work units communicate
//! through it: a unit reads an immutable [`StateSnapshot`] taken at its
//! invocation start and returns a [`StateDelta`] of the writes it requests.
//! The invoking side applies each delta as one atomic batch, so a unit never
//! observes a sibling's half-applied writes.
//!
//! Keys map to arbitrary structured values (`serde_json::Value`): text,
//! numbers, booleans, lists, and nested mappings. A missing key is not an
//! error - `get` returns `None` and callers decide their own defaults.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// An ordered batch of state writes requested by a single work unit step.
///
/// Within one batch the last write to a key wins. Batches from concurrent
/// units are never merged here; the parallel composite detects same-key
/// writes and reports them as conflicts instead of resolving an order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    entries: BTreeMap<String, Value>,
}

impl StateDelta {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batch containing a single write.
    pub fn of(key: impl Into<String>, value: Value) -> Self {
        let mut delta = Self::new();
        delta.insert(key, value);
        delta
    }

    /// Add a write to the batch. A later write to the same key replaces the
    /// earlier one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Fold another batch into this one, later writes winning.
    pub fn merge(&mut self, other: &StateDelta) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Get the value this batch writes for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Whether the batch writes `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys written by this batch, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Iterate over the writes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys written.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for StateDelta {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// An immutable view of the store taken at a point in time.
///
/// Snapshots are cheap to clone (the entry map is shared) and never change,
/// even if the store is mutated afterwards. Composites thread causally
/// ordered views through their children by overlaying each child's batch on
/// the previous view.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    entries: Arc<HashMap<String, Value>>,
    version: u64,
}

impl StateSnapshot {
    /// An empty view, as handed to a unit invoked as a tool with explicit
    /// arguments instead of ambient state.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read a value. `None` means the key is absent, not an error.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Whether the view contains `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Store version this view was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of keys visible.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A new view with `delta` laid over this one. The store itself is not
    /// touched; this is how composites give child *k* causal visibility of
    /// children `1..k-1`.
    pub fn overlay(&self, delta: &StateDelta) -> StateSnapshot {
        if delta.is_empty() {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        for (key, value) in delta.iter() {
            entries.insert(key.to_string(), value.clone());
        }
        Self {
            entries: Arc::new(entries),
            version: self.version,
        }
    }

    /// Copy the visible entries into an owned map, e.g. for a host that
    /// persists state between turns as an opaque document.
    pub fn to_map(&self) -> HashMap<String, Value> {
        (*self.entries).clone()
    }
}

/// One applied batch, as recorded in the store journal.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    /// Store version after the batch was applied.
    pub version: u64,
    /// Name of the unit (or `"set"` for direct writes) that produced it.
    pub source: String,
    /// Keys the batch wrote.
    pub keys: Vec<String>,
}

/// The shared key/value mapping for one execution session.
///
/// Created empty (or from an initial map) at session start, mutated through
/// the session by applied batches, and discarded with the session. Each
/// applied batch bumps a version counter and leaves a [`BatchRecord`] in the
/// journal.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, Value>,
    version: u64,
    journal: Vec<BatchRecord>,
}

impl StateStore {
    /// Create an empty store at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with initial entries, still at version 0.
    pub fn with_initial(entries: HashMap<String, Value>) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                entries,
                version: 0,
                journal: Vec::new(),
            }),
        }
    }

    /// Read a single value. `None` means absent.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().await.entries.get(key).cloned()
    }

    /// Write a single value directly. Equivalent to applying a one-key batch
    /// with source `"set"`.
    pub async fn set(&self, key: impl Into<String>, value: Value) -> u64 {
        self.apply(&StateDelta::of(key, value), "set").await
    }

    /// Apply a batch atomically, bumping the version once and recording the
    /// batch in the journal. Returns the new version.
    pub async fn apply(&self, delta: &StateDelta, source: &str) -> u64 {
        let mut inner = self.inner.write().await;
        for (key, value) in delta.iter() {
            inner.entries.insert(key.to_string(), value.clone());
        }
        inner.version += 1;
        let version = inner.version;
        inner.journal.push(BatchRecord {
            version,
            source: source.to_string(),
            keys: delta.keys().map(str::to_string).collect(),
        });
        version
    }

    /// Take an immutable snapshot of the current state.
    pub async fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.read().await;
        StateSnapshot {
            entries: Arc::new(inner.entries.clone()),
            version: inner.version,
        }
    }

    /// Current store version (number of batches applied).
    pub async fn version(&self) -> u64 {
        self.inner.read().await.version
    }

    /// Copy of the applied-batch journal.
    pub async fn journal(&self) -> Vec<BatchRecord> {
        self.inner.read().await.journal.clone()
    }
}
