use std::collections::HashMap;

use jiff::Timestamp;

use crate::{rdb::SnapshotSink, stream::Stream};

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String(String),
    Stream(Stream),
}

impl DataType {
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::String(_) => "string",
            DataType::Stream(_) => "stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub data: DataType,
    pub expiration: Option<Timestamp>,
}

impl Value {
    pub fn string(value: &str) -> Self {
        Self {
            data: DataType::String(value.to_string()),
            expiration: None,
        }
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }
}

/// The whole keyspace. Callers guard it with a single `RwLock`; expired
/// entries are invisible to readers and removed by writers or the sweeper.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: HashMap<String, Value>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let now = Timestamp::now();

        self.entries
            .get(key)
            .filter(|value| !value.is_expired_at(now))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        if self
            .entries
            .get(key)
            .is_some_and(|value| value.is_expired_at(Timestamp::now()))
        {
            self.entries.remove(key);
        }

        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Number of stored keys, expired ones included until they are evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        let now = Timestamp::now();

        self.entries
            .iter()
            .filter(move |(_, value)| !value.is_expired_at(now))
            .map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        let now = Timestamp::now();

        self.entries
            .iter()
            .filter(move |(_, value)| !value.is_expired_at(now))
    }

    /// Removes at most `limit` entries that expired before `now`.
    pub fn evict_expired(&mut self, now: Timestamp, limit: usize) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, value)| value.is_expired_at(now))
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
        }

        expired_keys.len()
    }
}

impl SnapshotSink for KeyValueStore {
    fn reset_with_size_hint(&mut self, size_hint: usize) {
        self.entries = HashMap::with_capacity(size_hint);
    }

    fn set_unchecked(&mut self, key: String, value: String, expiration: Option<Timestamp>) {
        self.entries.insert(
            key,
            Value {
                data: DataType::String(value),
                expiration,
            },
        );
    }
}
