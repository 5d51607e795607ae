use std::collections::HashMap;

use jiff::Timestamp;

use crate::types::{Deque, SortedSet, Stream};

/// The value kinds a key can hold. Kind is fixed for the lifetime of a key;
/// commands targeting the wrong kind see the key as absent or get a typed
/// error from their handler.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String(String),
    List(Deque),
    Stream(Stream),
    SortedSet(SortedSet),
}

impl DataType {
    /// The name TYPE reports for this kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DataType::String(_) => "string",
            DataType::List(_) => "list",
            DataType::Stream(_) => "stream",
            DataType::SortedSet(_) => "zset",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub data: DataType,
    pub expires_at: Option<Timestamp>,
}

impl Value {
    pub fn string(content: impl Into<String>) -> Self {
        Self {
            data: DataType::String(content.into()),
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// The keyspace. Owned exclusively by the dispatch loop; `&mut` access makes
/// every read-modify-write atomic without locking. Expiry is lazy: a load
/// that observes a dead TTL deletes the entry and reports it absent; there
/// is no background sweeper.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: HashMap<String, Value>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditional replace; any prior TTL goes with the old value.
    pub fn store(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn load(&mut self, key: &str) -> Option<&Value> {
        self.expire_if_due(key);
        self.entries.get(key)
    }

    pub fn load_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.expire_if_due(key);
        self.entries.get_mut(key)
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Atomic read-modify-write: `apply` sees the current value (or `None`)
    /// and returns the replacement, which keeps whatever TTL it carries.
    pub fn update<F>(&mut self, key: &str, apply: F) -> &Value
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        self.expire_if_due(key);
        let updated = apply(self.entries.get(key));
        self.entries.insert(key.to_string(), updated);
        &self.entries[key]
    }

    /// Snapshot of live keys; expired entries are purged on the way.
    pub fn keys(&mut self) -> Vec<String> {
        let now = Timestamp::now();
        self.entries.retain(|_, value| !value.is_expired(now));
        self.entries.keys().cloned().collect()
    }

    pub fn get_string(&mut self, key: &str) -> Option<&str> {
        match self.load(key)?.data {
            DataType::String(ref content) => Some(content),
            _ => None,
        }
    }

    pub fn get_list(&mut self, key: &str) -> Option<&mut Deque> {
        match self.load_mut(key)?.data {
            DataType::List(ref mut list) => Some(list),
            _ => None,
        }
    }

    pub fn get_stream(&mut self, key: &str) -> Option<&mut Stream> {
        match self.load_mut(key)?.data {
            DataType::Stream(ref mut stream) => Some(stream),
            _ => None,
        }
    }

    pub fn get_sorted_set(&mut self, key: &str) -> Option<&mut SortedSet> {
        match self.load_mut(key)?.data {
            DataType::SortedSet(ref mut set) => Some(set),
            _ => None,
        }
    }

    /// Insert-if-absent for list auto-creation. Returns `None` when the key
    /// holds a different kind.
    pub fn load_or_store_list(&mut self, key: &str) -> Option<&mut Deque> {
        match self
            .entry_or_insert(key, || DataType::List(Deque::new()))
            .data
        {
            DataType::List(ref mut list) => Some(list),
            _ => None,
        }
    }

    pub fn load_or_store_stream(&mut self, key: &str) -> Option<&mut Stream> {
        match self
            .entry_or_insert(key, || DataType::Stream(Stream::new()))
            .data
        {
            DataType::Stream(ref mut stream) => Some(stream),
            _ => None,
        }
    }

    pub fn load_or_store_sorted_set(&mut self, key: &str) -> Option<&mut SortedSet> {
        match self
            .entry_or_insert(key, || DataType::SortedSet(SortedSet::new()))
            .data
        {
            DataType::SortedSet(ref mut set) => Some(set),
            _ => None,
        }
    }

    fn entry_or_insert<F>(&mut self, key: &str, default: F) -> &mut Value
    where
        F: FnOnce() -> DataType,
    {
        self.expire_if_due(key);

        self.entries.entry(key.to_string()).or_insert_with(|| Value {
            data: default(),
            expires_at: None,
        })
    }

    fn expire_if_due(&mut self, key: &str) {
        let now = Timestamp::now();
        if self
            .entries
            .get(key)
            .is_some_and(|value| value.is_expired(now))
        {
            self.entries.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::{SignedDuration, Timestamp};

    #[test]
    fn test_store_and_load() {
        let mut store = KeyValueStore::new();

        store.store("key", Value::string("value"));
        assert_eq!(store.get_string("key"), Some("value"));
        assert_eq!(store.get_string("missing"), None);
    }

    #[test]
    fn test_expired_load_deletes_entry() {
        let mut store = KeyValueStore::new();
        store.store(
            "doomed",
            Value {
                data: DataType::String("x".to_string()),
                expires_at: Some(Timestamp::now() - SignedDuration::from_secs(1)),
            },
        );

        assert!(store.load("doomed").is_none());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_keys_skips_expired_entries() {
        let mut store = KeyValueStore::new();
        store.store("alive", Value::string("1"));
        store.store(
            "dead",
            Value {
                data: DataType::String("2".to_string()),
                expires_at: Some(Timestamp::now() - SignedDuration::from_secs(1)),
            },
        );

        assert_eq!(store.keys(), vec!["alive".to_string()]);
    }

    #[test]
    fn test_typed_accessor_mismatch_reports_absent() {
        let mut store = KeyValueStore::new();
        store.store("text", Value::string("hello"));

        assert!(store.get_list("text").is_none());
        assert!(store.get_stream("text").is_none());
        assert!(store.get_sorted_set("text").is_none());
        assert_eq!(store.get_string("text"), Some("hello"));
    }

    #[test]
    fn test_load_or_store_list_auto_creates() {
        let mut store = KeyValueStore::new();

        let list = store.load_or_store_list("fresh").unwrap();
        list.push_back(["item"]);

        assert_eq!(store.get_list("fresh").unwrap().len(), 1);

        // Existing key of another kind is not clobbered.
        store.store("text", Value::string("hello"));
        assert!(store.load_or_store_list("text").is_none());
        assert_eq!(store.get_string("text"), Some("hello"));
    }

    #[test]
    fn test_update_replaces_value() {
        let mut store = KeyValueStore::new();

        store.update("counter", |current| {
            assert!(current.is_none());
            Value::string("1")
        });

        let updated = store.update("counter", |current| {
            let DataType::String(ref count) = current.unwrap().data else {
                panic!("expected string");
            };
            Value::string(format!("{}", count.parse::<i64>().unwrap() + 1))
        });

        assert_eq!(updated.data, DataType::String("2".to_string()));
    }

    #[test]
    fn test_store_discards_old_ttl() {
        let mut store = KeyValueStore::new();
        store.store(
            "key",
            Value {
                data: DataType::String("old".to_string()),
                expires_at: Some(Timestamp::now() + SignedDuration::from_secs(100)),
            },
        );

        store.store("key", Value::string("new"));
        assert!(store.load("key").unwrap().expires_at.is_none());
    }
}
