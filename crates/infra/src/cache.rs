//! Tag-indexed read cache.
//!
//! List endpoints cache their serialized result under a key and one or more
//! tags. Writers never touch the cache directly: they publish a
//! [`BookingEvent`](crate::events::BookingEvent) and the invalidation worker
//! drops every entry carrying one of the event's tags.
//!
//! Entries are stored as `serde_json::Value` so one cache serves every read
//! model. Capacity is bounded; the oldest insertion is evicted first.
//!
//! A reader takes a [`CacheTicket`] before it queries the store and hands it
//! back with the result. If any invalidation ran in between, the result may
//! predate the write that caused it and is not cached.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use tukangin_core::UserId;

/// Every order list (admin dashboard).
pub const TAG_ALL_ORDERS: &str = "orders:all";
pub const TAG_VOUCHERS: &str = "vouchers";
pub const TAG_USERS: &str = "users";
pub const TAG_PROFESSIONALS: &str = "professionals";

/// Orders owned by one customer.
pub fn user_orders_tag(user_id: UserId) -> String {
    format!("orders:user:{user_id}")
}

#[derive(Debug)]
struct Entry {
    value: serde_json::Value,
    tags: Vec<String>,
}

/// Invalidation generation observed before a store read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTicket(u64);

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    entries: HashMap<String, Entry>,
    by_tag: HashMap<String, HashSet<String>>,
    insertion_order: VecDeque<String>,
}

impl Inner {
    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            for tag in entry.tags {
                if let Some(keys) = self.by_tag.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.by_tag.remove(&tag);
                    }
                }
            }
        }
        self.insertion_order.retain(|k| k != key);
    }
}

#[derive(Debug)]
pub struct ReadCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl ReadCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    // A poisoned cache is treated as empty rather than failing the request.
    fn lock(&self) -> Option<MutexGuard<'_, Inner>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("read cache lock poisoned; bypassing cache");
                None
            }
        }
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock()?.entries.get(key)?.value.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(err) => {
                warn!(key, error = %err, "discarding undecodable cache entry");
                self.invalidate_key(key);
                None
            }
        }
    }

    pub fn ticket(&self) -> CacheTicket {
        CacheTicket(self.lock().map(|inner| inner.generation).unwrap_or(u64::MAX))
    }

    /// Cache `value` unless an invalidation happened since `ticket` was taken.
    pub fn put_as<T: Serialize>(&self, ticket: CacheTicket, key: &str, tags: &[&str], value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(err) => {
                warn!(key, error = %err, "skipping cache write");
                return;
            }
        };
        let Some(mut inner) = self.lock() else {
            return;
        };
        if inner.generation != ticket.0 {
            debug!(key, "skipping cache write raced by an invalidation");
            return;
        }

        inner.remove(key);
        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.insertion_order.pop_front() else {
                break;
            };
            inner.remove(&oldest);
        }

        for tag in tags {
            inner
                .by_tag
                .entry((*tag).to_string())
                .or_default()
                .insert(key.to_string());
        }
        inner.insertion_order.push_back(key.to_string());
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                tags: tags.iter().map(|t| (*t).to_string()).collect(),
            },
        );
    }

    /// Drop every entry tagged `tag`. Returns how many were dropped.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let Some(mut inner) = self.lock() else {
            return 0;
        };
        inner.generation = inner.generation.wrapping_add(1);
        let keys: Vec<String> = inner
            .by_tag
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        for key in &keys {
            inner.remove(key);
        }
        keys.len()
    }

    pub fn invalidate_key(&self, key: &str) {
        if let Some(mut inner) = self.lock() {
            inner.generation = inner.generation.wrapping_add(1);
            inner.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidating_a_tag_drops_only_tagged_entries() {
        let cache = ReadCache::new(16);
        let user = UserId::new();
        let user_tag = user_orders_tag(user);

        cache.put_as(cache.ticket(), "orders:list:a", &[user_tag.as_str(), TAG_ALL_ORDERS], &vec![1, 2]);
        cache.put_as(cache.ticket(), "vouchers:list", &[TAG_VOUCHERS], &vec!["HEMAT"]);

        assert_eq!(cache.invalidate_tag(&user_tag), 1);
        assert_eq!(cache.get_as::<Vec<i32>>("orders:list:a"), None);
        assert_eq!(
            cache.get_as::<Vec<String>>("vouchers:list"),
            Some(vec!["HEMAT".to_string()])
        );
        assert_eq!(cache.invalidate_tag(TAG_ALL_ORDERS), 0);
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let cache = ReadCache::new(2);
        cache.put_as(cache.ticket(), "a", &[], &1);
        cache.put_as(cache.ticket(), "b", &[], &2);
        cache.put_as(cache.ticket(), "c", &[], &3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_as::<i32>("a"), None);
        assert_eq!(cache.get_as::<i32>("c"), Some(3));
    }

    #[test]
    fn overwriting_a_key_replaces_its_tags() {
        let cache = ReadCache::new(4);
        cache.put_as(cache.ticket(), "k", &["old"], &1);
        cache.put_as(cache.ticket(), "k", &["new"], &2);

        assert_eq!(cache.invalidate_tag("old"), 0);
        assert_eq!(cache.get_as::<i32>("k"), Some(2));
        assert_eq!(cache.invalidate_tag("new"), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn a_put_raced_by_an_invalidation_is_dropped() {
        let cache = ReadCache::new(4);
        let ticket = cache.ticket();

        // Invalidation lands while the reader is still querying the store.
        cache.invalidate_tag(TAG_PROFESSIONALS);
        cache.put_as(ticket, "professionals:list", &[TAG_PROFESSIONALS], &vec![0]);
        assert_eq!(cache.get_as::<Vec<i32>>("professionals:list"), None);

        cache.put_as(cache.ticket(), "professionals:list", &[TAG_PROFESSIONALS], &vec![1]);
        assert_eq!(cache.get_as::<Vec<i32>>("professionals:list"), Some(vec![1]));
    }
}
