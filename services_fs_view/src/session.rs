//! Per-user session storage
//!
//! Editors drop lock files, backups and thumbnails next to what they edit.
//! Those scratch files are kept here, per user, and never reach the
//! repository. A user's files are dropped after a period of inactivity, and
//! only a bounded number of users is remembered.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use fs_view::{TempStore, ViewConfig};
use log::debug;
use lru::LruCache;

/// Source of time for expiry decisions
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Wall clock
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Scratch files of one user, keyed by full path
#[derive(Debug, Default)]
pub struct UserStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl UserStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of files kept
    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }
}

fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

impl TempStore for UserStorage {
    fn names_under(&self, scope: &str) -> Vec<String> {
        self.files()
            .keys()
            .filter(|path| parent_path(path) == scope)
            .filter_map(|path| path.rsplit('/').next())
            .map(str::to_string)
            .collect()
    }

    fn contains(&self, path: &str) -> bool {
        self.files().contains_key(path)
    }

    fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.files().get(path).cloned()
    }

    fn write(&self, path: &str, data: Vec<u8>) {
        self.files().insert(path.to_string(), data);
    }

    fn remove(&self, path: &str) -> bool {
        self.files().remove(path).is_some()
    }
}

struct Entry {
    storage: Arc<UserStorage>,
    last_access: Duration,
}

/// Bounded, expiring map from user name to [`UserStorage`]
pub struct SessionStore {
    entries: Mutex<LruCache<String, Entry>>,
    max_idle: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(capacity: NonZeroUsize, max_idle: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            max_idle,
            clock,
        }
    }

    /// Creates a store sized from the configuration, on the wall clock
    pub fn from_config(config: &ViewConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Creates a store sized from the configuration, on the given clock
    pub fn with_clock(config: &ViewConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(config.session_capacity).unwrap_or(NonZeroUsize::MIN);
        Self::new(
            capacity,
            Duration::from_secs(config.session_max_idle_secs),
            clock,
        )
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &Entry, now: Duration) -> bool {
        now.saturating_sub(entry.last_access) > self.max_idle
    }

    /// Returns the user's storage, creating it if absent or expired
    ///
    /// Lookup and creation happen under one lock, so concurrent first
    /// requests of a user share one storage.
    pub fn get_or_create(&self, user: &str) -> Arc<UserStorage> {
        let now = self.clock.now();
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(user) {
            if now.saturating_sub(entry.last_access) <= self.max_idle {
                entry.last_access = now;
                return Arc::clone(&entry.storage);
            }
            debug!("session of {} expired", user);
        }

        let storage = Arc::new(UserStorage::new());
        if let Some((evicted, _)) = entries.push(
            user.to_string(),
            Entry {
                storage: Arc::clone(&storage),
                last_access: now,
            },
        ) {
            if evicted != user {
                debug!("session of {} evicted", evicted);
            }
        }
        storage
    }

    /// Returns the user's storage if it is live, without refreshing it
    pub fn get(&self, user: &str) -> Option<Arc<UserStorage>> {
        let now = self.clock.now();
        let entries = self.entries();
        entries
            .peek(user)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| Arc::clone(&entry.storage))
    }

    /// Drops every expired session, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(user, _)| user.clone())
            .collect();
        for user in &expired {
            entries.pop(user);
        }
        expired.len()
    }

    /// Number of sessions held, expired ones included
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
