use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OnceCell, OwnedMutexGuard};

use crate::date_key::DateKey;
use crate::store::{StoreError, TaskStoreClient};
use crate::task::DayTaskList;

type Pending = Arc<OnceCell<DayTaskList>>;
type Gate = Arc<tokio::sync::Mutex<()>>;

/// Session-lifetime mirror of the task store, keyed by date.
///
/// Concurrent fetches of one uncached key share a single remote read. Saves
/// update the cache before anything else and reach the store in the same
/// order, one key at a time.
#[derive(Clone)]
pub struct TaskCache {
    inner: Arc<Inner>,
}

struct Inner {
    store: TaskStoreClient,
    entries: Mutex<HashMap<DateKey, DayTaskList>>,
    in_flight: Mutex<HashMap<DateKey, Pending>>,
    write_gates: Mutex<HashMap<DateKey, Gate>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access to one key's writes. The gate is dropped from the map
/// once nobody else holds or waits on it.
struct WriteTurn {
    inner: Arc<Inner>,
    key: DateKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WriteTurn {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut gates = lock(&self.inner.write_gates);
        if gates
            .get(&self.key)
            .is_some_and(|gate| Arc::strong_count(gate) == 1)
        {
            gates.remove(&self.key);
        }
    }
}

impl TaskCache {
    pub fn new(store: TaskStoreClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                entries: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                write_gates: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn get(&self, key: &DateKey) -> Option<DayTaskList> {
        lock(&self.inner.entries).get(key).cloned()
    }

    pub fn contains(&self, key: &DateKey) -> bool {
        lock(&self.inner.entries).contains_key(key)
    }

    /// The cached list, or one read through the store client.
    pub async fn fetch(&self, key: &DateKey) -> DayTaskList {
        if let Some(tasks) = self.get(key) {
            return tasks;
        }

        let pending = {
            let mut in_flight = lock(&self.inner.in_flight);
            // Re-check under the lock: a fetch may have finished in between.
            if let Some(tasks) = self.get(key) {
                return tasks;
            }
            in_flight.entry(key.clone()).or_default().clone()
        };

        let fetched = pending
            .get_or_init(|| self.inner.store.fetch(key))
            .await
            .clone();

        // A save that landed while the read was in flight takes precedence.
        let tasks = lock(&self.inner.entries)
            .entry(key.clone())
            .or_insert(fetched)
            .clone();

        let mut in_flight = lock(&self.inner.in_flight);
        if in_flight.get(key).is_some_and(|p| Arc::ptr_eq(p, &pending)) {
            in_flight.remove(key);
        }

        tasks
    }

    /// Write-through. The cache holds `tasks` even if the store write fails.
    pub async fn save(&self, key: &DateKey, tasks: DayTaskList) -> Result<(), StoreError> {
        lock(&self.inner.entries).insert(key.clone(), tasks);

        let _turn = self.write_turn(key).await;
        self.write_current(key).await
    }

    /// Read-modify-write of one day. `edit` sees the latest list, including
    /// every earlier update of the same key, and returns whether it changed
    /// anything; only a change is written.
    pub async fn update(
        &self,
        key: &DateKey,
        edit: impl FnOnce(&mut DayTaskList) -> bool,
    ) -> Result<(), StoreError> {
        let _turn = self.write_turn(key).await;
        let fetched = self.fetch(key).await;

        let changed = {
            let mut entries = lock(&self.inner.entries);
            edit(entries.entry(key.clone()).or_insert(fetched))
        };

        if !changed {
            return Ok(());
        }
        self.write_current(key).await
    }

    async fn write_turn(&self, key: &DateKey) -> WriteTurn {
        let gate = lock(&self.inner.write_gates)
            .entry(key.clone())
            .or_default()
            .clone();

        WriteTurn {
            inner: self.inner.clone(),
            key: key.clone(),
            guard: Some(gate.lock_owned().await),
        }
    }

    // Sends whatever the cache holds now, so the last write for a key always
    // carries its latest list.
    async fn write_current(&self, key: &DateKey) -> Result<(), StoreError> {
        let tasks = self.get(key).unwrap_or_default();
        self.inner.store.save(key, &tasks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RemoteTaskStore;
    use crate::task::{Task, default_task_texts};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingStore {
        reads: AtomicUsize,
        writes: Mutex<Vec<(DateKey, DayTaskList)>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl RemoteTaskStore for CountingStore {
        async fn get(&self, _key: &DateKey) -> Result<DayTaskList, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(vec![Task::new("Stored")])
        }

        async fn put(&self, key: &DateKey, tasks: &[Task]) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
            }
            lock(&self.writes).push((key.clone(), tasks.to_vec()));
            Ok(())
        }
    }

    fn cache_over(store: Arc<CountingStore>) -> TaskCache {
        TaskCache::new(TaskStoreClient::new(store, default_task_texts()))
    }

    #[tokio::test]
    async fn test_second_fetch_hits_cache() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());
        let key = DateKey::new(19, 9, 2026);

        let first = cache.fetch(&key).await;
        let second = cache.fetch(&key).await;

        assert_eq!(first, second);
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_read() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());
        let key = DateKey::new(20, 9, 2026);

        let (a, b, c) = tokio::join!(cache.fetch(&key), cache.fetch(&key), cache.fetch(&key));

        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(b[0].id, c[0].id);
    }

    #[tokio::test]
    async fn test_different_keys_fetch_separately() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());

        cache.fetch(&DateKey::new(1, 0, 2026)).await;
        cache.fetch(&DateKey::new(2, 0, 2026)).await;

        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_save_then_get_returns_saved_list() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());
        let key = DateKey::new(21, 9, 2026);
        let list = vec![Task::new("Write"), Task::new("Read")];

        cache.save(&key, list.clone()).await.unwrap();

        assert_eq!(cache.get(&key), Some(list.clone()));
        assert_eq!(lock(&store.writes).as_slice(), &[(key, list)]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_cache() {
        let store = Arc::new(CountingStore {
            fail_writes: true,
            ..CountingStore::default()
        });
        let cache = cache_over(store.clone());
        let key = DateKey::new(22, 9, 2026);
        let list = vec![Task::new("Write")];

        let result = cache.save(&key, list.clone()).await;

        assert!(result.is_err());
        assert_eq!(cache.get(&key), Some(list));
    }

    #[tokio::test]
    async fn test_save_skips_remote_read() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());
        let key = DateKey::new(23, 9, 2026);

        cache.save(&key, vec![Task::new("Mine")]).await.unwrap();
        let tasks = cache.fetch(&key).await;

        assert_eq!(tasks[0].text, "Mine");
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_saves_reach_store_in_call_order() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());
        let key = DateKey::new(24, 9, 2026);

        let first = vec![Task::new("one")];
        let second = vec![Task::new("one"), Task::new("two")];

        let (a, b) = tokio::join!(
            cache.save(&key, first.clone()),
            cache.save(&key, second.clone())
        );
        a.unwrap();
        b.unwrap();

        let writes = lock(&store.writes);
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].1, first);
        assert_eq!(writes[1].1, second);
        assert_eq!(cache.get(&key), Some(second));
    }
    #[tokio::test]
    async fn test_concurrent_updates_keep_every_edit() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());
        let key = DateKey::new(25, 9, 2026);

        let add = |text: &'static str| {
            let cache = cache.clone();
            let key = key.clone();
            async move {
                cache
                    .update(&key, |tasks| {
                        tasks.push(Task::new(text));
                        true
                    })
                    .await
            }
        };

        let (a, b) = tokio::join!(add("X"), add("Y"));
        a.unwrap();
        b.unwrap();

        let texts: Vec<String> = cache
            .get(&key)
            .unwrap()
            .into_iter()
            .map(|task| task.text)
            .collect();
        assert_eq!(texts, vec!["Stored", "X", "Y"]);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);

        let writes = lock(&store.writes);
        assert_eq!(writes.last().map(|(_, tasks)| tasks.len()), Some(3));
    }

    #[tokio::test]
    async fn test_unchanged_update_writes_nothing() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());
        let key = DateKey::new(26, 9, 2026);

        cache.update(&key, |_| false).await.unwrap();

        assert!(cache.contains(&key));
        assert!(lock(&store.writes).is_empty());
    }

    #[tokio::test]
    async fn test_write_gates_are_released() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());

        for day in 1..=5 {
            let key = DateKey::new(day, 10, 2026);
            cache.save(&key, vec![Task::new("Write")]).await.unwrap();
            cache
                .update(&key, |tasks| {
                    tasks[0].done = true;
                    true
                })
                .await
                .unwrap();
        }

        assert!(lock(&cache.inner.write_gates).is_empty());
        assert_eq!(lock(&store.writes).len(), 10);
    }
}
