// libs/worklist-cell/src/services/cache.rs
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::WorklistError;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, WorklistError>>>;

enum Slot<T: Clone> {
    Loading(SharedFetch<T>),
    Ready(T),
}

struct CacheInner<T: Clone> {
    slots: HashMap<String, (u64, Slot<T>)>,
    generations: HashMap<String, u64>,
}

enum Begin<T: Clone> {
    Ready(T),
    Joined(u64, SharedFetch<T>),
    Started(u64, SharedFetch<T>),
}

/// What a non-blocking lookup found.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Ready(T),
    Loading,
}

/// Per-key lazy cache: one in-flight fetch per key, results kept until the
/// key is invalidated. Invalidation bumps the key's generation so a fetch
/// that started earlier is discarded when it lands.
pub struct LazyCache<T: Clone> {
    inner: Arc<RwLock<CacheInner<T>>>,
}

impl<T: Clone> Clone for LazyCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for LazyCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                slots: HashMap::new(),
                generations: HashMap::new(),
            })),
        }
    }

    pub async fn peek(&self, key: &str) -> Option<Lookup<T>> {
        let inner = self.inner.read().await;
        inner.slots.get(key).map(|(_, slot)| match slot {
            Slot::Ready(value) => Lookup::Ready(value.clone()),
            Slot::Loading(_) => Lookup::Loading,
        })
    }

    /// Returns the cached value, or starts a background fetch and reports
    /// `Loading`. Never waits on the network.
    pub async fn lookup_or_spawn<F>(&self, key: &str, make: F) -> Lookup<T>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, WorklistError>>,
    {
        if let Some(found) = self.peek(key).await {
            return found;
        }

        match self.begin(key, make).await {
            Begin::Ready(value) => Lookup::Ready(value),
            Begin::Joined(..) => Lookup::Loading,
            Begin::Started(generation, fetch) => {
                let cache = self.clone();
                let key = key.to_string();
                tokio::spawn(async move {
                    let result = fetch.await;
                    cache.settle(&key, generation, result).await;
                });
                Lookup::Loading
            }
        }
    }

    /// Waits for the value, joining an in-flight fetch rather than issuing a
    /// second one.
    pub async fn resolve<F>(&self, key: &str, make: F) -> Result<T, WorklistError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, WorklistError>>,
    {
        match self.begin(key, make).await {
            Begin::Ready(value) => Ok(value),
            Begin::Joined(generation, fetch) | Begin::Started(generation, fetch) => {
                let result = fetch.await;
                self.settle(key, generation, result.clone()).await;
                result
            }
        }
    }

    pub async fn invalidate(&self, key: &str) {
        let mut inner = self.inner.write().await;
        inner.slots.remove(key);
        *inner.generations.entry(key.to_string()).or_insert(0) += 1;
        debug!("Invalidated cache entry {}", key);
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        let keys: Vec<String> = inner.slots.keys().cloned().collect();
        for key in keys {
            *inner.generations.entry(key).or_insert(0) += 1;
        }
        inner.slots.clear();
    }

    async fn begin<F>(&self, key: &str, make: F) -> Begin<T>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, WorklistError>>,
    {
        let mut inner = self.inner.write().await;
        match inner.slots.get(key) {
            Some((_, Slot::Ready(value))) => return Begin::Ready(value.clone()),
            Some((generation, Slot::Loading(fetch))) => return Begin::Joined(*generation, fetch.clone()),
            None => {}
        }

        let generation = inner.generations.get(key).copied().unwrap_or(0);
        let fetch = make().shared();
        inner
            .slots
            .insert(key.to_string(), (generation, Slot::Loading(fetch.clone())));
        Begin::Started(generation, fetch)
    }

    async fn settle(&self, key: &str, generation: u64, result: Result<T, WorklistError>) {
        let mut inner = self.inner.write().await;
        let current = inner.generations.get(key).copied().unwrap_or(0);
        if current != generation {
            debug!("Discarding stale fetch for {} (generation {} < {})", key, generation, current);
            return;
        }

        match result {
            Ok(value) => {
                inner.slots.insert(key.to_string(), (generation, Slot::Ready(value)));
            }
            Err(e) => {
                // Forget the failure so the next demand retries.
                warn!("Fetch for {} failed: {}", key, e);
                if matches!(inner.slots.get(key), Some((_, Slot::Loading(_)))) {
                    inner.slots.remove(key);
                }
            }
        }
    }
}
