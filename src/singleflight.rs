use std::{collections::HashMap, future::Future, hash::Hash};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::sync::Mutex;

/// Registry of in-flight loads keyed by resource. Concurrent callers for the
/// same key await one shared future; the entry is dropped once it resolves.
pub struct SingleFlight<K, V: Clone> {
    inflight: Mutex<HashMap<K, Shared<BoxFuture<'static, V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self { inflight: Mutex::new(HashMap::new()) }
    }

    /// Joins the pending load for `key`, or starts one with `load`.
    pub async fn run<F, Fut>(&self, key: K, load: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let flight = {
            let mut inflight = self.inflight.lock().await;
            inflight.entry(key.clone()).or_insert_with(|| load().boxed().shared()).clone()
        };

        let value = flight.clone().await;

        let mut inflight = self.inflight.lock().await;
        if inflight.get(&key).is_some_and(|current| current.ptr_eq(&flight)) {
            inflight.remove(&key);
        }

        value
    }

    pub async fn pending(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
