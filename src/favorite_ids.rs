use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    future::Future,
    sync::Arc,
};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::singleflight::SingleFlight;

pub type FilmIds = Arc<HashSet<String>>;

#[derive(Default)]
struct Entries {
    sets: HashMap<i32, FilmIds>,
    /// Bumped on every mutation; a load only caches its result if the
    /// generation it started under is still current.
    generations: HashMap<i32, u64>,
}

impl Entries {
    fn generation(&self, user_id: i32) -> u64 {
        self.generations.get(&user_id).copied().unwrap_or(0)
    }

    fn bump(&mut self, user_id: i32) {
        *self.generations.entry(user_id).or_default() += 1;
    }
}

/// Per-user set of favorited film ids, kept so catalog pages can mark
/// favorites without querying the store on every render.
#[derive(Default)]
pub struct FavoriteIdsCache {
    data: RwLock<Entries>,
    flights: SingleFlight<i32, Option<FilmIds>>,
}

impl FavoriteIdsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached set for `user_id`, loading it through `loader` when absent.
    /// Concurrent loads for one user share a single `loader` call. A failed
    /// load yields an empty set and leaves nothing cached.
    pub async fn load<F, Fut, E>(&self, user_id: i32, loader: F) -> FilmIds
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HashSet<String>, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let generation = {
            let data = self.data.read().await;
            if let Some(ids) = data.sets.get(&user_id) {
                return ids.clone();
            }
            data.generation(user_id)
        };

        let fut = loader();
        let loaded = self
            .flights
            .run(user_id, move || async move {
                match fut.await {
                    Ok(ids) => Some(Arc::new(ids)),
                    Err(err) => {
                        warn!(user_id = user_id, error = %err, "failed to load favorite ids");
                        None
                    },
                }
            })
            .await;

        match loaded {
            Some(ids) => {
                let mut data = self.data.write().await;
                if data.generation(user_id) == generation {
                    debug!(user_id = user_id, count = ids.len(), "loaded favorite ids");
                    data.sets.insert(user_id, ids.clone());
                } else {
                    debug!(user_id = user_id, "favorites changed during load, not caching");
                }
                ids
            },
            None => Arc::new(HashSet::new()),
        }
    }

    /// Applies a confirmed toggle to the cached set, if one is cached.
    pub async fn record(&self, user_id: i32, film_id: &str, favorited: bool) {
        let mut data = self.data.write().await;
        data.bump(user_id);
        let Some(current) = data.sets.get(&user_id) else {
            return;
        };

        let mut updated = HashSet::clone(current);
        if favorited {
            updated.insert(film_id.to_string());
        } else {
            updated.remove(film_id);
        }
        data.sets.insert(user_id, Arc::new(updated));
    }

    pub async fn invalidate(&self, user_id: i32) {
        let mut data = self.data.write().await;
        data.bump(user_id);
        data.sets.remove(&user_id);
    }

    pub async fn cached(&self, user_id: i32) -> Option<FilmIds> {
        self.data.read().await.sets.get(&user_id).cloned()
    }
}
