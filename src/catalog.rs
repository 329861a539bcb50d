use std::{collections::HashMap, future::Future, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    clock::Clock,
    ghibli::{FetchError, FilmSource},
    models::Film,
};

pub const DEFAULT_TTL_MS: i64 = 60_000;

const FILMS_KEY: &str = "films";

fn film_key(id: &str) -> String {
    format!("film-{id}")
}

#[derive(Clone)]
enum Payload {
    Films(Arc<Vec<Film>>),
    Film(Arc<Film>),
}

struct CacheEntry {
    payload: Payload,
    expires_at: i64,
}

trait Cached: Sized {
    fn wrap(value: Arc<Self>) -> Payload;
    fn unwrap(payload: &Payload) -> Option<Arc<Self>>;
}

impl Cached for Vec<Film> {
    fn wrap(value: Arc<Self>) -> Payload {
        Payload::Films(value)
    }

    fn unwrap(payload: &Payload) -> Option<Arc<Self>> {
        match payload {
            Payload::Films(films) => Some(films.clone()),
            Payload::Film(_) => None,
        }
    }
}

impl Cached for Film {
    fn wrap(value: Arc<Self>) -> Payload {
        Payload::Film(value)
    }

    fn unwrap(payload: &Payload) -> Option<Arc<Self>> {
        match payload {
            Payload::Film(film) => Some(film.clone()),
            Payload::Films(_) => None,
        }
    }
}

/// TTL cache in front of a [`FilmSource`].
///
/// Lookups are check-then-fetch without holding a lock across the fetch, so
/// callers racing past an expired entry may each hit the upstream source.
/// Entries are replaced wholesale on refetch.
pub struct Catalog {
    source: Arc<dyn FilmSource>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl Catalog {
    pub fn new(source: Arc<dyn FilmSource>, clock: Arc<dyn Clock>, ttl_ms: i64) -> Self {
        Self { source, clock, ttl_ms, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn get_films(&self) -> Result<Arc<Vec<Film>>, FetchError> {
        self.get_films_until(std::future::pending()).await
    }

    pub async fn get_film(&self, id: &str) -> Result<Arc<Film>, FetchError> {
        self.get_film_until(id, std::future::pending()).await
    }

    /// Like [`Catalog::get_films`], but abandons the upstream call as soon as
    /// `cancel` completes.
    pub async fn get_films_until(
        &self,
        cancel: impl Future<Output = ()>,
    ) -> Result<Arc<Vec<Film>>, FetchError> {
        self.fetch_cached(FILMS_KEY.to_string(), self.source.fetch_films(), cancel).await
    }

    pub async fn get_film_until(
        &self,
        id: &str,
        cancel: impl Future<Output = ()>,
    ) -> Result<Arc<Film>, FetchError> {
        self.fetch_cached(film_key(id), self.source.fetch_film(id), cancel).await
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn fetch_cached<T: Cached>(
        &self,
        key: String,
        fetch: impl Future<Output = Result<T, FetchError>>,
        cancel: impl Future<Output = ()>,
    ) -> Result<Arc<T>, FetchError> {
        let now = self.clock.now_ms();

        let hit = self
            .entries
            .read()
            .await
            .get(&key)
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| T::unwrap(&entry.payload));
        if let Some(value) = hit {
            debug!(key = %key, "catalog cache hit");
            return Ok(value);
        }

        debug!(key = %key, "catalog cache miss");
        let value = tokio::select! {
            res = fetch => Arc::new(res?),
            _ = cancel => {
                debug!(key = %key, "catalog fetch cancelled");
                return Err(FetchError::Cancelled);
            }
        };

        self.entries.write().await.insert(
            key,
            CacheEntry { payload: T::wrap(value.clone()), expires_at: now + self.ttl_ms },
        );

        Ok(value)
    }
}
