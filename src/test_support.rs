use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::{
    auth::Identity,
    catalog::{Catalog, DEFAULT_TTL_MS},
    clock::ManualClock,
    db,
    entities::user,
    ghibli::{FetchError, FilmSource},
    models::Film,
};

pub(crate) use crate::filters::tests::fixture;

pub(crate) async fn memory_db() -> DatabaseConnection {
    db::connect_and_migrate("sqlite::memory:").await.unwrap()
}

pub(crate) fn catalog(source: Arc<StaticSource>) -> Arc<Catalog> {
    Arc::new(Catalog::new(source, Arc::new(ManualClock::new(0)), DEFAULT_TTL_MS))
}

pub(crate) async fn insert_user(db: &DatabaseConnection, email: &str) -> Identity {
    let row = user::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set("unused".to_string()),
        created_at: Set(0),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    Identity { user_id: row.id, email: row.email }
}

/// In-process catalog with call counters and switchable failures.
pub(crate) struct StaticSource {
    films: Mutex<Vec<Film>>,
    fail_with: Mutex<Option<u16>>,
    hang: AtomicBool,
    film_calls: AtomicUsize,
}

impl StaticSource {
    pub(crate) fn new(films: Vec<Film>) -> Self {
        Self {
            films: Mutex::new(films),
            fail_with: Mutex::new(None),
            hang: AtomicBool::new(false),
            film_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fail_with(&self, status: u16) {
        *self.fail_with.lock().unwrap() = Some(status);
    }

    pub(crate) fn rename(&self, id: &str, title: &str) {
        for film in self.films.lock().unwrap().iter_mut().filter(|f| f.id == id) {
            film.title = title.to_string();
        }
    }

    /// Makes every later fetch wait forever.
    pub(crate) fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub(crate) fn film_calls(&self) -> usize {
        self.film_calls.load(Ordering::SeqCst)
    }

    async fn check(&self, url: &str) -> Result<(), FetchError> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let fail_with = *self.fail_with.lock().unwrap();
        match fail_with {
            Some(status) => Err(FetchError::Status {
                url: url.to_string(),
                status,
                reason: "Service Unavailable".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FilmSource for StaticSource {
    async fn fetch_films(&self) -> Result<Vec<Film>, FetchError> {
        self.check("/films").await?;
        Ok(self.films.lock().unwrap().clone())
    }

    async fn fetch_film(&self, id: &str) -> Result<Film, FetchError> {
        self.film_calls.fetch_add(1, Ordering::SeqCst);
        let url = format!("/films/{id}");
        self.check(&url).await?;
        self.films.lock().unwrap().iter().find(|f| f.id == id).cloned().ok_or(
            FetchError::Status { url, status: 404, reason: "Not Found".to_string() },
        )
    }
}
