#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use ghiblibrary::{
    AppState,
    catalog::Catalog,
    clock::ManualClock,
    config::Config,
    db,
    ghibli::{FetchError, FilmSource},
    models::Film,
    routes,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;

pub fn film(id: &str, title: &str, director: &str, producer: &str, year: &str, score: &str) -> Film {
    Film {
        id: id.to_string(),
        title: title.to_string(),
        director: director.to_string(),
        producer: producer.to_string(),
        release_date: year.to_string(),
        rt_score: score.to_string(),
        description: format!("{title} description"),
        ..Film::default()
    }
}

pub fn films() -> Vec<Film> {
    vec![
        film("totoro", "My Neighbor Totoro", "Hayao Miyazaki", "Toru Hara", "1988", "93"),
        film("spirited", "Spirited Away", "Hayao Miyazaki", "Toshio Suzuki", "2001", "97"),
        film("whisper", "Whisper of the Heart", "Yoshifumi Kondō", "Toshio Suzuki", "1995", "91"),
    ]
}

/// Upstream stand-in with a switchable outage.
pub struct FakeSource {
    films: Vec<Film>,
    failing: Mutex<bool>,
    hanging: AtomicBool,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Leaves every later fetch unanswered.
    pub fn set_hanging(&self) {
        self.hanging.store(true, Ordering::SeqCst);
    }

    async fn outage(&self, url: &str) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let failing = *self.failing.lock().unwrap();
        if failing {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
                reason: "Service Unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FilmSource for FakeSource {
    async fn fetch_films(&self) -> Result<Vec<Film>, FetchError> {
        self.outage("/films").await?;
        Ok(self.films.clone())
    }

    async fn fetch_film(&self, id: &str) -> Result<Film, FetchError> {
        let url = format!("/films/{id}");
        self.outage(&url).await?;
        self.films.iter().find(|f| f.id == id).cloned().ok_or(FetchError::Status {
            url,
            status: 404,
            reason: "Not Found".to_string(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub source: Arc<FakeSource>,
    pub clock: Arc<ManualClock>,
}

fn test_config() -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        ghibli_base_url: "http://upstream.invalid".to_string(),
        catalog_ttl_ms: 60_000,
        ghibli_rps: 10,
        upstream_deadline_ms: 5_000,
        bcrypt_cost: 4,
        session_ttl_days: 30,
        secure_cookies: false,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

/// Like [`spawn_app`] with a short upstream deadline.
pub async fn spawn_app_with_deadline(ms: u64) -> TestApp {
    spawn_app_with(Config { upstream_deadline_ms: ms, ..test_config() }).await
}

async fn spawn_app_with(config: Config) -> TestApp {
    let config = Arc::new(config);
    let db = db::connect_and_migrate(&config.database_url).await.unwrap();
    let source = Arc::new(FakeSource {
        films: films(),
        failing: Mutex::new(false),
        hanging: AtomicBool::new(false),
        calls: AtomicUsize::new(0),
    });
    let clock = Arc::new(ManualClock::new(0));
    let catalog = Arc::new(Catalog::new(source.clone(), clock.clone(), config.catalog_ttl_ms));
    let state = Arc::new(AppState::new(config, db.clone(), catalog, clock.clone()));

    TestApp { router: routes::router(state), db, source, clock }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Registers and signs in, returning the `Cookie` header value.
    pub async fn sign_in(&self, email: &str) -> String {
        let body = format!(r#"{{"email":"{email}","password":"correct horse"}}"#);
        let resp = self.send(json_request("POST", "/api/auth/register", None, &body)).await;
        assert_eq!(resp.status(), 200);

        let resp = self.send(json_request("POST", "/api/auth/login", None, &body)).await;
        assert_eq!(resp.status(), 200);
        session_cookie(&resp).expect("login should set a session cookie")
    }
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder =
        Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// `name=value` pair from the response's `Set-Cookie` header.
pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("ghiblibrary_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
