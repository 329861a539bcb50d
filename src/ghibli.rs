use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use wreq::header::{ACCEPT, USER_AGENT};

use crate::models::Film;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch {url}: {status} {reason}")]
    Status { url: String, status: u16, reason: String },
    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },
    #[error("request to the film catalog was cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }
}

/// Where catalog data comes from. The HTTP client is the production source;
/// tests substitute in-process ones.
#[async_trait]
pub trait FilmSource: Send + Sync {
    async fn fetch_films(&self) -> Result<Vec<Film>, FetchError>;
    async fn fetch_film(&self, id: &str) -> Result<Film, FetchError>;
}

pub struct GhibliClient {
    client: wreq::Client,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl GhibliClient {
    pub fn new(client: wreq::Client, base_url: String, rps: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        Self { client, base_url, limiter }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        self.limiter.until_ready().await;

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        debug!(url = %url, "fetching from upstream catalog");

        let resp = self
            .client
            .get(url.as_str())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, "ghiblibrary/0.1")
            .send()
            .await
            .map_err(|e| FetchError::Transport { url: url.clone(), message: e.to_string() })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| FetchError::Transport { url, message: e.to_string() })
    }
}

#[async_trait]
impl FilmSource for GhibliClient {
    async fn fetch_films(&self) -> Result<Vec<Film>, FetchError> {
        self.fetch_json("/films").await
    }

    async fn fetch_film(&self, id: &str) -> Result<Film, FetchError> {
        self.fetch_json(&format!("/films/{}", urlencoding::encode(id))).await
    }
}
