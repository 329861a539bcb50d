use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub ghibli_base_url: String,
    pub catalog_ttl_ms: i64,
    pub ghibli_rps: u32,
    pub upstream_deadline_ms: u64,
    pub bcrypt_cost: u32,
    pub session_ttl_days: i64,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://ghiblibrary.db?mode=rwc".to_string());

        let ghibli_base_url = std::env::var("GHIBLI_BASE_URL")
            .unwrap_or_else(|_| "https://ghibliapi.vercel.app".to_string());

        let catalog_ttl_ms: i64 =
            std::env::var("CATALOG_TTL_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(60_000);

        let ghibli_rps: u32 =
            std::env::var("GHIBLI_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        let upstream_deadline_ms: u64 = std::env::var("UPSTREAM_DEADLINE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10_000);

        let bcrypt_cost: u32 =
            std::env::var("BCRYPT_COST").ok().and_then(|s| s.parse().ok()).unwrap_or(12);

        let session_ttl_days: i64 =
            std::env::var("SESSION_TTL_DAYS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let secure_cookies = std::env::var("SECURE_COOKIES")
            .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            ghibli_base_url,
            catalog_ttl_ms,
            ghibli_rps,
            upstream_deadline_ms,
            bcrypt_cost,
            session_ttl_days,
            secure_cookies,
        })
    }
}
