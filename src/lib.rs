pub mod api;
pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod favorite_ids;
pub mod favorites;
pub mod filters;
pub mod ghibli;
pub mod models;
pub mod routes;
pub mod singleflight;
pub mod templates;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    auth::AuthService, catalog::Catalog, clock::Clock, config::Config,
    favorite_ids::FavoriteIdsCache, favorites::FavoritesStore,
};

pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub favorites: FavoritesStore,
    pub favorite_ids: FavoriteIdsCache,
    pub auth: AuthService,
}

impl AppState {
    /// `clock` drives session expiry; pass the same clock the catalog uses.
    pub fn new(
        config: Arc<Config>,
        db: DatabaseConnection,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let auth =
            AuthService::new(db.clone(), config.bcrypt_cost, config.session_ttl_days, clock);
        let favorites = FavoritesStore::new(db, catalog.clone());
        Self { config, catalog, favorites, favorite_ids: FavoriteIdsCache::new(), auth }
    }
}
