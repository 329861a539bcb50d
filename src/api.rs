//! JSON endpoints: favorites and credential-based sessions.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Value, json};
use tracing::warn;

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult},
    models::{CredentialsRequest, FavoriteFilmView, FavoriteRequest},
    routes,
};

fn film_id(payload: Result<Json<FavoriteRequest>, JsonRejection>) -> AppResult<String> {
    let Json(req) = payload?;
    let film_id = req.film_id.trim();
    if film_id.is_empty() {
        return Err(AppError::validation("filmId", "Film id is required"));
    }
    Ok(film_id.to_string())
}

pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<FavoriteFilmView>>> {
    Ok(Json(state.favorites.list(&user).await?))
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<FavoriteRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let film_id = film_id(payload)?;
    state.favorites.add_until(&user, &film_id, routes::deadline(&state)).await?;
    state.favorite_ids.invalidate(user.user_id).await;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<FavoriteRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let film_id = film_id(payload)?;
    state.favorites.remove(&user, &film_id).await?;
    state.favorite_ids.invalidate(user.user_id).await;
    Ok(Json(json!({ "success": true })))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(req) = payload?;
    state.auth.register(&req).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<Value>)> {
    let Json(req) = payload?;
    let (identity, token) = state.auth.login(&req).await?;
    let cookie =
        auth::session_cookie(token, state.auth.session_ttl_days(), state.config.secure_cookies);
    Ok((jar.add(cookie), Json(json!({ "success": true, "email": identity.email }))))
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    if let Some(token) = auth::session_token(&jar) {
        if let Err(err) = state.auth.logout(&token).await {
            warn!(error = %err, "failed to delete session");
        }
    }
    (jar.remove(auth::removal_cookie()), Json(json!({ "success": true })))
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "ok", "catalog_entries": state.catalog.len().await }))
}
