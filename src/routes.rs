use std::{collections::HashSet, sync::Arc, time::Duration};

use axum::{
    Form, Router,
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::{Query, cookie::CookieJar};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    AppState, api,
    auth::{self, CurrentUser, Identity},
    error::AppError,
    favorite_ids::FilmIds,
    filters,
    ghibli::FetchError,
    models::{CatalogQuery, CredentialsRequest, FavoriteFilmView, Film, FilmFilters},
    templates::{self, CatalogView},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/film/{id}", get(film_detail))
        .route("/film/{id}/favorite", post(toggle_favorite))
        .route("/favorites", get(favorites))
        .route("/login", get(login_form).post(login_submit))
        .route("/register", get(register_form).post(register_submit))
        .route("/logout", post(logout_submit))
        .route("/healthz", get(api::healthz))
        .route(
            "/api/favorites",
            get(api::list_favorites).post(api::add_favorite).delete(api::remove_favorite),
        )
        .route("/api/auth/register", post(api::register))
        .route("/api/auth/login", post(api::login))
        .route("/api/auth/logout", post(api::logout))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

/// Cancellation signal for upstream catalog calls made on behalf of a request.
pub(crate) fn deadline(state: &AppState) -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(state.config.upstream_deadline_ms))
}

async fn favorite_ids(state: &AppState, user: Option<&Identity>) -> FilmIds {
    let Some(user) = user else {
        return Arc::new(HashSet::new());
    };
    let store = state.favorites.clone();
    let user_id = user.user_id;
    state.favorite_ids.load(user_id, move || async move { store.film_ids(user_id).await }).await
}

fn film_href(id: &str) -> String {
    format!("/film/{}", urlencoding::encode(id))
}

fn upstream_error(user: Option<&Identity>, err: &FetchError, retry: &Uri) -> Response {
    warn!(error = %err, "upstream catalog request failed");
    let status = match err {
        FetchError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Html(templates::error_page(user, &err.to_string(), &retry.to_string()))).into_response()
}

fn app_error_page(user: Option<&Identity>, err: &AppError, retry: &str) -> Response {
    (err.status(), Html(templates::error_page(user, &err.public_message(), retry))).into_response()
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    uri: Uri,
    Query(query): Query<CatalogQuery>,
) -> Response {
    let filters = FilmFilters::from(query);

    let films = match state.catalog.get_films_until(deadline(&state)).await {
        Ok(films) => films,
        Err(err) => return upstream_error(user.as_ref(), &err, &uri),
    };

    let options = filters::get_filter_options(&films);
    let (total_matches, page) = filters::catalog_view(&films, &filters);
    let favorite_ids = favorite_ids(&state, user.as_ref()).await;

    let view = CatalogView {
        page: &page,
        total_matches,
        filters: &filters,
        options: &options,
        favorite_ids: &favorite_ids,
    };
    Html(templates::catalog_page(user.as_ref(), &view)).into_response()
}

pub async fn film_detail(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    uri: Uri,
    Path(id): Path<String>,
) -> Response {
    let film = match state.catalog.get_film_until(&id, deadline(&state)).await {
        Ok(film) if !film.id.is_empty() => film,
        Ok(_) => return not_found(user.as_ref()),
        Err(err) if err.is_not_found() => return not_found(user.as_ref()),
        Err(err) => return upstream_error(user.as_ref(), &err, &uri),
    };

    let is_favorite = favorite_ids(&state, user.as_ref()).await.contains(&id);
    Html(templates::film_page(user.as_ref(), &film, is_favorite)).into_response()
}

fn not_found(user: Option<&Identity>) -> Response {
    (StatusCode::NOT_FOUND, Html(templates::not_found_page(user))).into_response()
}

/// Flips the favorite state of a film for the signed-in user. The cached id
/// set only changes once the store has confirmed the mutation.
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Response {
    let Some(user) = user else {
        return Redirect::to("/login").into_response();
    };

    let favorited = favorite_ids(&state, Some(&user)).await.contains(&id);
    let result = if favorited {
        state.favorites.remove(&user, &id).await
    } else {
        state.favorites.add_until(&user, &id, deadline(&state)).await
    };

    match result {
        Ok(()) => {
            state.favorite_ids.record(user.user_id, &id, !favorited).await;
            Redirect::to(&film_href(&id)).into_response()
        },
        Err(AppError::FilmNotFound) => not_found(Some(&user)),
        Err(err) => {
            warn!(user_id = user.user_id, film_id = %id, error = %err, "failed to toggle favorite");
            app_error_page(Some(&user), &err, &film_href(&id))
        },
    }
}

pub async fn favorites(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Response {
    let Some(user) = user else {
        return Redirect::to("/login").into_response();
    };

    match state.favorites.list(&user).await {
        Ok(list) => {
            let films: Vec<Film> = list.iter().map(FavoriteFilmView::to_film).collect();
            Html(templates::favorites_page(Some(&user), &films)).into_response()
        },
        Err(err) => app_error_page(Some(&user), &err, "/favorites"),
    }
}

pub async fn login_form(CurrentUser(user): CurrentUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(templates::login_page(None)).into_response()
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(req): Form<CredentialsRequest>,
) -> Response {
    match state.auth.login(&req).await {
        Ok((_, token)) => {
            let cookie = auth::session_cookie(
                token,
                state.auth.session_ttl_days(),
                state.config.secure_cookies,
            );
            (jar.add(cookie), Redirect::to("/")).into_response()
        },
        Err(err) => {
            (err.status(), Html(templates::login_page(Some(&err.public_message())))).into_response()
        },
    }
}

pub async fn register_form(CurrentUser(user): CurrentUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(templates::register_page(None)).into_response()
}

/// Registers and signs the new user in straight away.
pub async fn register_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(req): Form<CredentialsRequest>,
) -> Response {
    let result = async {
        state.auth.register(&req).await?;
        state.auth.login(&req).await
    }
    .await;

    match result {
        Ok((_, token)) => {
            let cookie = auth::session_cookie(
                token,
                state.auth.session_ttl_days(),
                state.config.secure_cookies,
            );
            (jar.add(cookie), Redirect::to("/")).into_response()
        },
        Err(err) => {
            (err.status(), Html(templates::register_page(Some(&err.public_message()))))
                .into_response()
        },
    }
}

pub async fn logout_submit(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(token) = auth::session_token(&jar) {
        if let Err(err) = state.auth.logout(&token).await {
            warn!(error = %err, "failed to delete session");
        }
    }
    (jar.remove(auth::removal_cookie()), Redirect::to("/")).into_response()
}
