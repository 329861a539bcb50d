use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use cookie::{Cookie, SameSite};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use tracing::{debug, info};

use crate::{
    AppState,
    clock::Clock,
    entities::{session, user},
    error::{AppError, AppResult},
    models::CredentialsRequest,
};

pub const SESSION_COOKIE: &str = "ghiblibrary_session";
pub const MIN_PASSWORD_LEN: usize = 8;

/// A signed-in user, resolved from the session cookie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub email: String,
}

#[derive(Clone)]
pub struct AuthService {
    db: DatabaseConnection,
    bcrypt_cost: u32,
    session_ttl_days: i64,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        db: DatabaseConnection,
        bcrypt_cost: u32,
        session_ttl_days: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { db, bcrypt_cost, session_ttl_days, clock }
    }

    fn now_sec(&self) -> i64 {
        self.clock.now_ms().div_euclid(1000)
    }

    pub fn session_ttl_days(&self) -> i64 {
        self.session_ttl_days
    }

    pub async fn register(&self, req: &CredentialsRequest) -> AppResult<Identity> {
        let email = normalize_email(&req.email);
        validate_email(&email)?;
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        let existing =
            user::Entity::find().filter(user::Column::Email.eq(email.as_str())).one(&self.db).await?;
        if existing.is_some() {
            return Err(AppError::EmailTaken);
        }

        let password = req.password.clone();
        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(anyhow::Error::from)??;

        let model = user::ActiveModel {
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            created_at: Set(self.now_sec()),
            ..Default::default()
        };

        let created = match model.insert(&self.db).await {
            Ok(created) => created,
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(AppError::EmailTaken);
            },
            Err(err) => return Err(err.into()),
        };

        info!(user_id = created.id, "registered user");
        Ok(Identity { user_id: created.id, email: created.email })
    }

    /// Verifies credentials and opens a session. Returns the identity and
    /// the session token to hand back as a cookie.
    pub async fn login(&self, req: &CredentialsRequest) -> AppResult<(Identity, String)> {
        let email = normalize_email(&req.email);
        if email.is_empty() || req.password.is_empty() {
            return Err(AppError::InvalidCredentials);
        }

        let Some(found) =
            user::Entity::find().filter(user::Column::Email.eq(email.as_str())).one(&self.db).await?
        else {
            debug!("login for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let password = req.password.clone();
        let hash = found.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(anyhow::Error::from)??;
        if !valid {
            debug!(user_id = found.id, "login with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let token = uuid::Uuid::new_v4().to_string();
        let now = self.now_sec();
        session::ActiveModel {
            token: Set(token.clone()),
            user_id: Set(found.id),
            expires_at: Set(now + self.session_ttl_days * 86_400),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(user_id = found.id, "user signed in");
        Ok((Identity { user_id: found.id, email: found.email }, token))
    }

    pub async fn logout(&self, token: &str) -> AppResult<()> {
        session::Entity::delete_by_id(token.to_string()).exec(&self.db).await?;
        Ok(())
    }

    /// Identity behind a session token; expired or unknown tokens resolve to
    /// `None`.
    pub async fn resolve(&self, token: &str) -> AppResult<Option<Identity>> {
        if token.is_empty() {
            return Ok(None);
        }

        let found = session::Entity::find_by_id(token.to_string())
            .find_also_related(user::Entity)
            .one(&self.db)
            .await?;

        Ok(match found {
            Some((sess, Some(u))) if sess.expires_at > self.now_sec() => {
                Some(Identity { user_id: u.id, email: u.email })
            },
            _ => None,
        })
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        },
        None => false,
    };

    if valid { Ok(()) } else { Err(AppError::validation("email", "Invalid email address")) }
}

pub fn session_cookie(token: String, ttl_days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(ttl_days))
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string()).filter(|t| !t.is_empty())
}

/// The caller's identity, if signed in.
pub struct CurrentUser(pub Option<Identity>);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&CookieJar::from_headers(&parts.headers));
        match token {
            Some(token) => Ok(Self(state.auth.resolve(&token).await?)),
            None => Ok(Self(None)),
        }
    }
}

/// A required identity. Rejects with 401 before the handler runs.
pub struct AuthUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        identity.map(AuthUser).ok_or(AppError::Unauthorized)
    }
}
