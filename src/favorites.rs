use std::{collections::HashSet, future::Future, sync::Arc};

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::OnConflict,
};
use tracing::{debug, info};

use crate::{
    auth::Identity,
    catalog::Catalog,
    db::now_sec,
    entities::{favorite, film},
    error::{AppError, AppResult},
    filters::parse_number,
    models::FavoriteFilmView,
};

impl From<film::Model> for FavoriteFilmView {
    fn from(row: film::Model) -> Self {
        Self {
            id: row.id,
            title: row.title,
            director: row.director,
            producer: row.producer,
            release_year: row.release_year,
            rt_score: row.rt_score,
            data: row.data,
        }
    }
}

/// Persisted favorites, plus the film rows they point at.
#[derive(Clone)]
pub struct FavoritesStore {
    db: DatabaseConnection,
    catalog: Arc<Catalog>,
}

impl FavoritesStore {
    pub fn new(db: DatabaseConnection, catalog: Arc<Catalog>) -> Self {
        Self { db, catalog }
    }

    /// All favorites of `user`, most recently added first.
    pub async fn list(&self, user: &Identity) -> AppResult<Vec<FavoriteFilmView>> {
        let rows = favorite::Entity::find()
            .filter(favorite::Column::UserId.eq(user.user_id))
            .order_by_desc(favorite::Column::Id)
            .find_also_related(film::Entity)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().filter_map(|(_, film)| film).map(FavoriteFilmView::from).collect())
    }

    pub async fn film_ids(&self, user_id: i32) -> AppResult<HashSet<String>> {
        let ids: Vec<String> = favorite::Entity::find()
            .select_only()
            .column(favorite::Column::FilmId)
            .filter(favorite::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// Makes sure a film row exists for `film_id`, fetching it from the
    /// catalog the first time. An existing row is left as is, even if the
    /// catalog has changed since.
    pub async fn ensure_film(&self, film_id: &str) -> AppResult<()> {
        self.ensure_film_until(film_id, std::future::pending()).await
    }

    /// Like [`FavoritesStore::ensure_film`], but gives up on the catalog
    /// fetch once `cancel` completes.
    pub async fn ensure_film_until(
        &self,
        film_id: &str,
        cancel: impl Future<Output = ()>,
    ) -> AppResult<()> {
        if film_id.is_empty() {
            return Err(AppError::FilmNotFound);
        }
        if film::Entity::find_by_id(film_id.to_string()).one(&self.db).await?.is_some() {
            return Ok(());
        }

        let upstream = match self.catalog.get_film_until(film_id, cancel).await {
            Ok(upstream) if !upstream.id.is_empty() => upstream,
            Ok(_) => return Err(AppError::FilmNotFound),
            Err(err) if err.is_not_found() => return Err(AppError::FilmNotFound),
            Err(err) => return Err(err.into()),
        };

        let data = serde_json::to_value(&*upstream).map_err(anyhow::Error::from)?;
        let row = film::ActiveModel {
            id: Set(film_id.to_string()),
            title: Set(upstream.title.clone()),
            director: Set(upstream.director.clone()),
            producer: Set(upstream.producer.clone()),
            release_year: Set(to_i32(&upstream.release_date)),
            rt_score: Set(to_i32(&upstream.rt_score)),
            data: Set(data),
            created_at: Set(now_sec()),
        };

        film::Entity::insert(row)
            .on_conflict(OnConflict::column(film::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;

        debug!(film_id = %film_id, "stored film row");
        Ok(())
    }

    /// Idempotent: favoriting an already favorited film succeeds.
    pub async fn add(&self, user: &Identity, film_id: &str) -> AppResult<()> {
        self.add_until(user, film_id, std::future::pending()).await
    }

    pub async fn add_until(
        &self,
        user: &Identity,
        film_id: &str,
        cancel: impl Future<Output = ()>,
    ) -> AppResult<()> {
        self.ensure_film_until(film_id, cancel).await?;

        let row = favorite::ActiveModel {
            user_id: Set(user.user_id),
            film_id: Set(film_id.to_string()),
            created_at: Set(now_sec()),
            ..Default::default()
        };

        let inserted = favorite::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([favorite::Column::UserId, favorite::Column::FilmId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        info!(user_id = user.user_id, film_id = %film_id, inserted = inserted, "favorite added");
        Ok(())
    }

    /// Idempotent: removing a film that is not a favorite succeeds.
    pub async fn remove(&self, user: &Identity, film_id: &str) -> AppResult<()> {
        let res = favorite::Entity::delete_many()
            .filter(favorite::Column::UserId.eq(user.user_id))
            .filter(favorite::Column::FilmId.eq(film_id))
            .exec(&self.db)
            .await?;

        info!(user_id = user.user_id, film_id = %film_id, removed = res.rows_affected, "favorite removed");
        Ok(())
    }
}

fn to_i32(value: &str) -> i32 {
    i32::try_from(parse_number(value)).unwrap_or(0)
}
