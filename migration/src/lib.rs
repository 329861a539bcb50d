pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users_and_sessions;
mod m20250101_000002_create_films_and_favorites;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users_and_sessions::Migration),
            Box::new(m20250101_000002_create_films_and_favorites::Migration),
        ]
    }
}
