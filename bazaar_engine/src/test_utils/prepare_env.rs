//! Scaffolding for tests that want a real (throwaway) SQLite database.
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// A fresh database URL under `data/`, unique per call so parallel tests never share state.
pub fn random_db_path() -> String {
    format!("sqlite://../data/test_store_{}.db", rand::random::<u64>())
}

/// Drops any stale database at `url` and creates an empty one. The schema is applied by
/// [`SqliteDatabase::new_with_url`] on first connect.
pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

pub async fn prepare_test_db(url: &str) -> SqliteDatabase {
    create_database(url).await;
    SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database")
}
