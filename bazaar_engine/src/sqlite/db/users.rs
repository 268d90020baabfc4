use sqlx::SqliteConnection;

use crate::db_types::User;

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await
}

/// Inserts a user row. Exercised by tests and seed tooling; account management proper is an
/// external collaborator.
pub async fn insert_user(
    username: &str,
    credit_score: i64,
    is_admin: bool,
    conn: &mut SqliteConnection,
) -> Result<User, sqlx::Error> {
    sqlx::query_as("INSERT INTO users (username, credit_score, is_admin) VALUES ($1, $2, $3) RETURNING *")
        .bind(username)
        .bind(credit_score)
        .bind(is_admin)
        .fetch_one(conn)
        .await
}
