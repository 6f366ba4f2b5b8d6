/// Session token list
///
/// Each row is one live session (one device) for a user. Issuance order is the
/// serial `id`; revoking a session deletes its row.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_tokens (
///     id BIGSERIAL PRIMARY KEY,
///     user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE INDEX idx_user_tokens_user ON user_tokens(user_id, token);
/// ```

use sqlx::PgPool;

use crate::id::ObjectId;

/// Persistence for a user's session tokens
pub struct SessionToken;

impl SessionToken {
    /// Appends a token to the user's list
    pub async fn push(pool: &PgPool, user_id: &ObjectId, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO user_tokens (user_id, token) VALUES ($1, $2)")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Whether the token is still in the user's list
    pub async fn exists(pool: &PgPool, user_id: &ObjectId, token: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM user_tokens WHERE user_id = $1 AND token = $2)",
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Removes exactly this token; returns whether anything was removed
    pub async fn remove(pool: &PgPool, user_id: &ObjectId, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears the user's list
    pub async fn clear(pool: &PgPool, user_id: &ObjectId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// The user's tokens in issuance order
    pub async fn list(pool: &PgPool, user_id: &ObjectId) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT token FROM user_tokens WHERE user_id = $1 ORDER BY id ASC")
                .bind(user_id)
                .fetch_all(pool)
                .await?;

        Ok(rows.into_iter().map(|(token,)| token).collect())
    }
}
