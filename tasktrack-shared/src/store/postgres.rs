/// PostgreSQL-backed store
///
/// Thin adapter from the [`Store`] traits onto the model methods. The only
/// translation it does is turning unique-constraint violations into
/// [`StoreError::Conflict`].

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::db::pool;
use crate::id::ObjectId;
use crate::models::task::{NewTask, Task, TaskChanges, TaskQuery};
use crate::models::token::SessionToken;
use crate::models::user::{NewUser, User, UserChanges};

/// Store over a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and diagnostics
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique violations to `Conflict`, everything else to `Database`
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let what = match db_err.constraint() {
                Some(constraint) if constraint.contains("email") => "Email already exists".to_string(),
                Some(constraint) => format!("Constraint violation: {}", constraint),
                None => "Duplicate value".to_string(),
            };
            return StoreError::Conflict(what);
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        User::create(&self.pool, user).await.map_err(map_write_error)
    }

    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_user(&self, id: &ObjectId, changes: UserChanges) -> StoreResult<Option<User>> {
        User::update(&self.pool, id, changes)
            .await
            .map_err(map_write_error)
    }

    async fn delete_user(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn find_avatar(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        Ok(User::find_avatar(&self.pool, id).await?)
    }

    async fn set_avatar(&self, id: &ObjectId, avatar: Option<Vec<u8>>) -> StoreResult<bool> {
        Ok(User::set_avatar(&self.pool, id, avatar).await?)
    }

    async fn push_token(&self, user_id: &ObjectId, token: &str) -> StoreResult<()> {
        Ok(SessionToken::push(&self.pool, user_id, token).await?)
    }

    async fn has_token(&self, user_id: &ObjectId, token: &str) -> StoreResult<bool> {
        Ok(SessionToken::exists(&self.pool, user_id, token).await?)
    }

    async fn remove_token(&self, user_id: &ObjectId, token: &str) -> StoreResult<bool> {
        Ok(SessionToken::remove(&self.pool, user_id, token).await?)
    }

    async fn clear_tokens(&self, user_id: &ObjectId) -> StoreResult<()> {
        let removed = SessionToken::clear(&self.pool, user_id).await?;
        debug!(user_id = %user_id, removed, "Cleared session tokens");
        Ok(())
    }

    async fn list_tokens(&self, user_id: &ObjectId) -> StoreResult<Vec<String>> {
        Ok(SessionToken::list(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, task).await?)
    }

    async fn list_tasks(&self, owner_id: &ObjectId, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        Ok(Task::list_for_owner(&self.pool, owner_id, query).await?)
    }

    async fn find_task(&self, id: &ObjectId, owner_id: &ObjectId) -> StoreResult<Option<Task>> {
        Ok(Task::find_for_owner(&self.pool, id, owner_id).await?)
    }

    async fn update_task(
        &self,
        id: &ObjectId,
        owner_id: &ObjectId,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::update_for_owner(&self.pool, id, owner_id, changes).await?)
    }

    async fn delete_task(&self, id: &ObjectId, owner_id: &ObjectId) -> StoreResult<Option<Task>> {
        Ok(Task::delete_for_owner(&self.pool, id, owner_id).await?)
    }

    async fn delete_tasks_by_owner(&self, owner_id: &ObjectId) -> StoreResult<u64> {
        Ok(Task::delete_by_owner(&self.pool, owner_id).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(pool::health_check(&self.pool).await?)
    }

    async fn close(&self) {
        pool::close_pool(&self.pool).await;
    }
}
