/// Persistence seam
///
/// The HTTP layer talks to storage only through [`Store`], which combines the
/// identity side ([`UserStore`]) and the task side ([`TaskStore`]). Two
/// implementations exist:
///
/// - [`postgres::PgStore`]: production backend over a sqlx pool
/// - [`memory::MemoryStore`]: in-process backend for tests and local runs
///
/// Both give per-record atomicity only; concurrent writers to the same user or
/// task are last-writer-wins.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasktrack_shared::store::{memory::MemoryStore, Store};
///
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// ```

use async_trait::async_trait;

use crate::id::ObjectId;
use crate::models::task::{NewTask, Task, TaskChanges, TaskQuery};
use crate::models::user::{NewUser, User, UserChanges};

pub mod memory;
pub mod postgres;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Users, their session tokens and avatars
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; `Conflict` if the email is taken
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Applies changes; `None` if the user is gone, `Conflict` on a taken email
    async fn update_user(&self, id: &ObjectId, changes: UserChanges) -> StoreResult<Option<User>>;

    /// Removes the user and their tokens; returns whether a user was removed
    async fn delete_user(&self, id: &ObjectId) -> StoreResult<bool>;

    async fn find_avatar(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>>;

    /// Overwrites or clears the avatar; returns whether the user exists
    async fn set_avatar(&self, id: &ObjectId, avatar: Option<Vec<u8>>) -> StoreResult<bool>;

    async fn push_token(&self, user_id: &ObjectId, token: &str) -> StoreResult<()>;

    async fn has_token(&self, user_id: &ObjectId, token: &str) -> StoreResult<bool>;

    async fn remove_token(&self, user_id: &ObjectId, token: &str) -> StoreResult<bool>;

    async fn clear_tokens(&self, user_id: &ObjectId) -> StoreResult<()>;

    /// Tokens in issuance order
    async fn list_tokens(&self, user_id: &ObjectId) -> StoreResult<Vec<String>>;
}

/// Owner-scoped tasks
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: NewTask) -> StoreResult<Task>;

    async fn list_tasks(&self, owner_id: &ObjectId, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    async fn find_task(&self, id: &ObjectId, owner_id: &ObjectId) -> StoreResult<Option<Task>>;

    async fn update_task(
        &self,
        id: &ObjectId,
        owner_id: &ObjectId,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, id: &ObjectId, owner_id: &ObjectId) -> StoreResult<Option<Task>>;

    /// Deletes all of an owner's tasks; returns how many went
    async fn delete_tasks_by_owner(&self, owner_id: &ObjectId) -> StoreResult<u64>;
}

/// Full persistence handle shared by the process
#[async_trait]
pub trait Store: UserStore + TaskStore {
    /// Connectivity check for the health endpoint
    async fn ping(&self) -> StoreResult<()>;

    /// Releases connections at shutdown
    async fn close(&self);
}
