/// In-memory store
///
/// Same contract as the PostgreSQL store, held in a single `RwLock`. Each
/// trait call takes the lock once, which gives the same per-record atomicity
/// the database offers and nothing more.
///
/// Used by the test-suite and by `DATABASE_URL=memory://` for local runs; data
/// is lost when the process exits.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::id::ObjectId;
use crate::models::task::{NewTask, Task, TaskChanges, TaskQuery};
use crate::models::user::{NewUser, User, UserChanges};

struct UserRecord {
    user: User,
    tokens: Vec<String>,
    avatar: Option<Vec<u8>>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<ObjectId, UserRecord>,
    tasks: HashMap<ObjectId, Task>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Strictly increasing clock so creation order is never ambiguous
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn email_taken(&self, email: &str, except: Option<&ObjectId>) -> bool {
        self.users
            .values()
            .any(|record| record.user.email == email && Some(&record.user.id) != except)
    }
}

fn email_conflict() -> StoreError {
    StoreError::Conflict("Email already exists".to_string())
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks across all owners
    pub async fn task_count(&self) -> usize {
        self.inner.read().await.tasks.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;

        if inner.email_taken(&user.email, None) {
            return Err(email_conflict());
        }

        let now = inner.now();
        let user = User {
            id: ObjectId::new(),
            name: user.name,
            age: user.age,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };

        inner.users.insert(
            user.id.clone(),
            UserRecord {
                user: user.clone(),
                tokens: Vec::new(),
                avatar: None,
            },
        );

        Ok(user)
    }

    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(id).map(|record| record.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|record| record.user.email == email)
            .map(|record| record.user.clone()))
    }

    async fn update_user(&self, id: &ObjectId, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;

        if !inner.users.contains_key(id) {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            if inner.email_taken(email, Some(id)) {
                return Err(email_conflict());
            }
        }

        let now = inner.now();
        let Some(record) = inner.users.get_mut(id) else {
            return Ok(None);
        };
        let user = &mut record.user;

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(age) = changes.age {
            user.age = age;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = now;

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: &ObjectId) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.users.remove(id).is_none() {
            return Ok(false);
        }

        // Same cascade as the `tasks.owner_id` foreign key
        inner.tasks.retain(|_, task| &task.owner_id != id);
        Ok(true)
    }

    async fn find_avatar(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(id).and_then(|record| record.avatar.clone()))
    }

    async fn set_avatar(&self, id: &ObjectId, avatar: Option<Vec<u8>>) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let now = inner.now();

        match inner.users.get_mut(id) {
            Some(record) => {
                record.avatar = avatar;
                record.user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn push_token(&self, user_id: &ObjectId, token: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.users.get_mut(user_id) {
            record.tokens.push(token.to_string());
        }
        Ok(())
    }

    async fn has_token(&self, user_id: &ObjectId, token: &str) -> StoreResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(user_id)
            .is_some_and(|record| record.tokens.iter().any(|t| t == token)))
    }

    async fn remove_token(&self, user_id: &ObjectId, token: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.users.get_mut(user_id) else {
            return Ok(false);
        };

        let before = record.tokens.len();
        record.tokens.retain(|t| t != token);
        Ok(record.tokens.len() < before)
    }

    async fn clear_tokens(&self, user_id: &ObjectId) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.users.get_mut(user_id) {
            record.tokens.clear();
        }
        Ok(())
    }

    async fn list_tokens(&self, user_id: &ObjectId) -> StoreResult<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(user_id)
            .map(|record| record.tokens.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        let mut inner = self.inner.write().await;
        let now = inner.now();

        let task = Task {
            id: ObjectId::new(),
            description: task.description,
            completed: task.completed,
            owner_id: task.owner_id,
            created_at: now,
            updated_at: now,
        };
        inner.tasks.insert(task.id.clone(), task.clone());

        Ok(task)
    }

    async fn list_tasks(&self, owner_id: &ObjectId, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let inner = self.inner.read().await;

        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|task| &task.owner_id == owner_id)
            .filter(|task| query.completed.map_or(true, |c| task.completed == c))
            .cloned()
            .collect();

        tasks.sort_by(|a, b| query.sort.compare(a, b));

        let skip = query.skip.unwrap_or(0).max(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l.max(0) as usize);

        Ok(tasks.into_iter().skip(skip).take(limit).collect())
    }

    async fn find_task(&self, id: &ObjectId, owner_id: &ObjectId) -> StoreResult<Option<Task>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tasks
            .get(id)
            .filter(|task| &task.owner_id == owner_id)
            .cloned())
    }

    async fn update_task(
        &self,
        id: &ObjectId,
        owner_id: &ObjectId,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.write().await;
        let now = inner.now();

        let Some(task) = inner
            .tasks
            .get_mut(id)
            .filter(|task| &task.owner_id == owner_id)
        else {
            return Ok(None);
        };

        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(completed) = changes.completed {
            task.completed = completed;
        }
        task.updated_at = now;

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: &ObjectId, owner_id: &ObjectId) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.write().await;

        let owned = inner
            .tasks
            .get(id)
            .is_some_and(|task| &task.owner_id == owner_id);
        if !owned {
            return Ok(None);
        }

        Ok(inner.tasks.remove(id))
    }

    async fn delete_tasks_by_owner(&self, owner_id: &ObjectId) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;

        let before = inner.tasks.len();
        inner.tasks.retain(|_, task| &task.owner_id != owner_id);
        Ok((before - inner.tasks.len()) as u64)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn close(&self) {}
}
