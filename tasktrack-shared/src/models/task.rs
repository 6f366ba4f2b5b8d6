/// Task model and database operations
///
/// A task is a to-do item permanently owned by the user who created it. Every
/// read or write below is scoped by `(id, owner_id)` in a single statement, so
/// a task that belongs to someone else is indistinguishable from one that
/// doesn't exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id TEXT PRIMARY KEY,
///     description TEXT NOT NULL,
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE INDEX idx_tasks_owner_created ON tasks(owner_id, created_at);
/// ```
///
/// # Listing
///
/// [`TaskQuery`] carries the `completed` filter, `sortBy` and pagination
/// parsed from the query string:
///
/// ```
/// use tasktrack_shared::models::task::{SortDirection, SortField, TaskQuery};
///
/// let query = TaskQuery::from_params(Some("true"), Some("createdAt:desc"), Some("10"), Some("20"));
/// assert_eq!(query.completed, Some(true));
/// assert_eq!(query.sort.field, SortField::CreatedAt);
/// assert_eq!(query.sort.direction, SortDirection::Descending);
/// assert_eq!(query.limit, Some(10));
/// assert_eq!(query.skip, Some(20));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::cmp::Ordering;
use validator::Validate;

use crate::id::ObjectId;
use crate::validation::{self, FieldError};

/// Keys a client may change through `PATCH /tasks/:id`
pub const UPDATABLE_FIELDS: [&str; 2] = ["desc", "completed"];

const DESCRIPTION_REQUIRED: &str = "Description is required";

/// To-do item
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    #[serde(rename = "_id")]
    pub id: ObjectId,

    /// What needs doing
    #[serde(rename = "desc")]
    pub description: String,

    /// Whether the task is done
    pub completed: bool,

    /// Owning user, fixed at creation
    #[serde(rename = "owner")]
    pub owner_id: ObjectId,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Client-supplied task fields for creation
///
/// No owner field; it always comes from the session.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TaskFields {
    #[validate(length(min = 1, message = "Description is required"))]
    pub desc: String,

    pub completed: bool,
}

impl TaskFields {
    pub fn normalize(&mut self) {
        self.desc = self.desc.trim().to_string();
    }

    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        self.validate().map_err(|e| validation::from_validator(&e))
    }
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub description: String,
    pub completed: bool,
    pub owner_id: ObjectId,
}

/// Input for updating a task
///
/// Only non-None fields will be updated.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskChanges {
    /// Trims the description and rejects a blank one
    pub fn normalize_and_check(&mut self) -> Result<(), Vec<FieldError>> {
        if let Some(description) = self.description.as_mut() {
            *description = description.trim().to_string();
            if description.is_empty() {
                return Err(vec![FieldError::new("desc", DESCRIPTION_REQUIRED)]);
            }
        }
        Ok(())
    }
}

/// Sortable task fields, by their wire names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Description,
    Completed,
}

impl SortField {
    /// Parses a wire field name (`createdAt`, `updatedAt`, `desc`, `completed`)
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            "desc" => Some(SortField::Description),
            "completed" => Some(SortField::Completed),
            _ => None,
        }
    }

    /// Column name; only ever one of these fixed strings reaches SQL
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Description => "description",
            SortField::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Order applied to a listing; ties always fall back to id ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for TaskSort {
    /// Creation order
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Ascending,
        }
    }
}

impl TaskSort {
    /// Parses `field:direction`
    ///
    /// `asc` sorts ascending and anything else descending. Unknown fields fall
    /// back to the default order.
    pub fn parse(value: &str) -> Self {
        let mut parts = value.splitn(2, ':');
        let field = parts.next().and_then(SortField::parse);
        let direction = match parts.next() {
            Some("asc") => SortDirection::Ascending,
            _ => SortDirection::Descending,
        };

        match field {
            Some(field) => Self { field, direction },
            None => Self::default(),
        }
    }

    /// In-process comparison matching the SQL `ORDER BY`
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let primary = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Description => a.description.cmp(&b.description),
            SortField::Completed => a.completed.cmp(&b.completed),
        };
        let primary = match self.direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };

        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Filter, order and page for `GET /tasks`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Exact match on `completed` when set
    pub completed: Option<bool>,
    pub sort: TaskSort,
    /// Maximum rows; `None` means unlimited
    pub limit: Option<i64>,
    /// Rows to skip; `None` means none
    pub skip: Option<i64>,
}

impl TaskQuery {
    /// Builds a query from raw query-string values
    ///
    /// - `completed`: any non-empty value filters, and only `"true"` means true
    /// - `sortBy`: see [`TaskSort::parse`]
    /// - `limit`/`skip`: non-negative integers; anything else is ignored, and a
    ///   limit of zero means no limit
    pub fn from_params(
        completed: Option<&str>,
        sort_by: Option<&str>,
        limit: Option<&str>,
        skip: Option<&str>,
    ) -> Self {
        Self {
            completed: completed
                .filter(|value| !value.is_empty())
                .map(|value| value == "true"),
            sort: sort_by
                .filter(|value| !value.is_empty())
                .map(TaskSort::parse)
                .unwrap_or_default(),
            limit: parse_count(limit).filter(|limit| *limit > 0),
            skip: parse_count(skip).filter(|skip| *skip > 0),
        }
    }
}

fn parse_count(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 0)
}

const TASK_COLUMNS: &str = "id, description, completed, owner_id, created_at, updated_at";

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (id, description, completed, owner_id) \
             VALUES ($1, $2, $3, $4) RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(ObjectId::new())
            .bind(data.description)
            .bind(data.completed)
            .bind(data.owner_id)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID with owner isolation
    pub async fn find_for_owner(
        pool: &PgPool,
        id: &ObjectId,
        owner_id: &ObjectId,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND owner_id = $2");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists an owner's tasks with filter, order and pagination applied
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: &ObjectId,
        filter: &TaskQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = $1");
        let mut bind_count = 1;

        if filter.completed.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND completed = ${}", bind_count));
        }

        query.push_str(&format!(
            " ORDER BY {} {}, id ASC",
            filter.sort.field.column(),
            filter.sort.direction.as_sql()
        ));

        if filter.limit.is_some() {
            bind_count += 1;
            query.push_str(&format!(" LIMIT ${}", bind_count));
        }
        if filter.skip.is_some() {
            bind_count += 1;
            query.push_str(&format!(" OFFSET ${}", bind_count));
        }

        let mut q = sqlx::query_as::<_, Task>(&query).bind(owner_id);

        if let Some(completed) = filter.completed {
            q = q.bind(completed);
        }
        if let Some(limit) = filter.limit {
            q = q.bind(limit);
        }
        if let Some(skip) = filter.skip {
            q = q.bind(skip);
        }

        q.fetch_all(pool).await
    }

    /// Updates a task with owner isolation
    ///
    /// Returns `None` when no task with this id belongs to `owner_id`.
    pub async fn update_for_owner(
        pool: &PgPool,
        id: &ObjectId,
        owner_id: &ObjectId,
        data: TaskChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.completed.is_some() {
            bind_count += 1;
            query.push_str(&format!(", completed = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND owner_id = $2 RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(owner_id);

        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(completed) = data.completed {
            q = q.bind(completed);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a task with owner isolation, returning the deleted row
    pub async fn delete_for_owner(
        pool: &PgPool,
        id: &ObjectId,
        owner_id: &ObjectId,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "DELETE FROM tasks WHERE id = $1 AND owner_id = $2 RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Deletes every task owned by a user
    pub async fn delete_by_owner(pool: &PgPool, owner_id: &ObjectId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE owner_id = $1")
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(description: &str, completed: bool, age_secs: i64) -> Task {
        let created = Utc::now() - Duration::seconds(age_secs);
        Task {
            id: ObjectId::new(),
            description: description.to_string(),
            completed,
            owner_id: ObjectId::new(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!(
            TaskSort::parse("createdAt:asc"),
            TaskSort {
                field: SortField::CreatedAt,
                direction: SortDirection::Ascending
            }
        );
        assert_eq!(
            TaskSort::parse("desc:desc"),
            TaskSort {
                field: SortField::Description,
                direction: SortDirection::Descending
            }
        );
        // Anything but "asc" is descending
        assert_eq!(
            TaskSort::parse("completed").direction,
            SortDirection::Descending
        );
        assert_eq!(
            TaskSort::parse("updatedAt:ASC").direction,
            SortDirection::Descending
        );
        // Unknown field falls back to creation order
        assert_eq!(TaskSort::parse("owner:asc"), TaskSort::default());
    }

    #[test]
    fn test_query_completed_filter() {
        assert_eq!(
            TaskQuery::from_params(Some("true"), None, None, None).completed,
            Some(true)
        );
        assert_eq!(
            TaskQuery::from_params(Some("false"), None, None, None).completed,
            Some(false)
        );
        assert_eq!(
            TaskQuery::from_params(Some("yes"), None, None, None).completed,
            Some(false)
        );
        assert_eq!(
            TaskQuery::from_params(Some(""), None, None, None).completed,
            None
        );
        assert_eq!(TaskQuery::from_params(None, None, None, None).completed, None);
    }

    #[test]
    fn test_query_invalid_numbers_are_ignored() {
        let query = TaskQuery::from_params(None, None, Some("abc"), Some("-4"));
        assert_eq!(query.limit, None);
        assert_eq!(query.skip, None);

        let query = TaskQuery::from_params(None, None, Some("0"), Some("0"));
        assert_eq!(query.limit, None);
        assert_eq!(query.skip, None);

        let query = TaskQuery::from_params(None, None, Some(" 5 "), Some("2"));
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.skip, Some(2));
    }

    #[test]
    fn test_compare_matches_direction() {
        let older = task("a", false, 60);
        let newer = task("b", true, 0);

        let asc = TaskSort::parse("createdAt:asc");
        let desc = TaskSort::parse("createdAt:desc");

        assert_eq!(asc.compare(&older, &newer), Ordering::Less);
        assert_eq!(desc.compare(&older, &newer), Ordering::Greater);
    }

    #[test]
    fn test_compare_ties_break_on_id() {
        let a = task("same", false, 0);
        let mut b = task("same", false, 0);
        b.created_at = a.created_at;

        let sort = TaskSort::parse("desc:desc");
        assert_eq!(sort.compare(&a, &b), a.id.cmp(&b.id));
    }

    #[test]
    fn test_task_fields_require_description() {
        let mut fields = TaskFields {
            desc: "   ".to_string(),
            completed: false,
        };
        fields.normalize();
        let errors = fields.check().unwrap_err();
        assert_eq!(errors[0].field, "desc");
    }

    #[test]
    fn test_task_changes_blank_description() {
        let mut changes = TaskChanges {
            description: Some("  ".to_string()),
            completed: None,
        };
        assert!(changes.normalize_and_check().is_err());

        let mut changes = TaskChanges {
            description: Some(" buy milk ".to_string()),
            completed: Some(true),
        };
        assert!(changes.normalize_and_check().is_ok());
        assert_eq!(changes.description.as_deref(), Some("buy milk"));
    }

    #[test]
    fn test_task_serialization_uses_wire_names() {
        let t = task("buy milk", false, 0);
        let json = serde_json::to_value(&t).unwrap();

        assert_eq!(json["desc"], "buy milk");
        assert_eq!(json["completed"], false);
        assert_eq!(json["owner"], t.owner_id.as_str());
        assert_eq!(json["_id"], t.id.as_str());
        assert!(json.get("createdAt").is_some());
    }
}
