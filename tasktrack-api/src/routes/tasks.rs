/// Task endpoints
///
/// Every lookup is scoped to the caller, so another user's task answers
/// exactly like a missing one: 404. A malformed `:id` is a 400.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tasktrack_shared::{
    id::ObjectId,
    models::task::{NewTask, Task, TaskChanges, TaskFields, TaskQuery, UPDATABLE_FIELDS},
};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{parse_patch, AppJson, AppQuery, PatchBody},
    middleware::auth::AuthContext,
};

/// Query string for `GET /tasks`, kept raw so bad numbers can be ignored
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub completed: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

impl ListParams {
    pub fn to_query(&self) -> TaskQuery {
        TaskQuery::from_params(
            self.completed.as_deref(),
            self.sort_by.as_deref(),
            self.limit.as_deref(),
            self.skip.as_deref(),
        )
    }
}

/// Keys accepted by `PATCH /tasks/:id`
#[derive(Debug, Default, Deserialize)]
pub struct TaskPatch {
    pub desc: Option<String>,
    pub completed: Option<bool>,
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// Create a task owned by the caller
///
/// Any `owner` in the body is ignored.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(mut fields): AppJson<TaskFields>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    fields.normalize();
    fields.check().map_err(ApiError::ValidationError)?;

    let task = state
        .store
        .insert_task(NewTask {
            description: fields.desc,
            completed: fields.completed,
            owner_id: auth.user.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// List the caller's tasks
///
/// ```text
/// GET /tasks?completed=true&sortBy=createdAt:desc&limit=10&skip=20
/// ```
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(params): AppQuery<ListParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state
        .store
        .list_tasks(&auth.user.id, &params.to_query())
        .await?;

    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = ObjectId::parse(&id)?;

    let task = state
        .store
        .find_task(&id, &auth.user.id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(task))
}

/// Update `desc` and/or `completed`
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    AppJson(body): AppJson<PatchBody>,
) -> ApiResult<Json<Task>> {
    let id = ObjectId::parse(&id)?;
    let patch: TaskPatch = parse_patch(body, &UPDATABLE_FIELDS)?;

    let mut changes = TaskChanges {
        description: patch.desc,
        completed: patch.completed,
    };
    changes
        .normalize_and_check()
        .map_err(ApiError::ValidationError)?;

    let task = state
        .store
        .update_task(&id, &auth.user.id, changes)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = ObjectId::parse(&id)?;

    let task = state
        .store
        .delete_task(&id, &auth.user.id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(task))
}
