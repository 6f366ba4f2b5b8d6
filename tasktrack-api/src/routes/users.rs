/// Account endpoints
///
/// - `POST /users`: register, 201 `{ user, token }`
/// - `POST /users/login`: 200 `{ user, token }`, 404 on any credential mismatch
/// - `POST /users/logout`: revoke the presented token
/// - `POST /users/logoutAll`: revoke every token
/// - `GET /users/me`, `PATCH /users/me`, `DELETE /users/me`
///
/// User bodies never include the password hash, tokens or avatar.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use tasktrack_shared::{
    auth::{password, session},
    models::user::{NewUser, User, UserChanges, UserFields, UPDATABLE_FIELDS},
    validation::FieldError,
};
use tracing::info;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{parse_patch, AppJson, PatchBody},
    middleware::auth::AuthContext,
};

/// Login request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register and login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Keys accepted by `PATCH /users/me`
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Register a new user
///
/// ```text
/// POST /users
///
/// { "name": "Ann", "email": "ann@x.com", "password": "secret1", "age": 30 }
/// ```
///
/// Extra keys are ignored. A taken email is a 400.
pub async fn register(
    State(state): State<AppState>,
    AppJson(mut fields): AppJson<UserFields>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    fields.normalize();

    let mut errors = fields.check().err().unwrap_or_default();
    if fields.password.is_none() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    let plaintext = fields.password.take().unwrap_or_default();
    let password_hash = password::hash_password_async(plaintext).await?;

    let user = state
        .store
        .insert_user(NewUser {
            name: fields.name,
            age: fields.age,
            email: fields.email,
            password_hash,
        })
        .await?;

    let token = session::issue(state.store.as_ref(), state.jwt_secret(), &user.id).await?;
    state.notifier.welcome(&user.email, &user.name);

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

/// Log in with email and password
///
/// Unknown email and wrong password produce the same 404, after the same
/// amount of hashing work.
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let unable = || ApiError::NotFound("Unable to login".to_string());

    let email = req.email.trim().to_lowercase();
    let user = state.store.find_user_by_email(&email).await?;

    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let matches = password::verify_credentials_async(req.password, stored).await?;

    let user = match user {
        Some(user) if matches => user,
        _ => return Err(unable()),
    };

    let token = session::issue(state.store.as_ref(), state.jwt_secret(), &user.id).await?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(AuthResponse { user, token }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.store.remove_token(&auth.user.id, &auth.token).await?;
    Ok(StatusCode::OK)
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.store.clear_tokens(&auth.user.id).await?;
    info!(user_id = %auth.user.id, "All sessions revoked");
    Ok(StatusCode::OK)
}

pub async fn profile(Extension(auth): Extension<AuthContext>) -> Json<User> {
    Json(auth.user)
}

/// Update name, email, password or age
///
/// Any other key rejects the request untouched. Changed fields are validated
/// together with the current values of the others.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(body): AppJson<PatchBody>,
) -> ApiResult<Json<User>> {
    let patch: ProfilePatch = parse_patch(body, &UPDATABLE_FIELDS)?;
    let current = auth.user;

    let mut fields = UserFields {
        name: patch.name.clone().unwrap_or_else(|| current.name.clone()),
        age: patch.age.unwrap_or(current.age),
        email: patch.email.clone().unwrap_or_else(|| current.email.clone()),
        password: patch.password.clone(),
    };
    fields.normalize();
    fields.check().map_err(ApiError::ValidationError)?;

    let password_hash = match fields.password.take() {
        Some(plaintext) => Some(password::hash_password_async(plaintext).await?),
        None => None,
    };

    let changes = UserChanges {
        name: patch.name.map(|_| fields.name),
        age: patch.age,
        email: patch.email.map(|_| fields.email),
        password_hash,
    };

    if changes.is_empty() {
        return Ok(Json(current));
    }

    let user = state
        .store
        .update_user(&current.id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Delete the account, its tasks first
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = auth.user;

    let removed_tasks = state.store.delete_tasks_by_owner(&user.id).await?;
    if !state.store.delete_user(&user.id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    state.notifier.cancellation(&user.email, &user.name);

    info!(user_id = %user.id, removed_tasks, "User deleted");
    Ok(Json(user))
}
