/// Avatar endpoints
///
/// - `POST /users/me/avatar`: multipart field `avatar`, `.jpg`/`.jpeg`/`.png`,
///   at most 1,000,000 bytes; stored as a 250×250 PNG
/// - `DELETE /users/me/avatar`
/// - `GET /users/:id/avatar`: public, `image/png`

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension,
};
use tasktrack_shared::{avatar, id::ObjectId};
use tracing::debug;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::auth::AuthContext,
};

const FIELD_NAME: &str = "avatar";

/// Reads the `avatar` field, enforcing the filename and size rules as it goes
async fn read_upload(multipart: &mut Multipart) -> ApiResult<Vec<u8>> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FIELD_NAME) {
            continue;
        }

        avatar::check_filename(field.file_name().unwrap_or_default())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            bytes.extend_from_slice(&chunk);
            avatar::check_size(bytes.len())?;
        }
        return Ok(bytes);
    }

    Err(ApiError::invalid_field(FIELD_NAME, "Please upload an image"))
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> ApiResult<StatusCode> {
    let raw = read_upload(&mut multipart).await?;
    debug!(user_id = %auth.user.id, bytes = raw.len(), "Avatar upload received");

    let png = avatar::process(raw).await?;

    if !state.store.set_avatar(&auth.user.id, Some(png)).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::OK)
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.store.set_avatar(&auth.user.id, None).await?;
    Ok(StatusCode::OK)
}

/// A malformed id cannot name a user, so it is a plain 404
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let not_found = || ApiError::NotFound("Avatar not found".to_string());

    let id = ObjectId::parse(&id).map_err(|_| not_found())?;
    let png = state
        .store
        .find_avatar(&id)
        .await?
        .ok_or_else(not_found)?;

    Ok(([(header::CONTENT_TYPE, avatar::CONTENT_TYPE)], png))
}
