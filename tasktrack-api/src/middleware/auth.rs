/// Bearer-token gate for protected routes
///
/// Resolves `Authorization: Bearer <token>` to a user through
/// [`session::verify`] and stores an [`AuthContext`] in the request
/// extensions. Any failure ends the request with 401 before a handler runs.
///
/// ```ignore
/// async fn handler(Extension(auth): Extension<AuthContext>) -> Json<User> {
///     Json(auth.user)
/// }
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tasktrack_shared::{auth::session, models::user::User};

use crate::{app::AppState, error::ApiError};

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User as loaded during verification
    pub user: User,

    /// The exact token presented, so logout can revoke only this session
    pub token: String,
}

/// Token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = bearer_token(req.headers())
        .map(str::to_owned)
        .ok_or_else(ApiError::unauthenticated)?;

    let (user, token) = session::verify(state.store.as_ref(), state.jwt_secret(), &presented).await?;

    req.extensions_mut().insert(AuthContext { user, token });

    Ok(next.run(req).await)
}
