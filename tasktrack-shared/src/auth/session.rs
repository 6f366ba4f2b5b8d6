/// Session issuing and verification
///
/// A session is valid when two independent checks pass: the JWT signature
/// verifies, and the token is still in its user's token list. Revoking a
/// session is therefore just removing it from the list; there is no separate
/// revocation store.

use tracing::debug;

use super::jwt::{self, Claims, JwtError};
use crate::id::ObjectId;
use crate::models::user::User;
use crate::store::{Store, StoreError};

/// Why a session could not be issued or verified
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Signature, issuer or subject is bad
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    /// The subject no longer exists
    #[error("User not found")]
    UnknownUser,

    /// Signed correctly but logged out
    #[error("Token has been revoked")]
    Revoked,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Whether the failure is the caller's credentials rather than the server
    pub fn is_unauthorized(&self) -> bool {
        match self {
            SessionError::InvalidToken(JwtError::CreateError(_)) => false,
            SessionError::InvalidToken(_) | SessionError::UnknownUser | SessionError::Revoked => {
                true
            }
            SessionError::Store(_) => false,
        }
    }
}

/// Mints a token for the user and appends it to their list
pub async fn issue(store: &dyn Store, secret: &str, user_id: &ObjectId) -> Result<String, SessionError> {
    let token = jwt::create_token(&Claims::new(user_id), secret)?;
    store.push_token(user_id, &token).await?;

    debug!(user_id = %user_id, "Issued session token");
    Ok(token)
}

/// Resolves a presented token to its user
///
/// Returns the user together with the token so handlers can revoke exactly
/// this session.
pub async fn verify(store: &dyn Store, secret: &str, token: &str) -> Result<(User, String), SessionError> {
    let claims = jwt::validate_token(token, secret)?;
    let user_id = claims.user_id()?;

    let user = store
        .find_user(&user_id)
        .await?
        .ok_or(SessionError::UnknownUser)?;

    if !store.has_token(&user.id, token).await? {
        debug!(user_id = %user.id, "Rejected revoked session token");
        return Err(SessionError::Revoked);
    }

    Ok((user, token.to_string()))
}
