/// JWT signing and verification for session tokens
///
/// Tokens are HS256-signed and carry only the user id. They do not expire:
/// a token stays usable until it is removed from the user's token list (see
/// [`crate::auth::session`]). The `jti` nonce makes every minted token unique,
/// even two issued to the same user in the same second.
///
/// # Example
///
/// ```
/// use tasktrack_shared::auth::jwt::{create_token, validate_token, Claims};
/// use tasktrack_shared::id::ObjectId;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-of-at-least-thirty-two-bytes!";
/// let user_id = ObjectId::new();
///
/// let token = create_token(&Claims::new(&user_id), secret)?;
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.user_id()?, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::id::ObjectId;

/// Issuer claim stamped on and required from every token
pub const ISSUER: &str = "tasktrack";

/// Minimum accepted signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Bad signature, wrong issuer, malformed token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Signature was fine but `sub` is not an id
    #[error("Invalid subject claim")]
    InvalidSubject,
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, hex
    pub sub: String,

    pub iss: String,

    /// Issued-at, unix seconds
    pub iat: i64,

    /// Random nonce
    pub jti: String,
}

impl Claims {
    pub fn new(user_id: &ObjectId) -> Self {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);

        Self {
            sub: user_id.to_string(),
            iss: ISSUER.to_string(),
            iat: Utc::now().timestamp(),
            jti: hex::encode(nonce),
        }
    }

    /// The subject as a typed id
    pub fn user_id(&self) -> Result<ObjectId, JwtError> {
        ObjectId::parse(&self.sub).map_err(|_| JwtError::InvalidSubject)
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Checks signature and issuer and returns the claims
///
/// Expiry is not checked; revocation goes through the token list.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| JwtError::ValidationError(format!("Token validation failed: {}", e)))?;

    Ok(token_data.claims)
}
