/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: HS256 session token signing
/// - [`session`]: issue/verify against the per-user token list
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::auth::{password, session};
/// use tasktrack_shared::store::{memory::MemoryStore, UserStore};
/// use tasktrack_shared::models::user::NewUser;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let secret = "a-secret-of-at-least-thirty-two-bytes!";
///
/// let user = store.insert_user(NewUser {
///     name: "Ann".to_string(),
///     age: 0,
///     email: "ann@x.com".to_string(),
///     password_hash: password::hash_password("secret1")?,
/// }).await?;
///
/// let token = session::issue(&store, secret, &user.id).await?;
/// let (same_user, _) = session::verify(&store, secret, &token).await?;
/// assert_eq!(same_user.id, user.id);
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
pub mod session;
