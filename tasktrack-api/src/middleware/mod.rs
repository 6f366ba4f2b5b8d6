/// Middleware for the API server
///
/// - `auth`: bearer-token session gate
/// - `security`: security response headers

pub mod auth;
pub mod security;
