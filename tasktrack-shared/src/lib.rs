//! # TaskTrack Shared Library
//!
//! Domain types, persistence and auth primitives used by the TaskTrack API.
//!
//! ## Module Organization
//!
//! - `id`: 12-byte object identifiers
//! - `models`: users, session tokens and tasks, with their SQL
//! - `store`: the persistence trait and its PostgreSQL and in-memory backends
//! - `db`: connection pool and migrations
//! - `auth`: password hashing, token signing, session verification
//! - `avatar`: upload screening and PNG normalization
//! - `notify`: fire-and-forget account emails
//! - `validation`: field-level error reporting

pub mod auth;
pub mod avatar;
pub mod db;
pub mod id;
pub mod models;
pub mod notify;
pub mod store;
pub mod validation;

/// Current version of the TaskTrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
