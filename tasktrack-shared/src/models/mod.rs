/// Database models for TaskTrack
///
/// Each model owns its SQL. Handlers never call these directly; they go through
/// the [`crate::store::Store`] trait so the same code runs against PostgreSQL
/// or the in-memory store.
///
/// # Models
///
/// - `user`: accounts, profile validation, avatar blob
/// - `token`: per-user session token list
/// - `task`: owner-scoped to-do items and listing queries

pub mod task;
pub mod token;
pub mod user;
