/// API route handlers
///
/// - `health`: health check
/// - `users`: registration, sessions and profile
/// - `avatar`: avatar upload, removal and public fetch
/// - `tasks`: owner-scoped task CRUD and listing

pub mod avatar;
pub mod health;
pub mod tasks;
pub mod users;
