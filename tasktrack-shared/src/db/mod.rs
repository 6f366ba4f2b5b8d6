/// PostgreSQL plumbing
///
/// - `pool`: connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Queries live on the models in [`crate::models`].

pub mod migrations;
pub mod pool;
