//! # Application State
//!
//! Shared state injected into every handler: the repository, the
//! optional SMTP mailer, and startup configuration.

use std::sync::Arc;

use sqlx::PgPool;

use crate::email::Mailer;
use crate::repo::Repository;

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen port, `QUAI_PORT`, default 8080.
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("QUAI_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        AppConfig { port }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig { port: 8080 }
    }
}

/// Shared application state. Cheap to clone; everything heavy sits
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Arc<Repository>,
    pub mailer: Option<Arc<Mailer>>,
}

impl AppState {
    /// In-memory state with no mailer. Tests and `DATABASE_URL`-less
    /// development runs use this.
    pub fn new() -> Self {
        AppState {
            config: Arc::new(AppConfig::default()),
            repo: Arc::new(Repository::new()),
            mailer: None,
        }
    }

    pub fn with_parts(
        config: AppConfig,
        repo: Repository,
        mailer: Option<Mailer>,
    ) -> Self {
        AppState {
            config: Arc::new(config),
            repo: Arc::new(repo),
            mailer: mailer.map(Arc::new),
        }
    }

    /// The database pool, when the repository is Postgres-backed.
    pub fn db_pool(&self) -> Option<&PgPool> {
        self.repo.pool()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
