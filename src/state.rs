use crate::config::AppConfig;
use crate::db;
use crate::users::repo::SqliteUserRepository;
use crate::users::services::{UserService, UserServiceImpl};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserService>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let db = db::connect(&config.database).await?;

        let repo = Arc::new(SqliteUserRepository::new(db.clone()));
        let users = Arc::new(UserServiceImpl::new(repo)) as Arc<dyn UserService>;

        Ok(Self::from_parts(db, config, users))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, users: Arc<dyn UserService>) -> Self {
        Self { db, config, users }
    }

    /// State over a lazy pool that never connects, with the given service.
    #[cfg(test)]
    pub fn fake(users: Arc<dyn UserService>) -> Self {
        use crate::config::DatabaseConfig;

        let db = sqlx::sqlite::SqlitePoolOptions::new()
            .connect_lazy("sqlite::memory:")
            .expect("lazy pool ok");

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
            },
        });

        Self { db, config, users }
    }
}
