//! FileManager implementations, selected once at the composition root.

mod local;
mod memory;
mod sqlite;

use std::sync::Arc;

pub use local::LocalFileManager;
pub use memory::{InMemoryFileManager, SEED_EMAIL, SEED_USERNAME};
pub use sqlite::SqliteFileManager;

use crate::config::{AppConfig, Environment};
use crate::infrastructure::ports::{ClockPort, FileManager, FileManagerError};

pub async fn create_file_manager(
    config: &AppConfig,
    clock: Arc<dyn ClockPort>,
) -> Result<Arc<dyn FileManager>, FileManagerError> {
    let file_manager: Arc<dyn FileManager> = match config.environment {
        Environment::Test => Arc::new(InMemoryFileManager::new(clock)),
        Environment::Database => {
            tracing::info!(path = %config.database_path, "Opening SQLite file manager");
            Arc::new(SqliteFileManager::connect(&config.database_path).await?)
        }
        Environment::Local => Arc::new(LocalFileManager),
    };
    tracing::info!(environment = ?config.environment, "File manager selected");
    Ok(file_manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;

    #[tokio::test]
    async fn test_environment_serves_the_seeded_user() {
        let config = AppConfig {
            environment: Environment::Test,
            ..AppConfig::default()
        };
        let fm = create_file_manager(&config, Arc::new(SystemClock)).await.unwrap();
        assert!(fm.get_user(SEED_USERNAME).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn local_environment_has_no_write_capability() {
        let fm = create_file_manager(&AppConfig::default(), Arc::new(SystemClock))
            .await
            .unwrap();
        let user = compass_domain::User::new("megan", chrono::Utc::now()).unwrap();
        assert!(fm.save_user(&user).await.unwrap_err().is_unsupported());
    }

    #[tokio::test]
    async fn database_environment_opens_the_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            environment: Environment::Database,
            database_path: dir.path().join("compass.db").to_string_lossy().into_owned(),
            ..AppConfig::default()
        };
        let fm = create_file_manager(&config, Arc::new(SystemClock)).await.unwrap();
        assert!(fm.get_rulesets().await.unwrap().is_empty());
        assert!(dir.path().join("compass.db").exists());
    }
}
