//! Local stub file manager.

use async_trait::async_trait;
use compass_domain::{Module, Ruleset, User};

use crate::infrastructure::ports::{FileManager, FileManagerError};

/// Placeholder for storage that is not wired up yet.
///
/// Every lookup misses and no write capability is offered.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileManager;

#[async_trait]
impl FileManager for LocalFileManager {
    async fn get_user(&self, username: &str) -> Result<Option<User>, FileManagerError> {
        tracing::debug!(username, "Local file manager has no users");
        Ok(None)
    }

    async fn get_rulesets(&self) -> Result<Vec<Ruleset>, FileManagerError> {
        Ok(Vec::new())
    }

    async fn get_modules(&self) -> Result<Vec<Module>, FileManagerError> {
        Ok(Vec::new())
    }
}
