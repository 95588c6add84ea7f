//! FileManager port - where user, ruleset and module data lives.

use async_trait::async_trait;
use compass_domain::{Asset, AssetKey, Module, Ruleset, User};

use super::error::FileManagerError;

/// Persistent data access for the client.
///
/// The concrete implementation is chosen once at the composition root and
/// injected into every store; call sites only ever see this trait.
///
/// `get_user`, `get_rulesets` and `get_modules` are required. Writes and
/// asset lookups are optional capabilities: the default bodies report
/// [`FileManagerError::Unsupported`] (or "no asset") so a read-only variant
/// only implements what it has.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileManager: Send + Sync {
    async fn get_user(&self, username: &str) -> Result<Option<User>, FileManagerError>;
    async fn get_rulesets(&self) -> Result<Vec<Ruleset>, FileManagerError>;
    async fn get_modules(&self) -> Result<Vec<Module>, FileManagerError>;

    async fn save_user(&self, _user: &User) -> Result<(), FileManagerError> {
        Err(FileManagerError::unsupported("save_user"))
    }

    async fn save_ruleset(&self, _ruleset: &Ruleset) -> Result<(), FileManagerError> {
        Err(FileManagerError::unsupported("save_ruleset"))
    }

    async fn save_module(&self, _module: &Module) -> Result<(), FileManagerError> {
        Err(FileManagerError::unsupported("save_module"))
    }

    async fn get_asset(&self, _key: &AssetKey) -> Result<Option<Asset>, FileManagerError> {
        Ok(None)
    }

    async fn save_asset(&self, _asset: &Asset) -> Result<(), FileManagerError> {
        Err(FileManagerError::unsupported("save_asset"))
    }
}
