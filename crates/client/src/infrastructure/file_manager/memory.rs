//! In-memory file manager used by the `test` environment.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use compass_domain::{Asset, AssetKey, BaseDetails, Module, ModuleId, Ruleset, RulesetId, User};

use crate::infrastructure::ports::{ClockPort, FileManager, FileManagerError};

/// Username of the canned user seeded on first read.
pub const SEED_USERNAME: &str = "test-user";
pub const SEED_EMAIL: &str = "test-user@questbound.local";

/// Single-user, process-lifetime storage.
///
/// The first user lookup seeds [`SEED_USERNAME`]; later lookups return the
/// same cached record until `save_user` replaces it. Overwrites keep the
/// stored `id` and `created_at`, and writes carrying an older `updated_at`
/// than the stored record are ignored.
pub struct InMemoryFileManager {
    clock: Arc<dyn ClockPort>,
    user: RwLock<Option<User>>,
    rulesets: RwLock<HashMap<RulesetId, Ruleset>>,
    modules: RwLock<HashMap<ModuleId, Module>>,
    assets: RwLock<HashMap<AssetKey, Asset>>,
}

impl InMemoryFileManager {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            clock,
            user: RwLock::new(None),
            rulesets: RwLock::new(HashMap::new()),
            modules: RwLock::new(HashMap::new()),
            assets: RwLock::new(HashMap::new()),
        }
    }

    fn seed_user(&self) -> Result<User, FileManagerError> {
        let user = User::new(SEED_USERNAME, self.clock.now())?.with_email(SEED_EMAIL);
        tracing::debug!(username = SEED_USERNAME, "Seeded in-memory user");
        Ok(user)
    }
}

/// Sort by creation, then title, so listings are stable across calls.
fn sorted_by_creation<T: Clone>(
    entries: &HashMap<impl Eq + std::hash::Hash, T>,
    key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, String),
) -> Vec<T> {
    let mut list: Vec<T> = entries.values().cloned().collect();
    list.sort_by_key(key);
    list
}

/// Details to store for `incoming`, or `None` when the stored record is newer.
fn accept_write<I: Clone>(
    stored: Option<&BaseDetails<I>>,
    incoming: &BaseDetails<I>,
) -> Result<Option<BaseDetails<I>>, FileManagerError> {
    match stored {
        None => Ok(Some(incoming.clone())),
        Some(stored) if stored.updated_at() > incoming.updated_at() => Ok(None),
        Some(stored) => Ok(Some(BaseDetails::restore(
            stored.id().clone(),
            stored.created_at(),
            incoming.updated_at(),
        )?)),
    }
}

#[async_trait]
impl FileManager for InMemoryFileManager {
    async fn get_user(&self, username: &str) -> Result<Option<User>, FileManagerError> {
        let mut slot = self.user.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(self.seed_user()?);
        }
        Ok(slot.as_ref().filter(|user| user.username == username).cloned())
    }

    async fn get_rulesets(&self) -> Result<Vec<Ruleset>, FileManagerError> {
        let rulesets = self.rulesets.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sorted_by_creation(&rulesets, |r| {
            (r.details.created_at(), r.content.title.clone())
        }))
    }

    async fn get_modules(&self) -> Result<Vec<Module>, FileManagerError> {
        let modules = self.modules.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sorted_by_creation(&modules, |m| {
            (m.details.created_at(), m.content.title.clone())
        }))
    }

    async fn save_user(&self, user: &User) -> Result<(), FileManagerError> {
        let mut slot = self.user.write().unwrap_or_else(PoisonError::into_inner);
        let stored = slot
            .as_ref()
            .filter(|existing| existing.id() == user.id())
            .map(|existing| &existing.details);
        let Some(details) = accept_write(stored, &user.details)? else {
            tracing::debug!(username = %user.username, "Ignoring stale user write");
            return Ok(());
        };
        *slot = Some(User {
            details,
            ..user.clone()
        });
        Ok(())
    }

    async fn save_ruleset(&self, ruleset: &Ruleset) -> Result<(), FileManagerError> {
        ruleset.validate_ownership()?;
        let mut rulesets = self.rulesets.write().unwrap_or_else(PoisonError::into_inner);
        let stored = rulesets.get(&ruleset.id()).map(|existing| &existing.details);
        let Some(details) = accept_write(stored, &ruleset.details)? else {
            tracing::debug!(ruleset_id = %ruleset.id(), "Ignoring stale ruleset write");
            return Ok(());
        };
        rulesets.insert(
            ruleset.id(),
            Ruleset {
                details,
                ..ruleset.clone()
            },
        );
        Ok(())
    }

    async fn save_module(&self, module: &Module) -> Result<(), FileManagerError> {
        module.validate_ownership()?;
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        let stored = modules.get(&module.id()).map(|existing| &existing.details);
        let Some(details) = accept_write(stored, &module.details)? else {
            tracing::debug!(module_id = %module.id(), "Ignoring stale module write");
            return Ok(());
        };
        modules.insert(
            module.id(),
            Module {
                details,
                ..module.clone()
            },
        );
        Ok(())
    }

    async fn get_asset(&self, key: &AssetKey) -> Result<Option<Asset>, FileManagerError> {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        Ok(assets.get(key).cloned())
    }

    async fn save_asset(&self, asset: &Asset) -> Result<(), FileManagerError> {
        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        let stored = assets.get(&asset.key).map(|existing| &existing.details);
        let Some(details) = accept_write(stored, &asset.details)? else {
            tracing::debug!(path = %asset.key.path(), "Ignoring stale asset write");
            return Ok(());
        };
        assets.insert(
            asset.key.clone(),
            Asset {
                details,
                ..asset.clone()
            },
        );
        Ok(())
    }
}
