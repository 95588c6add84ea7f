//! Rulesets and modules available to the current user.

use std::future::Future;
use std::sync::Arc;

use compass_domain::{Module, Ruleset, RulesetId};
use futures_util::future::try_join;

use super::notifications::Notifier;
use super::resource::{FetchOutcome, Resource, ResourceState};
use crate::infrastructure::ports::{
    load_json, save_json, storage_keys, FileManager, FileManagerError, StorageProvider,
};

const STORE: &str = "rulesets";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulesetCollection {
    pub rulesets: Vec<Ruleset>,
    pub modules: Vec<Module>,
}

pub struct RulesetStore {
    collection: Resource<RulesetCollection>,
    file_manager: Arc<dyn FileManager>,
    storage: Arc<dyn StorageProvider>,
    notifier: Notifier,
}

impl RulesetStore {
    pub fn new(
        file_manager: Arc<dyn FileManager>,
        storage: Arc<dyn StorageProvider>,
        notifier: Notifier,
    ) -> Self {
        Self {
            collection: Resource::new(STORE, RulesetCollection::default(), true, notifier.clone()),
            file_manager,
            storage,
            notifier,
        }
    }

    pub fn state(&self) -> ResourceState<RulesetCollection> {
        self.collection.snapshot()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<ResourceState<RulesetCollection>> {
        self.collection.subscribe()
    }

    pub fn rulesets(&self) -> Vec<Ruleset> {
        self.collection.data().rulesets
    }

    pub fn ruleset(&self, id: RulesetId) -> Option<Ruleset> {
        self.rulesets().into_iter().find(|r| r.id() == id)
    }

    pub fn modules_for(&self, ruleset_id: RulesetId) -> Vec<Module> {
        self.collection
            .data()
            .modules
            .into_iter()
            .filter(|m| m.ruleset_id == Some(ruleset_id))
            .collect()
    }

    /// Load once; later calls are no-ops until [`refresh`](Self::refresh).
    pub async fn load(&self) -> FetchOutcome {
        self.collection.ensure_loaded(self.read_all()).await
    }

    pub async fn refresh(&self) -> FetchOutcome {
        self.collection.fetch(self.read_all()).await
    }

    /// Stop applying whatever is in flight (the viewer went away).
    pub fn cancel_pending(&self) {
        self.collection.cancel_pending();
    }

    pub async fn save_ruleset(&self, ruleset: Ruleset) {
        if let Err(e) = self.file_manager.save_ruleset(&ruleset).await {
            tracing::error!(ruleset_id = %ruleset.id(), error = %e, "Failed to save ruleset");
            self.notifier.error(STORE, e.to_string());
            return;
        }
        self.collection.modify(|collection| {
            upsert(&mut collection.rulesets, ruleset, |a, b| a.id() == b.id());
        });
    }

    pub async fn save_module(&self, module: Module) {
        if let Err(e) = self.file_manager.save_module(&module).await {
            tracing::error!(module_id = %module.id(), error = %e, "Failed to save module");
            self.notifier.error(STORE, e.to_string());
            return;
        }
        self.collection.modify(|collection| {
            upsert(&mut collection.modules, module, |a, b| a.id() == b.id());
        });
    }

    pub fn last_viewed(&self) -> Option<RulesetId> {
        load_json(self.storage.as_ref(), storage_keys::LAST_VIEWED_RULESET)
    }

    pub fn set_last_viewed(&self, ruleset_id: Option<RulesetId>) {
        match ruleset_id {
            Some(id) => save_json(self.storage.as_ref(), storage_keys::LAST_VIEWED_RULESET, &id),
            None => self.storage.remove(storage_keys::LAST_VIEWED_RULESET),
        }
    }

    fn read_all(
        &self,
    ) -> impl Future<Output = Result<RulesetCollection, FileManagerError>> + Send + 'static {
        let file_manager = Arc::clone(&self.file_manager);
        async move {
            let (rulesets, modules) =
                try_join(file_manager.get_rulesets(), file_manager.get_modules()).await?;
            tracing::debug!(
                rulesets = rulesets.len(),
                modules = modules.len(),
                "Loaded rulesets"
            );
            Ok(RulesetCollection { rulesets, modules })
        }
    }
}

fn upsert<T>(entries: &mut Vec<T>, entry: T, same: impl Fn(&T, &T) -> bool) {
    match entries.iter_mut().find(|existing| same(existing, &entry)) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}
