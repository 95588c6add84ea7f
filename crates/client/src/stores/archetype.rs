//! Selected archetype per ruleset, remembered across sessions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use compass_domain::{ArchetypeId, RulesetId};

use crate::infrastructure::ports::{load_json, save_json, storage_keys, StorageProvider};

pub struct ArchetypeStore {
    selected: RwLock<HashMap<RulesetId, ArchetypeId>>,
    storage: Arc<dyn StorageProvider>,
}

impl ArchetypeStore {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        let selected =
            load_json(storage.as_ref(), storage_keys::SELECTED_ARCHETYPES).unwrap_or_default();
        Self {
            selected: RwLock::new(selected),
            storage,
        }
    }

    pub fn selected(&self, ruleset_id: RulesetId) -> Option<ArchetypeId> {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ruleset_id)
            .copied()
    }

    /// `None` removes the mapping rather than storing an empty selection.
    pub fn set_selected(&self, ruleset_id: RulesetId, archetype_id: Option<ArchetypeId>) {
        let mut selected = self.selected.write().unwrap_or_else(PoisonError::into_inner);
        match archetype_id {
            Some(id) => {
                selected.insert(ruleset_id, id);
            }
            None => {
                if selected.remove(&ruleset_id).is_none() {
                    return;
                }
            }
        }
        save_json(self.storage.as_ref(), storage_keys::SELECTED_ARCHETYPES, &*selected);
    }
}
