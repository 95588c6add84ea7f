//! Application state and composition.

use std::sync::Arc;

use anyhow::Context;
use compass_domain::SheetId;

use crate::config::{AppConfig, Environment};
use crate::editor::EditorSession;
use crate::infrastructure::{
    clock::SystemClock,
    file_manager::create_file_manager,
    ports::{storage_keys, ClockPort, FileManager, StorageProvider},
    storage::{FileStorageProvider, MemoryStorageProvider},
};
use crate::stores::{
    ArchetypeStore, Notifier, OnboardingSeenStore, OnboardingStatus, OnboardingTracker,
    RulesetStore, UserStore,
};

/// Main application state.
///
/// The FileManager is chosen once here and injected into every store and
/// editor session.
pub struct App {
    pub config: AppConfig,
    pub file_manager: Arc<dyn FileManager>,
    pub storage: Arc<dyn StorageProvider>,
    pub clock: Arc<dyn ClockPort>,
    pub stores: Stores,
}

/// Container for all stores.
pub struct Stores {
    pub user: Arc<UserStore>,
    pub rulesets: Arc<RulesetStore>,
    pub archetypes: Arc<ArchetypeStore>,
    pub onboarding_seen: Arc<OnboardingSeenStore>,
    pub onboarding: Arc<OnboardingTracker>,
    pub onboarding_status: Arc<OnboardingStatus>,
    pub notifier: Notifier,
}

impl Stores {
    pub fn new(
        file_manager: Arc<dyn FileManager>,
        storage: Arc<dyn StorageProvider>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let notifier = Notifier::new();
        let onboarding = Arc::new(OnboardingTracker::new(storage.clone()));

        Self {
            user: Arc::new(UserStore::new(
                file_manager.clone(),
                storage.clone(),
                clock,
                notifier.clone(),
            )),
            rulesets: Arc::new(RulesetStore::new(
                file_manager,
                storage.clone(),
                notifier.clone(),
            )),
            archetypes: Arc::new(ArchetypeStore::new(storage.clone())),
            onboarding_seen: Arc::new(OnboardingSeenStore::new(storage)),
            onboarding_status: Arc::new(OnboardingStatus::new(onboarding.clone())),
            onboarding,
            notifier,
        }
    }
}

impl App {
    /// Wire the application for `config`.
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
        let storage = durable_storage(&config);
        let file_manager = create_file_manager(&config, clock.clone())
            .await
            .context("failed to open file manager")?;

        Ok(Self::with_parts(config, file_manager, storage, clock))
    }

    /// Assemble from explicit parts.
    pub fn with_parts(
        config: AppConfig,
        file_manager: Arc<dyn FileManager>,
        storage: Arc<dyn StorageProvider>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let stores = Stores::new(file_manager.clone(), storage.clone(), clock.clone());
        Self {
            config,
            file_manager,
            storage,
            clock,
            stores,
        }
    }

    /// A fresh editor for `sheet_id`. Sessions share only the FileManager.
    pub fn editor_session(&self, sheet_id: SheetId) -> EditorSession {
        EditorSession::new(sheet_id, self.file_manager.clone(), self.clock.clone())
    }

    /// The durable override if set, otherwise the configured endpoint.
    pub fn api_endpoint(&self) -> Option<String> {
        self.storage
            .load(storage_keys::API_ENDPOINT)
            .or_else(|| self.config.api_endpoint.clone())
    }

    pub fn set_api_endpoint_override(&self, endpoint: Option<&str>) {
        match endpoint.map(str::trim).filter(|e| !e.is_empty()) {
            Some(endpoint) => self.storage.save(storage_keys::API_ENDPOINT, endpoint),
            None => self.storage.remove(storage_keys::API_ENDPOINT),
        }
    }
}

fn durable_storage(config: &AppConfig) -> Arc<dyn StorageProvider> {
    match (&config.storage_path, config.environment) {
        (Some(path), _) => Arc::new(FileStorageProvider::at_path(path)),
        (None, Environment::Test) => Arc::new(MemoryStorageProvider::new()),
        (None, _) => Arc::new(FileStorageProvider::in_config_dir()),
    }
}
