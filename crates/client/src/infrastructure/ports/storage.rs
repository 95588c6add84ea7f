//! Durable local key/value storage port.

use serde::{de::DeserializeOwned, Serialize};

/// String-keyed storage that survives restarts (localStorage on the web,
/// a JSON file on desktop).
///
/// Failures are logged by the implementation rather than returned: callers
/// treat durable keys as best-effort hints (last user, last ruleset).
pub trait StorageProvider: Send + Sync {
    /// Save a string value with the given key
    fn save(&self, key: &str, value: &str);

    /// Load a string value by key, returns None if not found
    fn load(&self, key: &str) -> Option<String>;

    /// Remove a value by key
    fn remove(&self, key: &str);
}

/// Load and decode a JSON value. Undecodable values are logged and treated as absent.
pub fn load_json<T: DeserializeOwned>(storage: &dyn StorageProvider, key: &str) -> Option<T> {
    let raw = storage.load(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring undecodable stored value");
            None
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(storage: &dyn StorageProvider, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => storage.save(key, &raw),
        Err(e) => tracing::error!(key, error = %e, "Failed to serialize value for storage"),
    }
}

/// Storage key constants
///
/// Kept next to the port because they are the contract for what the stores
/// persist across sessions.
pub mod storage_keys {
    use compass_domain::UserId;

    pub const LAST_LOGGED_IN_USERNAME: &str = "compass_last_logged_in_username";
    pub const LAST_VIEWED_RULESET: &str = "compass_last_viewed_ruleset";
    pub const SELECTED_ARCHETYPES: &str = "compass_selected_archetypes";
    pub const ONBOARDING_SEEN: &str = "compass_onboarding_seen";
    pub const API_ENDPOINT: &str = "compass_api_endpoint";

    const ONBOARDING_COMPLETED_PREFIX: &str = "compass_onboarding_completed";

    pub fn onboarding_completed(user_id: UserId) -> String {
        format!("{ONBOARDING_COMPLETED_PREFIX}:{user_id}")
    }
}
