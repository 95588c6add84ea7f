//! Application configuration

use std::env;
use std::path::PathBuf;

/// Which [`FileManager`](crate::infrastructure::ports::FileManager) the
/// composition root injects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// In-memory store seeded with a canned user.
    Test,
    /// SQLite file at [`AppConfig::database_path`].
    Database,
    /// Local stub: reads find nothing, writes are unsupported.
    #[default]
    Local,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "test" => Self::Test,
            "database" | "sqlite" => Self::Database,
            _ => Self::Local,
        }
    }
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    /// SQLite database path (database environment only)
    pub database_path: String,
    /// Durable key/value file; `None` uses the platform config directory
    pub storage_path: Option<PathBuf>,
    /// Default API endpoint, overridable through durable storage
    pub api_endpoint: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            database_path: "compass.db".to_string(),
            storage_path: None,
            api_endpoint: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            environment: var("COMPASS_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or_default(),
            database_path: var("COMPASS_DATABASE_PATH").unwrap_or(defaults.database_path),
            storage_path: var("COMPASS_STORAGE_PATH").map(PathBuf::from),
            api_endpoint: var("COMPASS_API_ENDPOINT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_local_stub() {
        let config = config(&[]);
        assert_eq!(config.environment, Environment::Local);
        assert_eq!(config.database_path, "compass.db");
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn environment_flag_selects_variant() {
        assert_eq!(config(&[("COMPASS_ENV", "test")]).environment, Environment::Test);
        assert_eq!(config(&[("COMPASS_ENV", "Database")]).environment, Environment::Database);
        assert_eq!(config(&[("COMPASS_ENV", "staging")]).environment, Environment::Local);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = config(&[("COMPASS_DATABASE_PATH", "  "), ("COMPASS_API_ENDPOINT", "")]);
        assert_eq!(config.database_path, "compass.db");
        assert_eq!(config.api_endpoint, None);
    }
}
