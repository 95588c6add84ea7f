//! Stored binary assets (images, fonts) addressed by ruleset, directory and filename.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BaseDetails;
use crate::{AssetId, DomainError, RulesetId};

/// Compound lookup key for an asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetKey {
    pub ruleset_id: RulesetId,
    pub directory: String,
    pub filename: String,
}

impl AssetKey {
    pub fn new(
        ruleset_id: RulesetId,
        directory: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            ruleset_id,
            directory: normalize_directory(&directory.into()),
            filename: filename.into(),
        }
    }

    /// `directory/filename`, or just the filename at the root.
    pub fn path(&self) -> String {
        if self.directory.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.directory, self.filename)
        }
    }
}

/// Trailing and leading slashes are not significant.
fn normalize_directory(directory: &str) -> String {
    directory.trim_matches('/').to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(flatten)]
    pub details: BaseDetails<AssetId>,
    #[serde(flatten)]
    pub key: AssetKey,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Asset {
    pub fn new(
        key: AssetKey,
        mime_type: impl Into<String>,
        data: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if key.filename.trim().is_empty() {
            return Err(DomainError::validation("asset filename cannot be empty"));
        }
        Ok(Self {
            details: BaseDetails::new(AssetId::new(), now),
            key,
            mime_type: mime_type.into(),
            data,
        })
    }

    pub fn id(&self) -> AssetId {
        *self.details.id()
    }
}
